use std::fmt;
use std::sync::Arc;

use crate::field::Field;
use crate::result::ResultTree;

/// Decides from the latest iteration whether a group keeps looping.
pub type LoopPredicate = Arc<dyn Fn(&ResultTree) -> bool + Send + Sync>;

/// Entry of a form or group: a single field or a nested repeat group.
#[derive(Debug, Clone)]
pub enum FormItem {
    Field(Field),
    Group(FieldGroup),
}

impl FormItem {
    pub fn name(&self) -> &str {
        match self {
            FormItem::Field(field) => field.name(),
            FormItem::Group(group) => group.name(),
        }
    }
}

impl From<Field> for FormItem {
    fn from(field: Field) -> Self {
        FormItem::Field(field)
    }
}

impl From<FieldGroup> for FormItem {
    fn from(group: FieldGroup) -> Self {
        FormItem::Group(group)
    }
}

/// A block of items asked one or more times; results are collected per iteration.
#[derive(Clone)]
pub struct FieldGroup {
    name: String,
    items: Vec<FormItem>,
    loop_until: Option<LoopPredicate>,
}

impl FieldGroup {
    /// Spaces in `name` become underscores, as for fields.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.replace(' ', "_"),
            items: Vec::new(),
            loop_until: None,
        }
    }

    pub fn with_field(mut self, item: impl Into<FormItem>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn with_fields<I, T>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FormItem>,
    {
        self.items.extend(items.into_iter().map(Into::into));
        self
    }

    pub fn add_field(&mut self, item: impl Into<FormItem>) -> &mut Self {
        self.items.push(item.into());
        self
    }

    /// Keep iterating while `predicate` returns true for the latest iteration.
    pub fn with_loop_until<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ResultTree) -> bool + Send + Sync + 'static,
    {
        self.loop_until = Some(Arc::new(predicate));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[FormItem] {
        &self.items
    }

    pub fn has_loop_until(&self) -> bool {
        self.loop_until.is_some()
    }

    /// `None` when the group has no predicate.
    pub fn should_continue(&self, iteration: &ResultTree) -> Option<bool> {
        self.loop_until
            .as_ref()
            .map(|predicate| predicate(iteration))
    }
}

impl fmt::Debug for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldGroup")
            .field("name", &self.name)
            .field("items", &self.items)
            .field("loop_until", &self.loop_until.is_some())
            .finish()
    }
}
