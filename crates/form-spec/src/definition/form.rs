use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definition::field::ItemDefinition;
use crate::error::FormError;
use crate::form::Form;
use crate::group::FormItem;

/// Declarative form stored as JSON and turned into a runnable [`Form`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<ItemDefinition>,
}

impl FormDefinition {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Builds a fresh form; every item is checked up front.
    pub fn build(&self) -> Result<Form, FormError> {
        if self.name.trim().is_empty() {
            return Err(FormError::configuration("<form>", "form name cannot be empty"));
        }
        let mut form = Form::new();
        form.add_fields(build_items(&self.fields)?);
        Ok(form)
    }
}

pub(crate) fn build_items(items: &[ItemDefinition]) -> Result<Vec<FormItem>, FormError> {
    let mut seen = BTreeSet::new();
    let mut built = Vec::with_capacity(items.len());
    for item in items {
        let name = item.name();
        if name.trim().is_empty() {
            return Err(FormError::configuration("<unnamed>", "field name cannot be empty"));
        }
        if !seen.insert(name.replace(' ', "_")) {
            return Err(FormError::configuration(name, "duplicate field name"));
        }
        built.push(item.build()?);
    }
    Ok(built)
}

/// JSON Schema describing the form definition format.
pub fn schema() -> Value {
    schemars::schema_for!(FormDefinition).to_value()
}
