use tracing::{debug, debug_span};

use crate::error::FormError;
use crate::field::Field;
use crate::group::{FieldGroup, FormItem};
use crate::prompt::Prompter;
use crate::result::{ResultTree, ResultValue};

/// An ordered list of fields and groups plus the results of processing it.
#[derive(Debug, Clone, Default)]
pub struct Form {
    items: Vec<FormItem>,
    results: Option<ResultTree>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, item: impl Into<FormItem>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn add_field(&mut self, item: impl Into<FormItem>) -> &mut Self {
        self.items.push(item.into());
        self
    }

    pub fn add_fields<I, T>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FormItem>,
    {
        self.items.extend(items.into_iter().map(Into::into));
        self
    }

    pub fn items(&self) -> &[FormItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_processed(&self) -> bool {
        self.results.is_some()
    }

    /// Walks the form once, asking `prompter` for every applicable field.
    ///
    /// Results are cached: after a successful pass further calls return
    /// without prompting. A failure leaves the form unprocessed.
    pub fn process<P>(&mut self, prompter: &mut P) -> Result<&mut Self, FormError>
    where
        P: Prompter + ?Sized,
    {
        if self.results.is_none() {
            let results = process_items(&self.items, prompter, ResultTree::new())?;
            self.results = Some(results);
        }
        Ok(self)
    }

    /// Collected results; with `filter_empty` empty-like entries are left out.
    pub fn results(&self, filter_empty: bool) -> ResultTree {
        match &self.results {
            Some(results) if filter_empty => results.filtered(),
            Some(results) => results.clone(),
            None => ResultTree::new(),
        }
    }

    /// Forgets cached results so the next `process` starts from empty state.
    pub fn reset(&mut self) {
        self.results = None;
    }
}

/// Processes `items` in declaration order on top of `results`.
pub fn process_items<P>(
    items: &[FormItem],
    prompter: &mut P,
    mut results: ResultTree,
) -> Result<ResultTree, FormError>
where
    P: Prompter + ?Sized,
{
    for item in items {
        match item {
            FormItem::Group(group) => {
                let iterations = process_group(group, prompter)?;
                results.insert(group.name(), iterations);
            }
            FormItem::Field(field) => {
                if let Some(value) = process_field(field, prompter, &results)? {
                    results.insert(field.name(), value);
                }
            }
        }
    }
    Ok(results)
}

fn process_field<P>(
    template: &Field,
    prompter: &mut P,
    results: &ResultTree,
) -> Result<Option<ResultValue>, FormError>
where
    P: Prompter + ?Sized,
{
    let name = template.name();
    if !template.conditions_met(results) {
        debug!(field = name, "conditions not met; skipping field");
        return Ok(None);
    }

    let mut field = template.clone();
    field.run_callback(results);

    if !prompter.is_interactive() {
        debug!(field = name, "prompter is not interactive; skipping field");
        return Ok(None);
    }

    let question = field.question()?;
    let answer = prompter
        .ask(&question)
        .map_err(|err| FormError::prompt(name, err))?;

    if field.has_subform() {
        let _span = debug_span!("subform", field = name).entered();
        let mut subform = Form::new();
        field.build_subform(&mut subform, &answer);
        let nested = process_items(&subform.items, prompter, ResultTree::new())?;
        return Ok(Some(ResultValue::Tree(nested)));
    }

    Ok(Some(field.format_answer(answer)))
}

/// Runs a repeat group; only iterations the predicate accepts are kept.
///
/// A non-interactive prompter yields the same iteration every time, so the
/// group stops after the first one.
fn process_group<P>(group: &FieldGroup, prompter: &mut P) -> Result<Vec<ResultTree>, FormError>
where
    P: Prompter + ?Sized,
{
    let _span = debug_span!("group", group = group.name()).entered();
    let mut iterations = Vec::new();
    loop {
        let iteration = process_items(group.items(), prompter, ResultTree::new())?;
        match group.should_continue(&iteration) {
            None => {
                iterations.push(iteration);
                break;
            }
            Some(true) => {
                iterations.push(iteration);
                if !prompter.is_interactive() {
                    debug!("prompter is not interactive; group runs once");
                    break;
                }
                debug!(count = iterations.len(), "group iteration kept; looping");
            }
            Some(false) => {
                debug!(count = iterations.len(), "group loop finished");
                break;
            }
        }
    }
    Ok(iterations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;

    #[test]
    fn skipped_fields_write_nothing() {
        let mut form = Form::new()
            .with_field(Field::text("project_name", "Project Name"))
            .with_field(
                Field::text("project_version", "Project Version")
                    .with_condition("project_name", "Demo"),
            );
        let mut prompter = ScriptedPrompter::new(["Demoooo", "8.x"]);
        form.process(&mut prompter).unwrap();

        let results = form.results(false);
        assert_eq!(results.get("project_name"), Some(&ResultValue::from("Demoooo")));
        assert!(!results.contains_key("project_version"));
        assert_eq!(prompter.asked(), ["project_name"]);
    }

    #[test]
    fn failed_pass_leaves_form_unprocessed() {
        let mut form = Form::new().with_field(Field::text("name", "Name"));
        let mut prompter = ScriptedPrompter::new(["", "", ""]);
        assert!(form.process(&mut prompter).is_err());
        assert!(!form.is_processed());
        assert!(form.results(false).is_empty());
    }

    #[test]
    fn reset_allows_a_fresh_pass() {
        let mut form = Form::new().with_field(Field::text("name", "Name"));
        let mut prompter = ScriptedPrompter::new(["first", "second"]);
        form.process(&mut prompter).unwrap();
        form.reset();
        form.process(&mut prompter).unwrap();
        assert_eq!(form.results(true).get("name"), Some(&ResultValue::from("second")));
    }

    #[test]
    fn callback_does_not_mutate_template() {
        let mut form = Form::new().with_field(
            Field::select("color", "Color").with_callback(|field, _| field.set_options(["red"])),
        );
        let mut prompter = ScriptedPrompter::new(["red"]);
        form.process(&mut prompter).unwrap();

        let FormItem::Field(template) = &form.items()[0] else {
            panic!("expected field");
        };
        assert!(template.options().unwrap().is_empty());
    }
}
