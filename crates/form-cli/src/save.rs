use form_spec::{Field, Form, Prompter, ResultTree};
use tracing::info;

use crate::CliResult;

pub const DEFAULT_CONFIRM_MESSAGE: &str = "Save results?";

/// How the processed results are handed to the sink.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Question asked before saving; `None` saves without asking.
    pub confirm: Option<String>,
    /// Drop empty answers from the saved results.
    pub filter_empty: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            confirm: Some(DEFAULT_CONFIRM_MESSAGE.to_string()),
            filter_empty: true,
        }
    }
}

/// Processes `form`, optionally confirms, then passes the results to `sink`.
///
/// Returns whether the sink was invoked.
pub fn save<P, F>(
    form: &mut Form,
    prompter: &mut P,
    options: &SaveOptions,
    sink: F,
) -> CliResult<bool>
where
    P: Prompter + ?Sized,
    F: FnOnce(&ResultTree) -> CliResult<()>,
{
    form.process(prompter)?;

    let confirmed = match &options.confirm {
        Some(message) => confirm(prompter, message)?,
        None => true,
    };
    if confirmed {
        let results = form.results(options.filter_empty);
        info!(entries = results.len(), "saving form results");
        sink(&results)?;
    }
    Ok(confirmed)
}

fn confirm<P>(prompter: &mut P, message: &str) -> CliResult<bool>
where
    P: Prompter + ?Sized,
{
    let field = Field::boolean("confirm_save", message);
    if !prompter.is_interactive() {
        return Ok(field
            .default_answer()
            .and_then(|answer| answer.as_bool())
            .unwrap_or(true));
    }
    let answer = prompter.ask(&field.question()?)?;
    Ok(field.format_answer(answer).as_bool().unwrap_or(false))
}
