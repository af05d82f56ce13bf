use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::error::PromptError;
use crate::field::Question;
use crate::result::Answer;

/// Backend that asks one question and returns an accepted answer.
pub trait Prompter {
    /// A non-interactive prompter is never asked; its fields are skipped.
    fn is_interactive(&self) -> bool {
        true
    }

    fn ask(&mut self, question: &Question) -> Result<Answer, PromptError>;
}

impl<P: Prompter + ?Sized> Prompter for &mut P {
    fn is_interactive(&self) -> bool {
        (**self).is_interactive()
    }

    fn ask(&mut self, question: &Question) -> Result<Answer, PromptError> {
        (**self).ask(question)
    }
}

/// Shared retry loop for prompters.
///
/// `read` receives the question and the previous rejection message, and
/// returns the raw input. After `max_attempts` rejected answers the last
/// message is returned as [`PromptError::AttemptsExhausted`].
pub fn ask_with_retries<F>(question: &Question, mut read: F) -> Result<Answer, PromptError>
where
    F: FnMut(&Question, Option<&str>) -> Result<String, PromptError>,
{
    let mut rejection: Option<String> = None;
    for attempt in 1..=question.max_attempts() {
        let raw = read(question, rejection.as_deref())?;
        match question.resolve(&raw) {
            Ok(answer) => return Ok(answer),
            Err(reason) => {
                debug!(field = question.field_name(), attempt, %reason, "answer rejected");
                rejection = Some(reason);
            }
        }
    }
    warn!(
        field = question.field_name(),
        attempts = question.max_attempts(),
        "no valid answer given"
    );
    Err(PromptError::AttemptsExhausted {
        attempts: question.max_attempts(),
        message: rejection.unwrap_or_default(),
    })
}

/// Prompter fed from a queue of raw inputs.
#[derive(Debug, Clone)]
pub struct ScriptedPrompter {
    inputs: VecDeque<String>,
    interactive: bool,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            interactive: true,
            asked: Vec::new(),
        }
    }

    /// A prompter with no attached input; forms processed with it stay empty.
    pub fn non_interactive() -> Self {
        Self {
            inputs: VecDeque::new(),
            interactive: false,
            asked: Vec::new(),
        }
    }

    pub fn push(&mut self, input: impl Into<String>) {
        self.inputs.push_back(input.into());
    }

    /// Field names in the order they were asked, one entry per question.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn ask(&mut self, question: &Question) -> Result<Answer, PromptError> {
        self.asked.push(question.field_name().to_string());
        let inputs = &mut self.inputs;
        ask_with_retries(question, |_, _| {
            inputs
                .pop_front()
                .ok_or_else(|| PromptError::Aborted("no scripted input left".into()))
        })
    }
}
