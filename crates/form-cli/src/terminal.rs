use std::io::{self, BufRead, IsTerminal, StdinLock, Stdout, Write};

use dialoguer::Password;
use form_spec::{Answer, PromptError, Prompter, Question, ask_with_retries};

/// Line-based prompter over any reader/writer pair.
///
/// Hidden questions are read without echo when `mask_hidden` is set.
pub struct TerminalPrompter<R, W> {
    reader: R,
    writer: W,
    interactive: bool,
    mask_hidden: bool,
}

impl TerminalPrompter<StdinLock<'static>, Stdout> {
    /// Masks hidden answers only when stdin is a terminal.
    pub fn stdio(interactive: bool) -> Self {
        let mask_hidden = io::stdin().is_terminal();
        Self::new(io::stdin().lock(), io::stdout(), interactive).with_masked_hidden(mask_hidden)
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(reader: R, writer: W, interactive: bool) -> Self {
        Self {
            reader,
            writer,
            interactive,
            mask_hidden: false,
        }
    }

    pub fn with_masked_hidden(mut self, mask_hidden: bool) -> Self {
        self.mask_hidden = mask_hidden;
        self
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn read_answer(
        &mut self,
        question: &Question,
        rejection: Option<&str>,
    ) -> Result<String, PromptError> {
        if let Some(reason) = rejection {
            writeln!(self.writer, "Invalid answer: {}", reason)?;
        }
        if question.is_hidden() && self.mask_hidden {
            self.writer.flush()?;
            return Password::new()
                .with_prompt(password_prompt(question))
                .allow_empty_password(true)
                .interact()
                .map_err(|err| PromptError::Aborted(err.to_string()));
        }
        for (key, label) in question.choices() {
            if key == label {
                writeln!(self.writer, "  - {}", key)?;
            } else {
                writeln!(self.writer, "  [{}] {}", key, label)?;
            }
        }
        write!(self.writer, "{}", question.prompt())?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(PromptError::Aborted("end of input".into()));
        }
        Ok(line)
    }
}

fn password_prompt(question: &Question) -> &str {
    question.prompt().trim_end().trim_end_matches(':')
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn ask(&mut self, question: &Question) -> Result<Answer, PromptError> {
        ask_with_retries(question, |question, rejection| {
            self.read_answer(question, rejection)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_spec::Field;

    fn prompter(input: &str) -> TerminalPrompter<&[u8], Vec<u8>> {
        TerminalPrompter::new(input.as_bytes(), Vec::new(), true)
    }

    #[test]
    fn prints_prompt_and_reads_answer() {
        let question = Field::text("name", "Name").with_default("Demo").question().unwrap();
        let mut prompter = prompter("\n");
        assert_eq!(prompter.ask(&question).unwrap(), Answer::from("Demo"));
        let output = String::from_utf8(prompter.into_writer()).unwrap();
        assert_eq!(output, "Name [Demo]: ");
    }

    #[test]
    fn shows_rejection_before_next_attempt() {
        let question = Field::text("name", "Name").question().unwrap();
        let mut prompter = prompter("\nSteve\n");
        assert_eq!(prompter.ask(&question).unwrap(), Answer::from("Steve"));
        let output = String::from_utf8(prompter.into_writer()).unwrap();
        assert!(output.contains("Invalid answer: Field is required."));
        assert_eq!(output.matches("Name: ").count(), 2);
    }

    #[test]
    fn lists_select_choices() {
        let question = Field::select("version", "Version")
            .with_keyed_options([("7", "7x"), ("8", "8")])
            .question()
            .unwrap();
        let mut prompter = prompter("8\n");
        prompter.ask(&question).unwrap();
        let output = String::from_utf8(prompter.into_writer()).unwrap();
        assert!(output.contains("  [7] 7x"));
        assert!(output.contains("  - 8"));
    }

    #[test]
    fn hidden_answers_are_read_from_the_reader_when_not_masked() {
        let question = Field::text("api_token", "API token")
            .with_hidden(true)
            .question()
            .unwrap();
        let mut prompter = prompter("s3cret\n");
        assert_eq!(prompter.ask(&question).unwrap(), Answer::from("s3cret"));
        let output = String::from_utf8(prompter.into_writer()).unwrap();
        assert_eq!(output, "API token: ");
    }

    #[test]
    fn password_prompt_drops_trailing_colon() {
        let question = Field::text("api_token", "API token")
            .with_hidden(true)
            .question()
            .unwrap();
        assert_eq!(password_prompt(&question), "API token");
        let question = Field::text("pin", "PIN").with_default("0000").question().unwrap();
        assert_eq!(password_prompt(&question), "PIN [0000]");
    }

    #[test]
    fn end_of_input_aborts() {
        let question = Field::text("name", "Name").question().unwrap();
        let mut prompter = prompter("");
        assert!(matches!(
            prompter.ask(&question),
            Err(PromptError::Aborted(_))
        ));
    }
}
