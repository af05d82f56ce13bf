use thiserror::Error;

/// Failures raised by a prompter while asking a single question.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Every attempt was rejected; carries the last validator message.
    #[error("{message}")]
    AttemptsExhausted { attempts: usize, message: String },
    #[error("prompt aborted: {0}")]
    Aborted(String),
    #[error("prompt I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal errors that abort a whole `Form::process` call.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("field '{field}' is misconfigured: {message}")]
    Configuration { field: String, message: String },
    #[error("{message}")]
    Prompt {
        field: String,
        message: String,
        #[source]
        source: PromptError,
    },
}

impl FormError {
    pub(crate) fn configuration(field: &str, message: impl Into<String>) -> Self {
        FormError::Configuration {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn prompt(field: &str, source: PromptError) -> Self {
        FormError::Prompt {
            field: field.to_string(),
            message: source.to_string().trim().to_string(),
            source,
        }
    }

    /// Name of the field that triggered the failure.
    pub fn field(&self) -> &str {
        match self {
            FormError::Configuration { field, .. } | FormError::Prompt { field, .. } => field,
        }
    }
}
