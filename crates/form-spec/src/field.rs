use std::fmt;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use regex::Regex;

use crate::condition::{self, Condition, Operator};
use crate::error::FormError;
use crate::form::Form;
use crate::result::{Answer, ResultTree, ResultValue};

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const REQUIRED_MESSAGE: &str = "Field is required.";

static CONFIRM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^y").expect("confirmation pattern is valid"));

/// Rejects an answer with a user-facing message.
pub type Validator = Arc<dyn Fn(&Answer) -> Result<(), String> + Send + Sync>;
/// Rewrites a raw text answer before it is validated and stored.
pub type Normalizer = Arc<dyn Fn(&str) -> String + Send + Sync>;
/// Reconfigures a field from the answers collected so far.
pub type FieldCallback = Arc<dyn Fn(&mut Field, &ResultTree) + Send + Sync>;
/// Adds nested fields to a fresh form, given the parent field's answer.
pub type SubformBuilder = Arc<dyn Fn(&mut Form, &Answer) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    String,
    Boolean,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Text,
    /// Yes/no confirmation; answers matching `pattern` are `true`.
    Boolean { pattern: Regex },
    /// Choice between keyed options; the chosen key is stored.
    Select { options: IndexMap<String, String> },
}

/// One question in a form.
#[derive(Clone)]
pub struct Field {
    name: String,
    label: String,
    kind: FieldKind,
    default: Option<Answer>,
    required: bool,
    max_attempts: usize,
    hidden: bool,
    validators: Vec<Validator>,
    normalizer: Option<Normalizer>,
    conditions: Vec<Condition>,
    callback: Option<FieldCallback>,
    subform: Option<SubformBuilder>,
}

impl Field {
    fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.replace(' ', "_"),
            label: label.to_string(),
            kind,
            default: None,
            required: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            hidden: false,
            validators: Vec::new(),
            normalizer: None,
            conditions: Vec::new(),
            callback: None,
            subform: None,
        }
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    /// Confirmation field; defaults to `true` and matches answers starting with `y`.
    pub fn boolean(name: &str, label: &str) -> Self {
        let mut field = Self::new(
            name,
            label,
            FieldKind::Boolean {
                pattern: CONFIRM_PATTERN.clone(),
            },
        );
        field.default = Some(Answer::Bool(true));
        field
    }

    pub fn select(name: &str, label: &str) -> Self {
        Self::new(
            name,
            label,
            FieldKind::Select {
                options: IndexMap::new(),
            },
        )
    }

    pub fn with_default(mut self, default: impl Into<Answer>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Answer) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Replaces any previous normalizer and the type default transform.
    pub fn with_normalizer<F>(mut self, normalizer: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.normalizer = Some(Arc::new(normalizer));
        self
    }

    pub fn with_condition(self, path: &str, expected: impl Into<ResultValue>) -> Self {
        self.with_condition_op(path, expected, Operator::Equals)
    }

    /// Adds a condition; a later condition on the same path replaces the earlier one.
    pub fn with_condition_op(
        mut self,
        path: &str,
        expected: impl Into<ResultValue>,
        operator: Operator,
    ) -> Self {
        let condition = Condition::new(path, expected, operator);
        match self
            .conditions
            .iter_mut()
            .find(|existing| existing.path == path)
        {
            Some(existing) => *existing = condition,
            None => self.conditions.push(condition),
        }
        self
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Field, &ResultTree) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn with_subform<F>(mut self, builder: F) -> Self
    where
        F: Fn(&mut Form, &Answer) + Send + Sync + 'static,
    {
        self.subform = Some(Arc::new(builder));
        self
    }

    /// Overrides the confirmation pattern of a boolean field.
    pub fn with_pattern(mut self, regex: Regex) -> Self {
        if let FieldKind::Boolean { pattern } = &mut self.kind {
            *pattern = regex;
        }
        self
    }

    /// Options where each entry is both key and label.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_options(options);
        self
    }

    pub fn with_keyed_options<I, K, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.set_keyed_options(options);
        self
    }

    pub fn set_options<I, S>(&mut self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_keyed_options(options.into_iter().map(|option| {
            let option = option.into();
            (option.clone(), option)
        }));
    }

    pub fn set_keyed_options<I, K, V>(&mut self, options: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if let FieldKind::Select { options: current } = &mut self.kind {
            *current = options
                .into_iter()
                .map(|(key, label)| (key.into(), label.into()))
                .collect();
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn set_default(&mut self, default: Option<Answer>) {
        self.default = default;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn data_type(&self) -> DataType {
        match self.kind {
            FieldKind::Boolean { .. } => DataType::Boolean,
            FieldKind::Text | FieldKind::Select { .. } => DataType::String,
        }
    }

    pub fn default_answer(&self) -> Option<&Answer> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn options(&self) -> Option<&IndexMap<String, String>> {
        match &self.kind {
            FieldKind::Select { options } => Some(options),
            _ => None,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn has_subform(&self) -> bool {
        self.subform.is_some()
    }

    pub fn conditions_met(&self, results: &ResultTree) -> bool {
        condition::evaluate(&self.conditions, results)
    }

    /// Runs the reconfiguration callback, if any, against this instance.
    pub fn run_callback(&mut self, results: &ResultTree) {
        if let Some(callback) = self.callback.clone() {
            callback(self, results);
        }
    }

    /// Lets the sub-form builder populate `form`. Returns false when no builder is set.
    pub fn build_subform(&self, form: &mut Form, answer: &Answer) -> bool {
        match &self.subform {
            Some(builder) => {
                builder(form, answer);
                true
            }
            None => false,
        }
    }

    /// Builds the backend-agnostic question for this field.
    pub fn question(&self) -> Result<Question, FormError> {
        let (normalization, choices) = match &self.kind {
            FieldKind::Select { options } if options.is_empty() => {
                return Err(FormError::configuration(
                    &self.name,
                    "select field requires at least one option",
                ));
            }
            FieldKind::Select { options } => (Normalization::Choice, options.clone()),
            FieldKind::Boolean { pattern } => {
                (Normalization::Confirm(pattern.clone()), IndexMap::new())
            }
            FieldKind::Text => (Normalization::None, IndexMap::new()),
        };
        let normalization = match &self.normalizer {
            Some(normalizer) => Normalization::Custom(normalizer.clone()),
            None => normalization,
        };

        Ok(Question {
            field: self.name.clone(),
            prompt: self.prompt_text(),
            data_type: self.data_type(),
            default: self.default.clone(),
            required: self.required,
            hidden: self.hidden,
            max_attempts: self.max_attempts,
            choices,
            validators: self.validators.clone(),
            normalization,
        })
    }

    /// Converts an accepted answer into the stored value.
    pub fn format_answer(&self, answer: Answer) -> ResultValue {
        match (&self.kind, answer) {
            (FieldKind::Boolean { pattern }, Answer::Text(text)) if self.normalizer.is_none() => {
                ResultValue::Bool(pattern.is_match(&text))
            }
            (_, answer) => answer.into(),
        }
    }

    fn prompt_text(&self) -> String {
        let default = match (&self.kind, &self.default) {
            (FieldKind::Boolean { .. }, Some(Answer::Bool(flag))) => {
                Some(if *flag { "yes" } else { "no" }.to_string())
            }
            (_, Some(answer)) => Some(answer.to_string()),
            (_, None) => None,
        };
        match default {
            Some(default) => format!("{} [{}]: ", self.label, default),
            None => format!("{}: ", self.label),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("max_attempts", &self.max_attempts)
            .field("hidden", &self.hidden)
            .field("validators", &self.validators.len())
            .field("normalizer", &self.normalizer.is_some())
            .field("conditions", &self.conditions)
            .field("callback", &self.callback.is_some())
            .field("subform", &self.subform.is_some())
            .finish()
    }
}

#[derive(Clone)]
enum Normalization {
    None,
    Custom(Normalizer),
    Confirm(Regex),
    Choice,
}

/// Materialized question handed to a prompter.
#[derive(Clone)]
pub struct Question {
    field: String,
    prompt: String,
    data_type: DataType,
    default: Option<Answer>,
    required: bool,
    hidden: bool,
    max_attempts: usize,
    choices: IndexMap<String, String>,
    validators: Vec<Validator>,
    normalization: Normalization,
}

impl Question {
    pub fn field_name(&self) -> &str {
        &self.field
    }

    /// Prompt text with the default rendered inline, e.g. `Name [Demo]: `.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn default(&self) -> Option<&Answer> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn choices(&self) -> &IndexMap<String, String> {
        &self.choices
    }

    /// Turns raw input into an accepted answer, or the rejection message.
    pub fn resolve(&self, raw: &str) -> Result<Answer, String> {
        let trimmed = raw.trim();
        let answer = if trimmed.is_empty() {
            self.default
                .clone()
                .unwrap_or_else(|| Answer::Text(String::new()))
        } else {
            Answer::Text(trimmed.to_string())
        };
        let answer = self.normalize(answer);
        self.validate(&answer)?;
        Ok(answer)
    }

    pub fn normalize(&self, answer: Answer) -> Answer {
        let text = match answer {
            Answer::Text(text) => text,
            other => return other,
        };
        match &self.normalization {
            Normalization::None => Answer::Text(text),
            Normalization::Custom(normalizer) => Answer::Text(normalizer(&text)),
            Normalization::Confirm(pattern) => Answer::Bool(pattern.is_match(&text)),
            Normalization::Choice => {
                if self.choices.contains_key(&text) {
                    return Answer::Text(text);
                }
                match self.choices.iter().find(|(_, label)| **label == text) {
                    Some((key, _)) => Answer::Text(key.clone()),
                    None => Answer::Text(text),
                }
            }
        }
    }

    /// Required check first, then the choice check, then user validators in order.
    pub fn validate(&self, answer: &Answer) -> Result<(), String> {
        if self.required && self.data_type != DataType::Boolean && answer.is_blank() {
            return Err(REQUIRED_MESSAGE.to_string());
        }
        if !self.choices.is_empty()
            && let Answer::Text(text) = answer
            && !text.is_empty()
            && !self.choices.contains_key(text)
        {
            let keys = self.choices.keys().cloned().collect::<Vec<_>>();
            return Err(format!(
                "Value \"{}\" is invalid; choose one of: {}.",
                text,
                keys.join(", ")
            ));
        }
        for validator in &self.validators {
            validator(answer)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Question")
            .field("field", &self.field)
            .field("prompt", &self.prompt)
            .field("data_type", &self.data_type)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("hidden", &self.hidden)
            .field("max_attempts", &self.max_attempts)
            .field("choices", &self.choices)
            .finish()
    }
}
