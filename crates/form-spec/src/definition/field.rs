use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::condition::{Condition, Operator};
use crate::definition::form::build_items;
use crate::error::FormError;
use crate::field::{DataType, Field};
use crate::group::{FieldGroup, FormItem};
use crate::result::{Answer, ResultValue};

/// One entry of a declarative form, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemDefinition {
    Text(FieldDefinition),
    Boolean(FieldDefinition),
    Select(FieldDefinition),
    Group(GroupDefinition),
}

impl ItemDefinition {
    pub fn name(&self) -> &str {
        match self {
            ItemDefinition::Text(field)
            | ItemDefinition::Boolean(field)
            | ItemDefinition::Select(field) => &field.name,
            ItemDefinition::Group(group) => &group.name,
        }
    }

    pub fn build(&self) -> Result<FormItem, FormError> {
        match self {
            ItemDefinition::Text(field) => field.build(Field::text(&field.name, field.label())),
            ItemDefinition::Boolean(field) => {
                field.build(Field::boolean(&field.name, field.label()))
            }
            ItemDefinition::Select(field) => field.build(Field::select(&field.name, field.label())),
            ItemDefinition::Group(group) => group.build().map(FormItem::from),
        }
    }
}

/// Settings shared by text, boolean and select entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<usize>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalizer: Option<NormalizerKind>,
    /// Select fields only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceDefinition>,
    /// Boolean fields only: regex matched against a yes answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subform: Option<SubformDefinition>,
}

fn default_required() -> bool {
    true
}

impl FieldDefinition {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    fn build(&self, mut field: Field) -> Result<FormItem, FormError> {
        let name = field.name().to_string();

        if let Some(default) = &self.default {
            field = field.with_default(value_to_answer(default));
        }
        field = field.with_required(self.required).with_hidden(self.hidden);
        if let Some(max_attempts) = self.max_attempts {
            if max_attempts == 0 {
                return Err(FormError::configuration(&name, "max_attempts must be positive"));
            }
            field = field.with_max_attempts(max_attempts);
        }
        for condition in &self.conditions {
            field = field.with_condition_op(
                &condition.path,
                value_to_result(&condition.value),
                condition.operator,
            );
        }
        if let Some(constraint) = &self.constraint {
            field = constraint.apply(field)?;
        }
        if let Some(kind) = self.normalizer {
            field = field.with_normalizer(move |value| kind.apply(value));
        }

        if !self.options.is_empty() {
            if field.options().is_none() {
                return Err(FormError::configuration(
                    &name,
                    "options are only valid on select fields",
                ));
            }
            field = field.with_keyed_options(self.options.iter().map(ChoiceDefinition::pair));
        }

        if let Some(pattern) = &self.pattern {
            if field.data_type() != DataType::Boolean {
                return Err(FormError::configuration(
                    &name,
                    "pattern is only valid on boolean fields",
                ));
            }
            let regex = Regex::new(pattern).map_err(|err| {
                FormError::configuration(&name, format!("invalid pattern: {}", err))
            })?;
            field = field.with_pattern(regex);
        }

        if let Some(subform) = &self.subform {
            let items = build_items(&subform.fields)?;
            let when = value_to_result(&subform.when);
            field = field.with_subform(move |form, answer| {
                if ResultValue::from(answer.clone()).loose_eq(&when) {
                    form.add_fields(items.iter().cloned());
                }
            });
        }

        Ok(field.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionDefinition {
    /// Dotted path of an earlier answer, e.g. `database.driver`.
    pub path: String,
    pub value: Value,
    #[serde(default)]
    pub operator: Operator,
}

/// Declarative validation rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Constraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
}

impl Constraint {
    fn apply(&self, mut field: Field) -> Result<Field, FormError> {
        if let (Some(min), Some(max)) = (self.min_len, self.max_len)
            && min > max
        {
            return Err(FormError::configuration(field.name(), "min_len cannot exceed max_len"));
        }
        if let Some(pattern) = &self.pattern {
            let regex = Regex::new(pattern).map_err(|err| {
                FormError::configuration(
                    field.name(),
                    format!("invalid constraint pattern: {}", err),
                )
            })?;
            field = field.with_validator(move |answer| match non_empty_text(answer) {
                Some(text) if !regex.is_match(text) => Err("value does not match pattern".into()),
                _ => Ok(()),
            });
        }
        if let Some(min_len) = self.min_len {
            field = field.with_validator(move |answer| match non_empty_text(answer) {
                Some(text) if text.chars().count() < min_len => {
                    Err("string shorter than min length".into())
                }
                _ => Ok(()),
            });
        }
        if let Some(max_len) = self.max_len {
            field = field.with_validator(move |answer| match non_empty_text(answer) {
                Some(text) if text.chars().count() > max_len => {
                    Err("string longer than max length".into())
                }
                _ => Ok(()),
            });
        }
        Ok(field)
    }
}

fn non_empty_text(answer: &Answer) -> Option<&str> {
    answer.as_text().filter(|text| !text.is_empty())
}

/// Built-in normalizers available to declarative forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NormalizerKind {
    Lowercase,
    Uppercase,
    /// Lowercase with spaces replaced by dashes.
    Slug,
}

impl NormalizerKind {
    pub fn apply(&self, value: &str) -> String {
        match self {
            NormalizerKind::Lowercase => value.to_lowercase(),
            NormalizerKind::Uppercase => value.to_uppercase(),
            NormalizerKind::Slug => value.to_lowercase().replace(' ', "-"),
        }
    }
}

/// A select option: either a bare value or a `{ value, label }` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ChoiceDefinition {
    Plain(String),
    Keyed { value: String, label: String },
}

impl ChoiceDefinition {
    fn pair(&self) -> (String, String) {
        match self {
            ChoiceDefinition::Plain(value) => (value.clone(), value.clone()),
            ChoiceDefinition::Keyed { value, label } => (value.clone(), label.clone()),
        }
    }
}

/// Fields asked right after the parent when its answer equals `when`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubformDefinition {
    #[serde(default = "default_when")]
    pub when: Value,
    pub fields: Vec<ItemDefinition>,
}

fn default_when() -> Value {
    Value::Bool(true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GroupDefinition {
    pub name: String,
    pub fields: Vec<ItemDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_while: Option<RepeatWhile>,
}

impl GroupDefinition {
    pub fn build(&self) -> Result<FieldGroup, FormError> {
        let mut group = FieldGroup::new(&self.name).with_fields(build_items(&self.fields)?);
        if let Some(repeat) = &self.repeat_while {
            let condition = Condition::new(
                repeat.field.clone(),
                value_to_result(&repeat.value),
                repeat.operator,
            );
            group = group.with_loop_until(move |iteration| condition.is_met(iteration));
        }
        Ok(group)
    }
}

/// Loop predicate: keep the iteration and repeat while `field` matches `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RepeatWhile {
    pub field: String,
    #[serde(default = "default_when")]
    pub value: Value,
    #[serde(default)]
    pub operator: Operator,
}

fn value_to_answer(value: &Value) -> Answer {
    match value {
        Value::Bool(flag) => Answer::Bool(*flag),
        Value::String(text) => Answer::Text(text.clone()),
        Value::Null => Answer::Text(String::new()),
        other => Answer::Text(other.to_string()),
    }
}

fn value_to_result(value: &Value) -> ResultValue {
    value_to_answer(value).into()
}
