use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("numeric pattern is valid")
});

/// A single answer returned by a prompter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Bool(bool),
    Text(String),
}

impl Answer {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(text) => Some(text),
            Answer::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Answer::Bool(flag) => Some(*flag),
            Answer::Text(_) => None,
        }
    }

    /// True for an empty text submission.
    pub fn is_blank(&self) -> bool {
        matches!(self, Answer::Text(text) if text.is_empty())
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Text(text) => f.write_str(text),
            Answer::Bool(flag) => write!(f, "{}", flag),
        }
    }
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Answer::Text(value.to_string())
    }
}

impl From<String> for Answer {
    fn from(value: String) -> Self {
        Answer::Text(value)
    }
}

impl From<bool> for Answer {
    fn from(value: bool) -> Self {
        Answer::Bool(value)
    }
}

/// A value stored in a [`ResultTree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Bool(bool),
    Text(String),
    /// Iterations of a repeat group.
    Sequence(Vec<ResultTree>),
    /// Results of a sub-form.
    Tree(ResultTree),
}

impl ResultValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResultValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ResultValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&ResultTree> {
        match self {
            ResultValue::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ResultTree]> {
        match self {
            ResultValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Empty text, `false`, and empty sequences or trees.
    pub fn is_empty_like(&self) -> bool {
        match self {
            ResultValue::Bool(flag) => !flag,
            ResultValue::Text(text) => text.is_empty(),
            ResultValue::Sequence(items) => items.is_empty(),
            ResultValue::Tree(tree) => tree.is_empty(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        !self.is_empty_like()
    }

    /// Loose comparison used by field conditions.
    ///
    /// Booleans compare against the truthiness of the other side, numeric
    /// strings compare by value, nested values compare structurally.
    pub fn loose_eq(&self, other: &ResultValue) -> bool {
        match (self, other) {
            (ResultValue::Bool(flag), value) | (value, ResultValue::Bool(flag)) => {
                *flag == value.is_truthy()
            }
            (ResultValue::Text(left), ResultValue::Text(right)) => text_loose_eq(left, right),
            (ResultValue::Tree(left), ResultValue::Tree(right)) => left == right,
            (ResultValue::Sequence(left), ResultValue::Sequence(right)) => left == right,
            _ => false,
        }
    }
}

fn text_loose_eq(left: &str, right: &str) -> bool {
    match (numeric(left), numeric(right)) {
        (Some(left), Some(right)) => left == right,
        _ => left == right,
    }
}

/// Finite decimal value of `text`; words such as `nan` or `inf` are not numbers.
fn numeric(text: &str) -> Option<f64> {
    let text = text.trim();
    if !NUMERIC.is_match(text) {
        return None;
    }
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

impl From<Answer> for ResultValue {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Bool(flag) => ResultValue::Bool(flag),
            Answer::Text(text) => ResultValue::Text(text),
        }
    }
}

impl From<&str> for ResultValue {
    fn from(value: &str) -> Self {
        ResultValue::Text(value.to_string())
    }
}

impl From<String> for ResultValue {
    fn from(value: String) -> Self {
        ResultValue::Text(value)
    }
}

impl From<bool> for ResultValue {
    fn from(value: bool) -> Self {
        ResultValue::Bool(value)
    }
}

impl From<ResultTree> for ResultValue {
    fn from(value: ResultTree) -> Self {
        ResultValue::Tree(value)
    }
}

impl From<Vec<ResultTree>> for ResultValue {
    fn from(value: Vec<ResultTree>) -> Self {
        ResultValue::Sequence(value)
    }
}

/// Ordered answers keyed by field or group name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTree(IndexMap<String, ResultValue>);

impl ResultTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ResultValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ResultValue> {
        self.0.get(name)
    }

    /// Dotted lookup, e.g. `questions.location`.
    pub fn get_path(&self, path: &str) -> Option<&ResultValue> {
        crate::condition::resolve(path, self)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResultValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Copy without the empty-like top-level entries. Nested values are kept as is.
    pub fn filtered(&self) -> ResultTree {
        ResultTree(
            self.0
                .iter()
                .filter(|(_, value)| value.is_truthy())
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }
}

impl<K, V> FromIterator<(K, V)> for ResultTree
where
    K: Into<String>,
    V: Into<ResultValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ResultTree(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filtered_drops_falsy_entries_only() {
        let tree: ResultTree = [
            ("name", ResultValue::from("Demo")),
            ("version", ResultValue::from("")),
            ("happy", ResultValue::from(false)),
            ("items", ResultValue::Sequence(Vec::new())),
        ]
        .into_iter()
        .collect();

        let filtered = tree.filtered();
        assert_eq!(filtered.keys().collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn loose_eq_matches_numbers_and_truthiness() {
        assert!(ResultValue::from("8").loose_eq(&ResultValue::from("8.0")));
        assert!(!ResultValue::from("8.x").loose_eq(&ResultValue::from("8")));
        assert!(ResultValue::from(true).loose_eq(&ResultValue::from("yes")));
        assert!(ResultValue::from("").loose_eq(&ResultValue::from(false)));
        assert!(!ResultValue::from("Demoooo").loose_eq(&ResultValue::from("Demo")));
    }

    #[test]
    fn loose_eq_treats_float_words_as_text() {
        assert!(ResultValue::from("Nan").loose_eq(&ResultValue::from("Nan")));
        assert!(!ResultValue::from("inf").loose_eq(&ResultValue::from("Infinity")));
        assert!(!ResultValue::from("nan").loose_eq(&ResultValue::from("NaN")));
        assert!(ResultValue::from(" 1e3").loose_eq(&ResultValue::from("1000")));
        assert!(ResultValue::from("-.5").loose_eq(&ResultValue::from("-0.50")));
        assert!(!ResultValue::from("1e999").loose_eq(&ResultValue::from("2e999")));
    }

    #[test]
    fn serializes_in_insertion_order() {
        let mut nested = ResultTree::new();
        nested.insert("how_old", "1000");
        let mut tree = ResultTree::new();
        tree.insert("zeta", true);
        tree.insert("alpha", nested);

        let value = serde_json::to_value(&tree).expect("serialize");
        assert_eq!(value, json!({ "zeta": true, "alpha": { "how_old": "1000" } }));
        let text = serde_json::to_string(&tree).expect("serialize");
        assert!(text.find("zeta") < text.find("alpha"));
    }
}
