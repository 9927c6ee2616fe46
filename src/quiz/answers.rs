//! Quiz answer payload
//!
//! The quiz front-end posts a loosely typed JSON object: answers may be
//! strings, numbers, arrays of choices or swipe records. Values are read
//! with JavaScript truthiness and string coercion so keyword checks behave
//! the same as in the browser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Completed quiz answers keyed by question id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizAnswers(Map<String, Value>);

impl QuizAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set an answer.
    pub fn with(mut self, question: impl Into<String>, answer: impl Into<Value>) -> Self {
        self.0.insert(question.into(), answer.into());
        self
    }

    pub fn insert(&mut self, question: impl Into<String>, answer: impl Into<Value>) {
        self.0.insert(question.into(), answer.into());
    }

    pub fn get(&self, question: &str) -> Option<&Value> {
        self.0.get(question)
    }

    /// The answer to `question` when it is truthy.
    pub fn truthy(&self, question: &str) -> Option<&Value> {
        self.get(question).filter(|v| is_truthy(v))
    }

    /// Truthy answers among `questions`, lowercased, in the given order.
    pub fn truthy_texts(&self, questions: &[&str]) -> Vec<String> {
        questions
            .iter()
            .filter_map(|q| self.truthy(q))
            .map(|v| coerce_string(v).to_lowercase())
            .collect()
    }

    /// First truthy answer among `questions`.
    pub fn first_truthy(&self, questions: &[&str]) -> Option<&Value> {
        questions.iter().find_map(|q| self.truthy(q))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for QuizAnswers {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<BTreeMap<String, Value>> for QuizAnswers {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

/// JavaScript truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// JavaScript `String(value)`.
///
/// Arrays join their elements with `,` (nulls become empty) and objects
/// render as `[object Object]`.
pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(v) => format!("{}", v),
            None => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Numeric reading of a timestamp-like answer; `NaN` when not numeric.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => f64::NAN,
    }
}
