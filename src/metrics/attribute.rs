//! Attribute metric: a tagged value where the last applied SET wins.
//!
//! "Last" means last in queue order. The SET timestamp is stored for
//! display only and is never used to reorder writes, so a SET stamped
//! earlier that wins the enqueue race still overwrites a later-stamped one.

use crate::chrono::TimePoint;
use crate::metrics::types::AttributeSummary;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value held by an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(i64::from(v))
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        AttributeValue::Int(i64::from(v))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Str(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Str(v.to_owned())
    }
}

/// Attribute metric state
#[derive(Debug, Clone, Default)]
pub struct Attribute {
    value: Option<AttributeValue>,
    timestamp: Option<TimePoint>,
}

impl Attribute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value unconditionally
    pub fn set(&mut self, value: AttributeValue, timestamp: TimePoint) {
        self.value = Some(value);
        self.timestamp = Some(timestamp);
    }

    pub fn value(&self) -> Option<&AttributeValue> {
        self.value.as_ref()
    }

    /// Timestamp of the SET that produced the current value
    pub fn timestamp(&self) -> Option<TimePoint> {
        self.timestamp
    }

    pub fn finalize(&self) -> AttributeSummary {
        AttributeSummary {
            value: self.value.clone(),
            updated: self.timestamp,
        }
    }
}
