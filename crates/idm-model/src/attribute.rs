//! Typed, multi-valued attributes carried by every identity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    /// Free-form text.
    Text(String),
    /// Signed integer.
    Integer(i64),
    /// Boolean flag.
    Boolean(bool),
    /// Point in time.
    Timestamp(DateTime<Utc>),
}

impl AttributeValue {
    /// Returns the text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an integer value.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean content, if this is a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// Attribute map: name to one or many values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Vec<AttributeValue>>);

impl Attributes {
    /// Creates an empty attribute map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Replaces an attribute with a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(name.into(), vec![value.into()]);
    }

    /// Replaces an attribute with several values.
    ///
    /// An empty value list removes the attribute.
    pub fn set_many<I, V>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        let name = name.into();
        let values: Vec<AttributeValue> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.0.remove(&name);
        } else {
            self.0.insert(name, values);
        }
    }

    /// Appends a value to an attribute, creating it if needed.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    /// Gets all values of an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[AttributeValue]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// Gets the first value of an attribute.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name).and_then(|v| v.first())
    }

    /// Gets the first value of an attribute as text.
    #[must_use]
    pub fn first_text(&self, name: &str) -> Option<&str> {
        self.first(name).and_then(AttributeValue::as_text)
    }

    /// Removes an attribute, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<AttributeValue>> {
        self.0.remove(name)
    }

    /// Checks whether an attribute is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over attribute names and values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AttributeValue])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
