//! A single stored item: scalar fields plus ordered multi-valued fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Book-assigned identity, derived from the book's key fields.
    pub key: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub multi_value_fields: BTreeMap<String, Vec<String>>,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Elements of a multi-valued field; empty when the field was never set.
    pub fn entries(&self, name: &str) -> &[String] {
        self.multi_value_fields
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Case-insensitive match used by record search criteria.
    ///
    /// Scalars compare by equality; a multi-valued field matches when any of
    /// its elements equals the expected value.
    pub fn matches(&self, field: &str, expected: &str) -> bool {
        if let Some(values) = self.multi_value_fields.get(field) {
            return values.iter().any(|value| eq_ignore_case(value, expected));
        }
        match self.fields.get(field) {
            Some(value) => eq_ignore_case(value, expected),
            None => expected.is_empty(),
        }
    }

    /// True when any scalar or element contains `needle` (already lowercased).
    pub fn contains_text(&self, needle: &str) -> bool {
        self.fields
            .values()
            .chain(self.multi_value_fields.values().flatten())
            .any(|value| value.to_lowercase().contains(needle))
    }
}

pub(crate) fn eq_ignore_case(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        parts.extend(
            self.multi_value_fields
                .iter()
                .filter(|(_, values)| !values.is_empty())
                .map(|(name, values)| format!("{name}=[{}]", values.join(", "))),
        );
        write!(f, "{}: {}", self.key, parts.join(", "))
    }
}
