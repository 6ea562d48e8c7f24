//! Declared field layout of a book.

use crate::catalog::naming::is_valid_identifier;
use anyhow::{Result, bail};
use std::collections::BTreeSet;

/// Field metadata a book exposes to the catalog and enforces in its store.
///
/// `fields` lists every field in declaration order, single- and
/// multi-valued alike; the other lists are subsets of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookSchema {
    fields: Vec<String>,
    multi_value_fields: Vec<String>,
    required_fields: Vec<String>,
    key_fields: Vec<String>,
}

impl BookSchema {
    pub fn new(
        fields: &[&str],
        multi_value_fields: &[&str],
        required_fields: &[&str],
        key_fields: &[&str],
    ) -> Self {
        let owned = |names: &[&str]| -> Vec<String> {
            names.iter().map(|name| name.to_string()).collect()
        };
        Self {
            fields: owned(fields),
            multi_value_fields: owned(multi_value_fields),
            required_fields: owned(required_fields),
            key_fields: owned(key_fields),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn multi_value_fields(&self) -> &[String] {
        &self.multi_value_fields
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|name| name == field)
    }

    pub fn is_multi_valued(&self, field: &str) -> bool {
        self.multi_value_fields.iter().any(|name| name == field)
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.required_fields.iter().any(|name| name == field)
    }

    /// Check the declaration is self-consistent.
    ///
    /// Runs at registration so a malformed book never reaches the catalog.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !is_valid_identifier(field) {
                bail!("field name must match ^[a-z][a-z0-9_]*$, got '{field}'");
            }
            if !seen.insert(field.as_str()) {
                bail!("field '{field}' declared more than once");
            }
        }
        for field in &self.multi_value_fields {
            if !self.has_field(field) {
                bail!("multi-valued field '{field}' is not a declared field");
            }
        }
        for field in &self.required_fields {
            if !self.has_field(field) {
                bail!("required field '{field}' is not a declared field");
            }
            if self.is_multi_valued(field) {
                bail!("required field '{field}' must be single-valued");
            }
        }
        if self.key_fields.is_empty() {
            bail!("at least one key field must be declared");
        }
        for field in &self.key_fields {
            if !self.is_required(field) {
                bail!("key field '{field}' must be a required field");
            }
        }
        Ok(())
    }
}
