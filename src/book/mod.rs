//! Capability surface every record book implements.
//!
//! A book declares its name and schema through its `RecordStore`, may
//! normalize incoming values per field, and lists any custom operations with
//! their parameter names. The catalog reads `operations()` and the schema;
//! the dispatcher calls the generic methods below, whose default bodies
//! normalize values and delegate to the store.

pub mod schema;
pub mod store;

pub use schema::BookSchema;
pub use store::{MIN_QUERY_LEN, RecordStore};

use crate::catalog::naming::{Verb, record_operation_name, to_public};
use crate::dispatch::Arguments;
use crate::error::DispatchError;
use crate::outcome::Outcome;
use crate::record::Record;
use anyhow::anyhow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    /// Whole-record add/get/update/delete; parameters come from the schema.
    Record(Verb),
    /// Book-specific action; parameters come from its declaration.
    Custom,
    /// Internal or administrative; never listed in the catalog.
    Hidden,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: String,
    pub kind: OperationKind,
    pub params: Vec<String>,
}

impl OperationSpec {
    pub fn record(verb: Verb) -> Self {
        Self {
            name: record_operation_name(verb),
            kind: OperationKind::Record(verb),
            params: Vec::new(),
        }
    }

    pub fn custom(name: &str, params: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: OperationKind::Custom,
            params: params.iter().map(|param| param.to_string()).collect(),
        }
    }

    pub fn hidden(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: OperationKind::Hidden,
            params: Vec::new(),
        }
    }
}

pub trait Book {
    fn store(&self) -> &RecordStore;

    fn store_mut(&mut self) -> &mut RecordStore;

    fn name(&self) -> &str {
        self.store().name()
    }

    fn schema(&self) -> &BookSchema {
        self.store().schema()
    }

    /// Validate and canonicalize one non-empty value for `field`.
    fn normalize(&self, _field: &str, value: &str) -> Result<String, DispatchError> {
        Ok(value.trim().to_string())
    }

    fn custom_operations(&self) -> Vec<OperationSpec> {
        Vec::new()
    }

    fn run_custom(&mut self, operation: &str, _args: &Arguments) -> Result<Outcome, DispatchError> {
        Err(DispatchError::UnknownCommand {
            command: to_public(operation),
            suggestions: Vec::new(),
        })
    }

    /// Everything the book exposes: the generic record operations in
    /// declaration order, then its custom (and hidden) operations.
    fn operations(&self) -> Vec<OperationSpec> {
        let mut operations: Vec<OperationSpec> =
            Verb::ALL.into_iter().map(OperationSpec::record).collect();
        operations.extend(self.custom_operations());
        operations
    }

    fn add(&mut self, values: &[(String, String)]) -> Result<String, DispatchError> {
        let values = self.normalize_values(values)?;
        self.store_mut().insert(&values)
    }

    /// Matching records; an empty result is not an error here.
    fn get(&self, criteria: &[(String, String)]) -> Result<Vec<Record>, DispatchError> {
        let criteria = self.normalize_criteria(criteria);
        Ok(self.store().find(&criteria)?.into_iter().cloned().collect())
    }

    fn update(
        &mut self,
        criteria: &[(String, String)],
        updates: &[(String, String)],
    ) -> Result<usize, DispatchError> {
        let criteria = self.normalize_criteria(criteria);
        let updates = self.normalize_values(updates)?;
        self.store_mut().update(&criteria, &updates)
    }

    fn delete(&mut self, criteria: &[(String, String)]) -> Result<usize, DispatchError> {
        let criteria = self.normalize_criteria(criteria);
        self.store_mut().remove(&criteria)
    }

    fn add_entry(&mut self, key: &str, field: &str, value: &str) -> Result<(), DispatchError> {
        let value = self.normalize_value(field, value)?;
        self.store_mut().add_entry(key, field, &value)
    }

    fn get_entries(
        &self,
        key: &str,
        field: &str,
        search: Option<&str>,
    ) -> Result<Vec<String>, DispatchError> {
        let search = search.map(|value| self.normalize_criterion(field, value));
        self.store().entries(key, field, search.as_deref())
    }

    fn update_entry(
        &mut self,
        key: &str,
        field: &str,
        old: &str,
        new: &str,
    ) -> Result<usize, DispatchError> {
        let old = self.normalize_criterion(field, old);
        let new = self.normalize_value(field, new)?;
        self.store_mut().update_entry(key, field, &old, &new)
    }

    fn delete_entry(&mut self, key: &str, field: &str, old: &str) -> Result<usize, DispatchError> {
        let old = self.normalize_criterion(field, old);
        self.store_mut().delete_entry(key, field, &old)
    }

    /// Replace the book's records with persisted ones, passing every value
    /// through the same normalization as interactive input.
    fn restore(&mut self, records: Vec<Record>) -> anyhow::Result<()> {
        let mut normalized = Vec::with_capacity(records.len());
        for mut record in records {
            let invalid =
                |err: DispatchError| anyhow!("{} record '{}': {err}", self.name(), record.key);
            for (field, value) in record.fields.iter_mut() {
                *value = self.normalize_value(field, value).map_err(invalid)?;
            }
            for (field, entries) in record.multi_value_fields.iter_mut() {
                for entry in entries.iter_mut() {
                    *entry = self.normalize_value(field, entry).map_err(invalid)?;
                }
            }
            normalized.push(record);
        }
        self.store_mut().restore(normalized)
    }

    /// Empty values pass through untouched so they can clear a field.
    fn normalize_value(&self, field: &str, value: &str) -> Result<String, DispatchError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Ok(String::new())
        } else {
            self.normalize(field, trimmed)
        }
    }

    fn normalize_values(
        &self,
        values: &[(String, String)],
    ) -> Result<Vec<(String, String)>, DispatchError> {
        values
            .iter()
            .map(|(field, value)| Ok((field.clone(), self.normalize_value(field, value)?)))
            .collect()
    }

    /// Search values are canonicalized when they validate and used as typed
    /// otherwise, so a malformed criterion simply matches nothing.
    fn normalize_criterion(&self, field: &str, value: &str) -> String {
        self.normalize_value(field, value)
            .unwrap_or_else(|_| value.trim().to_string())
    }

    fn normalize_criteria(&self, criteria: &[(String, String)]) -> Vec<(String, String)> {
        criteria
            .iter()
            .map(|(field, value)| (field.clone(), self.normalize_criterion(field, value)))
            .collect()
    }
}
