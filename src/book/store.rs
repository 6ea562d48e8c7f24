//! Keyed in-memory record store enforcing a `BookSchema`.
//!
//! Values reaching the store are already normalized by the owning book. The
//! store owns the generic semantics: required fields, key derivation and
//! uniqueness, case-insensitive matching, and per-element edits on
//! multi-valued fields.

use crate::book::schema::BookSchema;
use crate::error::DispatchError;
use crate::record::{Record, eq_ignore_case};
use anyhow::{Result, anyhow, bail};
use std::collections::{BTreeMap, BTreeSet};

/// Shortest accepted full-text query.
pub const MIN_QUERY_LEN: usize = 3;

const KEY_SEPARATOR: &str = ".";

#[derive(Clone, Debug)]
pub struct RecordStore {
    name: String,
    schema: BookSchema,
    records: BTreeMap<String, Record>,
}

impl RecordStore {
    pub fn new(name: &str, schema: BookSchema) -> Self {
        Self {
            name: name.to_string(),
            schema,
            records: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &BookSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(&key.to_lowercase())
    }

    pub fn insert(&mut self, values: &[(String, String)]) -> Result<String, DispatchError> {
        let record = self.build_record(values)?;
        if self.records.contains_key(&record.key) {
            return Err(DispatchError::validation(format!(
                "{} '{}' already exists",
                self.name, record.key
            )));
        }
        let key = record.key.clone();
        self.records.insert(key.clone(), record);
        Ok(key)
    }

    /// Records matching every criterion; no criteria matches everything.
    pub fn find(&self, criteria: &[(String, String)]) -> Result<Vec<&Record>, DispatchError> {
        self.check_known(criteria)?;
        Ok(self
            .records
            .values()
            .filter(|record| {
                criteria
                    .iter()
                    .all(|(field, expected)| record.matches(field, expected))
            })
            .collect())
    }

    /// Apply `updates` to every record matching `criteria`.
    ///
    /// All matched records are staged first; a key collision rejects the
    /// whole update and leaves the store untouched.
    pub fn update(
        &mut self,
        criteria: &[(String, String)],
        updates: &[(String, String)],
    ) -> Result<usize, DispatchError> {
        if criteria.is_empty() {
            return Err(DispatchError::validation(
                "update needs at least one search parameter",
            ));
        }
        if updates.is_empty() {
            return Err(DispatchError::validation(
                "nothing to update: pass at least one update parameter",
            ));
        }
        self.check_known(updates)?;

        let matched: Vec<String> = self
            .find(criteria)?
            .into_iter()
            .map(|record| record.key.clone())
            .collect();
        if matched.is_empty() {
            return Err(DispatchError::not_found(format!(
                "no {} record matches {}",
                self.name,
                describe(criteria)
            )));
        }

        let mut staged = Vec::with_capacity(matched.len());
        for key in &matched {
            let Some(current) = self.records.get(key) else {
                continue;
            };
            let mut record = current.clone();
            for (field, value) in updates {
                self.assign(&mut record, field, value)?;
            }
            record.key = self.key_of(&record)?;
            staged.push((key.clone(), record));
        }

        let mut new_keys = BTreeSet::new();
        for (old_key, record) in &staged {
            if !new_keys.insert(record.key.as_str()) {
                return Err(DispatchError::validation(format!(
                    "update would give several {} records the key '{}'",
                    self.name, record.key
                )));
            }
            let taken = record.key != *old_key
                && self.records.contains_key(&record.key)
                && !matched.contains(&record.key);
            if taken {
                return Err(DispatchError::validation(format!(
                    "update would collide with existing {} '{}'",
                    self.name, record.key
                )));
            }
        }

        for (old_key, _) in &staged {
            self.records.remove(old_key);
        }
        let count = staged.len();
        for (_, record) in staged {
            self.records.insert(record.key.clone(), record);
        }
        Ok(count)
    }

    pub fn remove(&mut self, criteria: &[(String, String)]) -> Result<usize, DispatchError> {
        if criteria.is_empty() {
            return Err(DispatchError::validation(
                "delete needs at least one search parameter",
            ));
        }
        let keys: Vec<String> = self
            .find(criteria)?
            .into_iter()
            .map(|record| record.key.clone())
            .collect();
        for key in &keys {
            self.records.remove(key);
        }
        Ok(keys.len())
    }

    /// Case-insensitive substring search over every value of every record.
    pub fn search(&self, query: &str) -> Result<Vec<&Record>, DispatchError> {
        let needle = query.trim().to_lowercase();
        if needle.chars().count() < MIN_QUERY_LEN {
            return Err(DispatchError::validation(format!(
                "search query must be at least {MIN_QUERY_LEN} characters long"
            )));
        }
        Ok(self
            .records
            .values()
            .filter(|record| record.contains_text(&needle))
            .collect())
    }

    pub fn add_entry(&mut self, key: &str, field: &str, value: &str) -> Result<(), DispatchError> {
        self.check_multi(field)?;
        if value.is_empty() {
            return Err(DispatchError::validation(format!("{field} must not be empty")));
        }
        let record = self.record_mut(key)?;
        let values = record
            .multi_value_fields
            .entry(field.to_string())
            .or_default();
        if values.iter().any(|existing| eq_ignore_case(existing, value)) {
            return Err(DispatchError::validation(format!(
                "'{key}' already has {field} '{value}'"
            )));
        }
        values.push(value.to_string());
        Ok(())
    }

    /// Elements of `field`, optionally only those equal to `search`.
    pub fn entries(
        &self,
        key: &str,
        field: &str,
        search: Option<&str>,
    ) -> Result<Vec<String>, DispatchError> {
        self.check_multi(field)?;
        let record = self.get(key).ok_or_else(|| self.missing_key(key))?;
        Ok(record
            .entries(field)
            .iter()
            .filter(|value| search.is_none_or(|expected| eq_ignore_case(value, expected)))
            .cloned()
            .collect())
    }

    pub fn update_entry(
        &mut self,
        key: &str,
        field: &str,
        old: &str,
        new: &str,
    ) -> Result<usize, DispatchError> {
        self.check_multi(field)?;
        if new.is_empty() {
            return Err(DispatchError::validation(format!(
                "new {field} must not be empty"
            )));
        }
        let record = self.record_mut(key)?;
        let values = record
            .multi_value_fields
            .get_mut(field)
            .ok_or_else(|| DispatchError::not_found(format!("'{key}' has no {field} '{old}'")))?;
        let position = values
            .iter()
            .position(|existing| eq_ignore_case(existing, old))
            .ok_or_else(|| DispatchError::not_found(format!("'{key}' has no {field} '{old}'")))?;
        let duplicate = values
            .iter()
            .enumerate()
            .any(|(idx, existing)| idx != position && eq_ignore_case(existing, new));
        if duplicate {
            return Err(DispatchError::validation(format!(
                "'{key}' already has {field} '{new}'"
            )));
        }
        values[position] = new.to_string();
        Ok(1)
    }

    pub fn delete_entry(&mut self, key: &str, field: &str, old: &str) -> Result<usize, DispatchError> {
        self.check_multi(field)?;
        let record = self.record_mut(key)?;
        let Some(values) = record.multi_value_fields.get_mut(field) else {
            return Ok(0);
        };
        let before = values.len();
        values.retain(|existing| !eq_ignore_case(existing, old));
        let removed = before - values.len();
        if values.is_empty() {
            record.multi_value_fields.remove(field);
        }
        Ok(removed)
    }

    /// Replace the store's contents with persisted records.
    ///
    /// Every record is rebuilt through the schema, so unknown fields, missing
    /// required fields, and duplicate keys in a state file are rejected.
    pub fn restore(&mut self, records: Vec<Record>) -> Result<()> {
        let mut restored = BTreeMap::new();
        for stored in records {
            let Record {
                key,
                fields,
                multi_value_fields,
            } = stored;
            let mut values: Vec<(String, String)> = fields.into_iter().collect();
            for (field, entries) in multi_value_fields {
                values.extend(entries.into_iter().map(|entry| (field.clone(), entry)));
            }
            let record = self
                .build_record(&values)
                .map_err(|err| anyhow!("{} record '{key}': {err}", self.name))?;
            if restored.contains_key(&record.key) {
                bail!("duplicate {} key '{}'", self.name, record.key);
            }
            restored.insert(record.key.clone(), record);
        }
        self.records = restored;
        Ok(())
    }

    fn build_record(&self, values: &[(String, String)]) -> Result<Record, DispatchError> {
        self.check_known(values)?;
        let mut record = Record::default();
        for (field, value) in values {
            if value.is_empty() {
                continue;
            }
            if self.schema.is_multi_valued(field) {
                let entries = record
                    .multi_value_fields
                    .entry(field.clone())
                    .or_default();
                if !entries.iter().any(|existing| eq_ignore_case(existing, value)) {
                    entries.push(value.clone());
                }
            } else {
                record.fields.insert(field.clone(), value.clone());
            }
        }

        let missing: Vec<&str> = self
            .schema
            .required_fields()
            .iter()
            .map(String::as_str)
            .filter(|field| record.field(field).is_none_or(str::is_empty))
            .collect();
        if !missing.is_empty() {
            return Err(DispatchError::validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        record.key = self.key_of(&record)?;
        Ok(record)
    }

    fn assign(&self, record: &mut Record, field: &str, value: &str) -> Result<(), DispatchError> {
        if self.schema.is_multi_valued(field) {
            if value.is_empty() {
                record.multi_value_fields.remove(field);
            } else {
                record
                    .multi_value_fields
                    .insert(field.to_string(), vec![value.to_string()]);
            }
        } else if value.is_empty() {
            if self.schema.is_required(field) {
                return Err(DispatchError::validation(format!(
                    "{field} is required and cannot be cleared"
                )));
            }
            record.fields.remove(field);
        } else {
            record.fields.insert(field.to_string(), value.to_string());
        }
        Ok(())
    }

    fn key_of(&self, record: &Record) -> Result<String, DispatchError> {
        let mut parts = Vec::with_capacity(self.schema.key_fields().len());
        for field in self.schema.key_fields() {
            match record.field(field) {
                Some(value)
                    if value.contains(KEY_SEPARATOR) || value.contains(char::is_whitespace) =>
                {
                    return Err(DispatchError::validation(format!(
                        "{field} is part of the {} key and must not contain '{KEY_SEPARATOR}' \
                         or spaces, got '{value}'",
                        self.name
                    )));
                }
                Some(value) if !value.is_empty() => parts.push(value.to_lowercase()),
                _ => {
                    return Err(DispatchError::validation(format!(
                        "missing key field '{field}'"
                    )));
                }
            }
        }
        Ok(parts.join(KEY_SEPARATOR))
    }

    fn check_known(&self, values: &[(String, String)]) -> Result<(), DispatchError> {
        let unsupported: Vec<&str> = values
            .iter()
            .map(|(field, _)| field.as_str())
            .filter(|field| !self.schema.has_field(field))
            .collect();
        if unsupported.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::validation(format!(
                "unsupported field(s) for {}: {}",
                self.name,
                unsupported.join(", ")
            )))
        }
    }

    fn check_multi(&self, field: &str) -> Result<(), DispatchError> {
        if self.schema.is_multi_valued(field) {
            Ok(())
        } else {
            Err(DispatchError::validation(format!(
                "{field} is not a multi-valued field of {}",
                self.name
            )))
        }
    }

    fn record_mut(&mut self, key: &str) -> Result<&mut Record, DispatchError> {
        let name = &self.name;
        self.records
            .get_mut(&key.to_lowercase())
            .ok_or_else(|| DispatchError::not_found(format!("no {name} with key '{key}'")))
    }

    fn missing_key(&self, key: &str) -> DispatchError {
        DispatchError::not_found(format!("no {} with key '{key}'", self.name))
    }
}

/// Render criteria as `field=value, ...` for messages.
pub(crate) fn describe(criteria: &[(String, String)]) -> String {
    criteria
        .iter()
        .map(|(field, value)| format!("{field}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
