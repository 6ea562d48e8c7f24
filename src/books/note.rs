//! Note book: titled notes with free-form bodies and tags.

use crate::book::{Book, BookSchema, OperationSpec, RecordStore};
use crate::dispatch::Arguments;
use crate::error::DispatchError;
use crate::outcome::Outcome;

pub const BOOK_NAME: &str = "note";

const SEARCH: &str = "search_notes";

pub struct NoteBook {
    store: RecordStore,
}

impl NoteBook {
    pub fn new() -> Self {
        let schema = BookSchema::new(&["title", "body", "tag"], &["tag"], &["title"], &["title"]);
        Self {
            store: RecordStore::new(BOOK_NAME, schema),
        }
    }
}

impl Default for NoteBook {
    fn default() -> Self {
        Self::new()
    }
}

impl Book for NoteBook {
    fn store(&self) -> &RecordStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    fn normalize(&self, field: &str, value: &str) -> Result<String, DispatchError> {
        // Tags compare case-insensitively anyway; store them lowercase.
        if field == "tag" {
            Ok(value.to_lowercase())
        } else {
            Ok(value.to_string())
        }
    }

    fn custom_operations(&self) -> Vec<OperationSpec> {
        vec![OperationSpec::custom(SEARCH, &["query"])]
    }

    fn run_custom(&mut self, operation: &str, args: &Arguments) -> Result<Outcome, DispatchError> {
        if operation != SEARCH {
            return Err(DispatchError::UnknownCommand {
                command: operation.to_string(),
                suggestions: Vec::new(),
            });
        }
        let query = args
            .get("query")
            .ok_or_else(|| DispatchError::validation("missing search query"))?;
        Ok(Outcome::Records {
            book: BOOK_NAME.to_string(),
            records: self.store.search(query)?.into_iter().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_stored_lowercase() {
        let mut book = NoteBook::new();
        let key = book
            .add(&[
                ("title".to_string(), "Groceries".to_string()),
                ("tag".to_string(), "Home".to_string()),
            ])
            .unwrap();
        assert_eq!(key, "groceries");
        book.add_entry(&key, "tag", "URGENT").unwrap();
        assert_eq!(
            book.get_entries(&key, "tag", None).unwrap(),
            ["home", "urgent"]
        );
    }

    #[test]
    fn search_runs_through_custom_operation() {
        let mut book = NoteBook::new();
        book.add(&[
            ("title".to_string(), "Groceries".to_string()),
            ("body".to_string(), "milk,eggs".to_string()),
        ])
        .unwrap();
        let args: Arguments = [("query".to_string(), "EGG".to_string())].into_iter().collect();
        let outcome = book.run_custom("search_notes", &args).unwrap();
        match outcome {
            Outcome::Records { records, .. } => assert_eq!(records.len(), 1),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(book.run_custom("reindex", &args).is_err());
    }
}
