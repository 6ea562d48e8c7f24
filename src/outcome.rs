//! Displayable result of one dispatched command.

use crate::catalog::naming::Verb;
use crate::record::Record;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to print (blank input).
    Silent,
    /// A sentinel command asked to end the session.
    Exit,
    Text(String),
    Added {
        book: String,
        key: String,
    },
    Records {
        book: String,
        records: Vec<Record>,
    },
    /// Whole records updated or deleted.
    Affected {
        book: String,
        verb: Verb,
        count: usize,
    },
    Entries {
        key: String,
        field: String,
        values: Vec<String>,
    },
    EntryAdded {
        key: String,
        field: String,
        value: String,
    },
    /// Elements of one record's multi-valued field updated or deleted.
    EntriesAffected {
        key: String,
        field: String,
        verb: Verb,
        count: usize,
    },
}

impl Outcome {
    pub fn is_silent(&self) -> bool {
        matches!(self, Outcome::Silent)
    }

    pub fn ends_session(&self) -> bool {
        matches!(self, Outcome::Exit)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Silent => Ok(()),
            Outcome::Exit => f.write_str("Good bye!"),
            Outcome::Text(text) => f.write_str(text),
            Outcome::Added { book, key } => write!(f, "added {book} '{key}'"),
            Outcome::Records { book, records } => {
                if records.is_empty() {
                    return write!(f, "no {book} records");
                }
                let lines: Vec<String> = records.iter().map(Record::to_string).collect();
                f.write_str(&lines.join("\n"))
            }
            Outcome::Affected { book, verb, count } => {
                write!(f, "{} {count} {book} record(s)", verb.past_tense())
            }
            Outcome::Entries { key, field, values } => {
                if values.is_empty() {
                    write!(f, "'{key}' has no {field}")
                } else {
                    write!(f, "'{key}' {field}: {}", values.join(", "))
                }
            }
            Outcome::EntryAdded { key, field, value } => {
                write!(f, "added {field} '{value}' to '{key}'")
            }
            Outcome::EntriesAffected {
                key,
                field,
                verb,
                count,
            } => write!(f, "{} {count} {field} entry(ies) of '{key}'", verb.past_tense()),
        }
    }
}
