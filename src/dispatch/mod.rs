//! Resolves input lines against the catalog and runs them on the library.
//!
//! A line is parsed (`parse`), looked up by exact public name, bound to the
//! command's parameter schema, and executed against the owning book. Every
//! failure comes back as a `DispatchError`; the caller prints it and keeps
//! reading.

pub mod parse;

pub use parse::CommandLine;

use crate::book::Book;
use crate::book::store::describe;
use crate::catalog::naming::{Verb, search_label, to_internal, update_label};
use crate::catalog::{Builtin, CommandCatalog, CommandSpec, CommandTarget, ParamRole};
use crate::error::DispatchError;
use crate::library::Library;
use crate::outcome::Outcome;
use std::collections::BTreeMap;
use tracing::debug;

/// Bound arguments of a custom operation, keyed by declared parameter name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arguments {
    values: BTreeMap<String, String>,
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Parameters of one invocation after binding against its `CommandSpec`.
#[derive(Debug)]
struct Bound<'a> {
    spec: &'a CommandSpec,
    key: Option<String>,
    values: BTreeMap<String, String>,
}

impl Bound<'_> {
    /// `(field, value)` pairs for `role`, in schema order. Empty search
    /// values count as not given.
    fn fields(&self, role: ParamRole) -> Vec<(String, String)> {
        self.spec
            .params
            .iter()
            .filter(|param| param.role == role)
            .filter_map(|param| {
                let value = self.values.get(&param.label)?;
                if role == ParamRole::Search && value.trim().is_empty() {
                    return None;
                }
                Some((param.field.clone(), value.clone()))
            })
            .collect()
    }

    fn single(&self, role: ParamRole) -> Option<String> {
        self.fields(role).into_iter().next().map(|(_, value)| value)
    }

    fn arguments(&self) -> Arguments {
        self.fields(ParamRole::Argument).into_iter().collect()
    }

    fn key(&self) -> Result<&str, DispatchError> {
        self.key
            .as_deref()
            .ok_or_else(|| DispatchError::validation(format!("{} needs a record key", self.spec.name)))
    }
}

/// Match named and positional arguments to the command's labels.
fn bind(spec: &CommandSpec, line: CommandLine) -> Result<Bound<'_>, DispatchError> {
    let mut positional = line.positional.into_iter();
    let key = if spec.takes_key() {
        let owner = spec.owner.as_deref().unwrap_or("record");
        let key = positional.next().ok_or_else(|| {
            DispatchError::validation(format!("{} needs the {owner} key first", spec.name))
        })?;
        Some(key.to_lowercase())
    } else {
        None
    };

    let mut values = BTreeMap::new();
    for (label, value) in line.named {
        if spec.param(&label).is_none() {
            return Err(DispatchError::validation(format!(
                "unknown argument '{label}' for {}; expected: {}",
                spec.name,
                expected_labels(spec)
            )));
        }
        if values.contains_key(&label) {
            return Err(DispatchError::validation(format!(
                "argument '{label}' given more than once"
            )));
        }
        values.insert(label, value);
    }

    let unbound: Vec<&str> = spec
        .labels()
        .filter(|label| !values.contains_key(*label))
        .collect();
    let mut unbound = unbound.into_iter();
    for value in positional {
        match unbound.next() {
            Some(label) => {
                values.insert(label.to_string(), value);
            }
            None => {
                return Err(DispatchError::validation(format!(
                    "too many arguments for {}; expected: {}",
                    spec.name,
                    expected_labels(spec)
                )));
            }
        }
    }

    Ok(Bound { spec, key, values })
}

fn expected_labels(spec: &CommandSpec) -> String {
    let labels: Vec<&str> = spec.labels().collect();
    if labels.is_empty() {
        "no arguments".to_string()
    } else {
        labels.join(", ")
    }
}

/// Owns the catalog and executes lines against a borrowed library.
pub struct Dispatcher {
    catalog: CommandCatalog,
}

impl Dispatcher {
    pub fn new(catalog: CommandCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    /// Parse, resolve and run one input line.
    pub fn dispatch(&self, library: &mut Library, line: &str) -> Result<Outcome, DispatchError> {
        let Some(line) = CommandLine::parse(line) else {
            return Ok(Outcome::Silent);
        };
        let Some(spec) = self.catalog.get(&line.command) else {
            debug!(command = %line.command, "unknown command");
            return Err(DispatchError::UnknownCommand {
                suggestions: self.catalog.suggest(&line.command),
                command: line.command,
            });
        };
        debug!(
            command = %spec.name,
            internal = %to_internal(&spec.name),
            "dispatching"
        );
        let bound = bind(spec, line)?;
        self.execute(library, &bound)
    }

    fn execute(&self, library: &mut Library, bound: &Bound<'_>) -> Result<Outcome, DispatchError> {
        match &bound.spec.target {
            CommandTarget::Builtin { builtin } => Ok(match builtin {
                Builtin::Help => Outcome::Text(self.catalog.render()),
                Builtin::Exit => Outcome::Exit,
            }),
            CommandTarget::Record { book, verb } => {
                let book = book_at(library, bound.spec, *book)?;
                run_record(book, *verb, bound)
            }
            CommandTarget::Entry { book, verb, field } => {
                let book = book_at(library, bound.spec, *book)?;
                run_entry(book, *verb, field, bound)
            }
            CommandTarget::Custom { book, operation } => {
                let book = book_at(library, bound.spec, *book)?;
                book.run_custom(operation, &bound.arguments())
            }
        }
    }
}

fn book_at<'l>(
    library: &'l mut Library,
    spec: &CommandSpec,
    position: usize,
) -> Result<&'l mut dyn Book, DispatchError> {
    library
        .book_mut(position)
        .ok_or_else(|| DispatchError::UnknownCommand {
            command: spec.name.clone(),
            suggestions: Vec::new(),
        })
}

fn run_record(book: &mut dyn Book, verb: Verb, bound: &Bound<'_>) -> Result<Outcome, DispatchError> {
    let name = book.name().to_string();
    match verb {
        Verb::Add => {
            let key = book.add(&bound.fields(ParamRole::Value))?;
            debug!(book = %name, key = %key, "record added");
            Ok(Outcome::Added { book: name, key })
        }
        Verb::Get => {
            let criteria = bound.fields(ParamRole::Search);
            let records = book.get(&criteria)?;
            if records.is_empty() && !criteria.is_empty() {
                return Err(DispatchError::not_found(format!(
                    "no {name} record matches {}",
                    describe(&criteria)
                )));
            }
            Ok(Outcome::Records {
                book: name,
                records,
            })
        }
        Verb::Update => {
            let criteria = bound.fields(ParamRole::Search);
            let updates = bound.fields(ParamRole::Update);
            let count = book.update(&criteria, &updates)?;
            debug!(book = %name, count, "records updated");
            Ok(Outcome::Affected {
                book: name,
                verb,
                count,
            })
        }
        Verb::Delete => {
            let count = book.delete(&bound.fields(ParamRole::Search))?;
            debug!(book = %name, count, "records deleted");
            Ok(Outcome::Affected {
                book: name,
                verb,
                count,
            })
        }
    }
}

fn run_entry(
    book: &mut dyn Book,
    verb: Verb,
    field: &str,
    bound: &Bound<'_>,
) -> Result<Outcome, DispatchError> {
    let key = bound.key()?.to_string();
    let required = |role: ParamRole, label: String| {
        bound
            .single(role)
            .ok_or_else(|| DispatchError::validation(format!("{} needs {label}", bound.spec.name)))
    };
    match verb {
        Verb::Add => {
            let value = required(ParamRole::Value, field.to_string())?;
            book.add_entry(&key, field, &value)?;
            let value = book.normalize_value(field, &value)?;
            Ok(Outcome::EntryAdded {
                key,
                field: field.to_string(),
                value,
            })
        }
        Verb::Get => {
            let search = bound.single(ParamRole::Search);
            let values = book.get_entries(&key, field, search.as_deref())?;
            if let Some(search) = search.filter(|_| values.is_empty()) {
                return Err(DispatchError::not_found(format!(
                    "'{key}' has no {field} '{search}'"
                )));
            }
            Ok(Outcome::Entries {
                key,
                field: field.to_string(),
                values,
            })
        }
        Verb::Update => {
            let old = required(ParamRole::Search, search_label(field))?;
            let new = required(ParamRole::Update, update_label(field))?;
            let count = book.update_entry(&key, field, &old, &new)?;
            Ok(Outcome::EntriesAffected {
                key,
                field: field.to_string(),
                verb,
                count,
            })
        }
        Verb::Delete => {
            let old = required(ParamRole::Search, search_label(field))?;
            let count = book.delete_entry(&key, field, &old)?;
            Ok(Outcome::EntriesAffected {
                key,
                field: field.to_string(),
                verb,
                count,
            })
        }
    }
}
