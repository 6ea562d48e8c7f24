#![allow(dead_code)]

use anyhow::{Context, Result, anyhow};
use recordbook::book::{Book, BookSchema, OperationSpec, RecordStore};
use recordbook::dispatch::Arguments;
use recordbook::{CommandCatalog, DispatchError, Dispatcher, Library, Outcome};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Default books plus a dispatcher over their catalog.
pub fn session() -> (Library, Dispatcher) {
    let library = Library::with_default_books().expect("default books");
    let catalog = CommandCatalog::build(&library).expect("default catalog");
    (library, Dispatcher::new(catalog))
}

pub fn run(dispatcher: &Dispatcher, library: &mut Library, line: &str) -> Result<Outcome> {
    dispatcher
        .dispatch(library, line)
        .map_err(|err| anyhow!("{line}: {err}"))
}

pub fn run_err(dispatcher: &Dispatcher, library: &mut Library, line: &str) -> DispatchError {
    match dispatcher.dispatch(library, line) {
        Ok(outcome) => panic!("{line}: expected an error, got {outcome:?}"),
        Err(err) => err,
    }
}

pub fn recordbook_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_recordbook"))
}

/// Run the REPL against `state`, feeding `input` on stdin until EOF.
pub fn run_repl(state: &Path, input: impl AsRef<[u8]>) -> Result<Output> {
    let mut child = Command::new(recordbook_binary())
        .arg("--state")
        .arg(state)
        .env_remove("RECORDBOOK_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawning recordbook")?;
    child
        .stdin
        .take()
        .context("recordbook stdin")?
        .write_all(input.as_ref())
        .context("writing REPL input")?;
    child.wait_with_output().context("waiting for recordbook")
}

/// Book with a hidden maintenance operation next to a visible one.
pub struct ArchiveBook {
    store: RecordStore,
}

impl ArchiveBook {
    pub fn new() -> Self {
        let schema = BookSchema::new(&["name", "label"], &["label"], &["name"], &["name"]);
        Self {
            store: RecordStore::new("archive", schema),
        }
    }
}

impl Book for ArchiveBook {
    fn store(&self) -> &RecordStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    fn custom_operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::custom("count_archive", &[]),
            OperationSpec::hidden("compact_archive"),
        ]
    }

    fn run_custom(&mut self, operation: &str, _args: &Arguments) -> Result<Outcome, DispatchError> {
        match operation {
            "count_archive" => Ok(Outcome::Text(self.store.len().to_string())),
            other => Err(DispatchError::UnknownCommand {
                command: other.to_string(),
                suggestions: Vec::new(),
            }),
        }
    }
}

/// Book whose custom operation publishes the same name as contact's add.
pub struct ClashBook {
    store: RecordStore,
}

impl ClashBook {
    pub fn new() -> Self {
        let schema = BookSchema::new(&["title"], &[], &["title"], &["title"]);
        Self {
            store: RecordStore::new("clash", schema),
        }
    }
}

impl Book for ClashBook {
    fn store(&self) -> &RecordStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    fn custom_operations(&self) -> Vec<OperationSpec> {
        vec![OperationSpec::custom("add_contact", &["title"])]
    }
}
