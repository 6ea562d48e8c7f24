//! Saving and restoring library state as a single JSON file.
//!
//! The file is validated against `schema/book_state.schema.json` before any
//! record is restored, and every record is then rebuilt through its book's
//! normalization and schema. Writes go to a temporary file in the target
//! directory and are renamed into place, so a crash never leaves a
//! half-written state file.

use crate::library::Library;
use crate::record::Record;
use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const STATE_SCHEMA_VERSION: &str = "recordbook_state_v1";

/// Overrides the default state location.
pub const STATE_ENV: &str = "RECORDBOOK_STATE";

const STATE_SCHEMA: &str = include_str!("../schema/book_state.schema.json");
const STATE_DIR: &str = ".recordbook";
const STATE_FILE: &str = "state.json";
const FALLBACK_STATE_FILE: &str = "recordbook_state.json";

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    schema_version: String,
    books: BTreeMap<String, Vec<Record>>,
}

/// Where state lives: `--state`, then `$RECORDBOOK_STATE`, then
/// `$HOME/.recordbook/state.json`, then `./recordbook_state.json`.
pub fn resolve_state_path(explicit: Option<&Path>) -> PathBuf {
    resolve_state_path_from(explicit, env::var_os(STATE_ENV), env::var_os("HOME"))
}

fn resolve_state_path_from(
    explicit: Option<&Path>,
    from_env: Option<OsString>,
    home: Option<OsString>,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = from_env.filter(|value| !value.is_empty()) {
        return PathBuf::from(path);
    }
    match home.filter(|value| !value.is_empty()) {
        Some(home) => PathBuf::from(home).join(STATE_DIR).join(STATE_FILE),
        None => PathBuf::from(FALLBACK_STATE_FILE),
    }
}

/// Restore every book named in the state file; returns the record count.
///
/// A missing file is an empty library. Books the file names but the library
/// does not register are skipped with a warning.
pub fn load_state(library: &mut Library, path: &Path) -> Result<usize> {
    if !path.exists() {
        debug!(path = %path.display(), "no state file; starting empty");
        return Ok(0);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading state file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing state file {}", path.display()))?;
    validate_state(&value).with_context(|| format!("validating {}", path.display()))?;
    let state: StateFile = serde_json::from_value(value)
        .with_context(|| format!("decoding state file {}", path.display()))?;

    let mut restored = 0;
    for (name, records) in state.books {
        let Some(book) = library.find_mut(&name) else {
            warn!(book = %name, "state file names an unregistered book; skipping");
            continue;
        };
        let count = records.len();
        book.restore(records)
            .with_context(|| format!("restoring book '{name}' from {}", path.display()))?;
        restored += count;
    }
    info!(path = %path.display(), records = restored, "loaded state");
    Ok(restored)
}

/// Write every book's records to `path`, replacing it atomically.
pub fn save_state(library: &Library, path: &Path) -> Result<()> {
    let state = StateFile {
        schema_version: STATE_SCHEMA_VERSION.to_string(),
        books: library
            .books()
            .map(|book| (book.name().to_string(), book.store().iter().cloned().collect()))
            .collect(),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, &state)
        .with_context(|| format!("serializing state for {}", path.display()))?;
    tmp.write_all(b"\n")
        .with_context(|| format!("writing state for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("flushing state for {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("writing state file {}", path.display()))?;
    info!(path = %path.display(), books = state.books.len(), "saved state");
    Ok(())
}

fn validate_state(value: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(STATE_SCHEMA).context("parsing embedded state schema")?;
    let compiled =
        JSONSchema::compile(&schema).map_err(|err| anyhow!("compiling state schema: {err}"))?;
    if let Err(errors) = compiled.validate(value) {
        let details = errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        bail!("state file failed schema validation:\n{details}");
    }
    Ok(())
}
