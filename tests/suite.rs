#![cfg(unix)]

// Integration suite for the recordbook library and REPL binary: catalog
// generation, dispatch semantics, persistence, and the interactive loop.
mod support;

use anyhow::{Context, Result, bail};
use recordbook::catalog::naming::Verb;
use recordbook::{
    Book, CatalogError, CommandCatalog, CommandTarget, DispatchError, Library, Outcome, ParamRole,
    load_state, save_state,
};
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::process::{Command, Stdio};
use support::{ArchiveBook, ClashBook, recordbook_binary, run, run_err, run_repl, session};
use tempfile::TempDir;

fn records(outcome: Outcome) -> Result<Vec<recordbook::Record>> {
    match outcome {
        Outcome::Records { records, .. } => Ok(records),
        other => bail!("expected records, got {other:?}"),
    }
}

// Every book contributes exactly its four generic commands, with one parameter
// per field (two for update), plus four per-element commands per multi field.
#[test]
fn catalog_lists_generic_and_element_commands_per_book() -> Result<()> {
    let (library, dispatcher) = session();
    let catalog = dispatcher.catalog();
    for book in library.books() {
        let name = book.name();
        let fields = book.schema().fields();
        for verb in Verb::ALL {
            let command = format!("{verb}-{name}");
            let spec = catalog
                .get(&command)
                .with_context(|| format!("missing {command}"))?;
            let expected = if verb == Verb::Update {
                fields.len() * 2
            } else {
                fields.len()
            };
            assert_eq!(spec.params.len(), expected, "{command}");
            assert!(matches!(spec.target, CommandTarget::Record { verb: v, .. } if v == verb));
        }
        for field in book.schema().multi_value_fields() {
            for verb in Verb::ALL {
                let command = format!("{verb}-{name}-{}", field.replace('_', "-"));
                let spec = catalog
                    .get(&command)
                    .with_context(|| format!("missing {command}"))?;
                assert!(spec.takes_key(), "{command}");
            }
        }
        let owned = catalog
            .iter()
            .filter(|spec| spec.owner.as_deref() == Some(name))
            .count();
        let expected = 4 + book.custom_operations().len() + 4 * book.schema().multi_value_fields().len();
        assert_eq!(owned, expected, "commands owned by {name}");
    }
    Ok(())
}

// add then get by first name returns the single stored contact.
#[test]
fn added_contact_is_found_by_search() -> Result<()> {
    let (mut library, dispatcher) = session();
    run(
        &dispatcher,
        &mut library,
        "add-contact firstname=Jane lastname=Doe phone_number=555-1234",
    )?;
    let found = records(run(&dispatcher, &mut library, "get-contact search_firstname=jane")?)?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field("firstname"), Some("Jane"));
    assert_eq!(found[0].entries("phone_number"), ["555-1234"]);
    Ok(())
}

// A repeated delete reports zero, and a search for the deleted record is NotFound.
#[test]
fn delete_is_idempotent() -> Result<()> {
    let (mut library, dispatcher) = session();
    run(&dispatcher, &mut library, "add-contact Jane Doe")?;
    let first = run(&dispatcher, &mut library, "delete-contact search_firstname=Jane")?;
    assert_eq!(
        first,
        Outcome::Affected {
            book: "contact".to_string(),
            verb: Verb::Delete,
            count: 1
        }
    );
    let second = run(&dispatcher, &mut library, "delete-contact search_firstname=Jane")?;
    assert!(matches!(second, Outcome::Affected { count: 0, .. }));
    let missing = run_err(&dispatcher, &mut library, "get-contact search_firstname=Jane");
    assert!(matches!(missing, DispatchError::NotFound(_)));
    Ok(())
}

#[test]
fn unknown_command_is_reported() {
    let (mut library, dispatcher) = session();
    let err = run_err(&dispatcher, &mut library, "foo-bar");
    assert!(matches!(err, DispatchError::UnknownCommand { ref command, .. } if command == "foo-bar"));
    assert!(err.to_string().starts_with("Unknown command: foo-bar"));
}

#[test]
fn blank_input_does_nothing() -> Result<()> {
    let (mut library, dispatcher) = session();
    assert_eq!(run(&dispatcher, &mut library, "")?, Outcome::Silent);
    assert_eq!(run(&dispatcher, &mut library, " \t ")?, Outcome::Silent);
    Ok(())
}

// Updating a multi-valued field replaces its whole sequence.
#[test]
fn update_replaces_multi_valued_field() -> Result<()> {
    let (mut library, dispatcher) = session();
    run(&dispatcher, &mut library, "add-contact Jane Doe phone_number=555-1234")?;
    run(&dispatcher, &mut library, "add-contact-phone-number jane.doe 555-0000")?;
    let updated = run(
        &dispatcher,
        &mut library,
        "update-contact update_phone_number=999 search_firstname=Jane",
    )?;
    assert!(matches!(updated, Outcome::Affected { count: 1, .. }));
    let phones = run(&dispatcher, &mut library, "get-contact-phone-number jane.doe")?;
    assert_eq!(
        phones,
        Outcome::Entries {
            key: "jane.doe".to_string(),
            field: "phone_number".to_string(),
            values: vec!["999".to_string()]
        }
    );
    Ok(())
}

// An update that would merge two records under one key changes nothing.
#[test]
fn update_rejects_key_collisions() -> Result<()> {
    let (mut library, dispatcher) = session();
    run(&dispatcher, &mut library, "add-contact Jane Doe")?;
    run(&dispatcher, &mut library, "add-contact John Doe")?;
    let err = run_err(
        &dispatcher,
        &mut library,
        "update-contact search_firstname=John update_firstname=Jane",
    );
    assert!(matches!(err, DispatchError::Validation(_)));
    let all = records(run(&dispatcher, &mut library, "get-contact")?)?;
    let keys: Vec<&str> = all.iter().map(|record| record.key.as_str()).collect();
    assert_eq!(keys, ["jane.doe", "john.doe"]);

    run(
        &dispatcher,
        &mut library,
        "update-contact search_firstname=John update_firstname=Jim",
    )?;
    let renamed = records(run(&dispatcher, &mut library, "get-contact search_lastname=doe")?)?;
    let keys: Vec<&str> = renamed.iter().map(|record| record.key.as_str()).collect();
    assert_eq!(keys, ["jane.doe", "jim.doe"]);
    Ok(())
}

#[test]
fn update_without_match_is_not_found() {
    let (mut library, dispatcher) = session();
    let err = run_err(
        &dispatcher,
        &mut library,
        "update-note search_title=nothing update_body=x",
    );
    assert!(matches!(err, DispatchError::NotFound(_)));
}

// Required fields and malformed values never reach the store.
#[test]
fn validation_errors_leave_books_untouched() -> Result<()> {
    let (mut library, dispatcher) = session();
    let missing = run_err(&dispatcher, &mut library, "add-contact firstname=Jane");
    assert!(missing.to_string().contains("lastname"));
    let email = run_err(&dispatcher, &mut library, "add-contact Jane Doe email=jane@");
    assert!(matches!(email, DispatchError::Validation(_)));
    run(&dispatcher, &mut library, "add-contact Jane Doe")?;
    let cleared = run_err(
        &dispatcher,
        &mut library,
        "update-contact search_firstname=Jane update_lastname=",
    );
    assert!(matches!(cleared, DispatchError::Validation(_)));
    assert_eq!(library.find("contact").map(|book| book.store().len()), Some(1));
    Ok(())
}

#[test]
fn duplicate_books_make_catalog_construction_fail() -> Result<()> {
    let mut library = Library::with_default_books()?;
    library.register(Box::new(recordbook::books::ContactBook::new()))?;
    let err = CommandCatalog::build(&library).expect_err("duplicate contact book");
    assert!(matches!(err, CatalogError::AmbiguousCollision { ref command, .. } if command == "add-contact"));
    Ok(())
}

// A custom operation may not publish a name a generated command already uses.
#[test]
fn coinciding_generated_names_collide() -> Result<()> {
    let mut library = Library::new();
    library.register(Box::new(recordbook::books::ContactBook::new()))?;
    library.register(Box::new(ClashBook::new()))?;
    let CatalogError::AmbiguousCollision {
        command,
        first,
        second,
    } = CommandCatalog::build(&library).expect_err("clashing names");
    assert_eq!(command, "add-contact");
    assert_eq!(first, "book 'contact'");
    assert_eq!(second, "book 'clash'");
    Ok(())
}

#[test]
fn hidden_operations_stay_out_of_the_catalog() -> Result<()> {
    let mut library = Library::new();
    library.register(Box::new(ArchiveBook::new()))?;
    let catalog = CommandCatalog::build(&library)?;
    assert!(catalog.get("count-archive").is_some());
    assert!(catalog.get("compact-archive").is_none());
    assert!(catalog.iter().all(|spec| !spec.name.contains("compact")));
    let labels: Vec<&str> = catalog
        .get("update-archive-label")
        .context("element command")?
        .labels()
        .collect();
    assert_eq!(labels, ["search_label", "update_label"]);
    assert!(
        catalog
            .get("count-archive")
            .is_some_and(|spec| spec.params.iter().all(|param| param.role == ParamRole::Argument))
    );
    Ok(())
}

#[test]
fn state_round_trips_through_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("state.json");
    let (mut library, dispatcher) = session();
    run(&dispatcher, &mut library, "add-contact Jane Doe birthday=1990-05-17")?;
    run(&dispatcher, &mut library, "add-contact-phone-number jane.doe 555-1234")?;
    run(&dispatcher, &mut library, "add-note title=Groceries tag=home body=milk")?;
    save_state(&library, &path)?;

    let mut restored = Library::with_default_books()?;
    assert_eq!(load_state(&mut restored, &path)?, 2);
    for name in ["contact", "note"] {
        let before: Vec<_> = library.find(name).context("book")?.store().iter().cloned().collect();
        let after: Vec<_> = restored.find(name).context("book")?.store().iter().cloned().collect();
        assert_eq!(before, after, "{name}");
    }
    let saved: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(saved["schema_version"], "recordbook_state_v1");
    Ok(())
}

// The binary saves on exit and restores on the next start.
#[test]
fn repl_persists_between_sessions() -> Result<()> {
    let dir = TempDir::new()?;
    let state = dir.path().join("state.json");

    let first = run_repl(
        &state,
        "add-contact firstname=Jane lastname=Doe phone_number=555-1234\n\nfoo-bar\nexit\nget-contact\n",
    )?;
    assert!(first.status.success());
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert!(stdout.contains("add-contact-phone-number <contact> phone_number"));
    assert!(stdout.contains("added contact 'jane.doe'"));
    assert!(stdout.contains("Error: Unknown command: foo-bar"));
    assert!(stdout.contains("Good bye!"));
    assert!(!stdout.contains("jane.doe: "), "commands after exit must not run");
    assert!(state.is_file());

    let second = run_repl(&state, "get-contact search_lastname=doe\n")?;
    assert!(second.status.success());
    let stdout = String::from_utf8_lossy(&second.stdout);
    assert!(stdout.contains("jane.doe: "));
    assert!(stdout.contains("555-1234"));
    Ok(())
}

// A line that is not UTF-8 is reported and skipped; the session goes on and
// still saves.
#[test]
fn repl_skips_lines_that_are_not_utf8() -> Result<()> {
    let dir = TempDir::new()?;
    let state = dir.path().join("state.json");

    let output = run_repl(&state, b"add-note title=Groceries\n\xff\nget-note\nexit\n")?;
    assert!(output.status.success(), "status {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let error = stdout
        .find("Error: input is not valid UTF-8")
        .context("invalid line reported")?;
    let listed = stdout.rfind("groceries").context("note listed")?;
    assert!(listed > error, "get-note ran after the bad line:\n{stdout}");
    assert!(stdout.contains("Good bye!"));

    let saved: Value = serde_json::from_str(&fs::read_to_string(&state)?)?;
    assert_eq!(saved["books"]["note"][0]["key"], "groceries");
    Ok(())
}

#[test]
fn repl_prints_catalog_as_json() -> Result<()> {
    let output = Command::new(recordbook_binary()).arg("--catalog").output()?;
    assert!(output.status.success());
    let catalog: Value = serde_json::from_slice(&output.stdout)?;
    let names: Vec<&str> = catalog
        .as_array()
        .context("catalog array")?
        .iter()
        .filter_map(|spec| spec["name"].as_str())
        .collect();
    assert_eq!(&names[..3], ["help", "exit", "close"]);
    assert!(names.contains(&"get-coming-birthdays-from-now"));
    Ok(())
}

#[test]
fn repl_rejects_unknown_flags() -> Result<()> {
    let output = Command::new(recordbook_binary()).arg("--bogus").output()?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown flag: --bogus"));
    Ok(())
}

// Ctrl-C while waiting for input saves state and exits cleanly.
#[test]
fn repl_saves_on_interrupt() -> Result<()> {
    let dir = TempDir::new()?;
    let state = dir.path().join("state.json");
    let mut child = Command::new(recordbook_binary())
        .arg("--state")
        .arg(&state)
        .env_remove("RECORDBOOK_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let mut stdin = child.stdin.take().context("stdin")?;
    let mut stdout = child.stdout.take().context("stdout")?;

    std::io::Write::write_all(&mut stdin, b"add-note title=Groceries\n")?;
    let mut seen = Vec::new();
    let mut chunk = [0u8; 256];
    while !String::from_utf8_lossy(&seen).contains("added note 'groceries'\n> ") {
        let read = stdout.read(&mut chunk)?;
        if read == 0 {
            bail!("recordbook exited early: {}", String::from_utf8_lossy(&seen));
        }
        seen.extend_from_slice(&chunk[..read]);
    }

    let pid = libc::pid_t::try_from(child.id())?;
    // SAFETY: signalling our own child process.
    assert_eq!(unsafe { libc::kill(pid, libc::SIGINT) }, 0);
    let status = child.wait()?;
    drop(stdin);
    assert!(status.success(), "status {status:?}");

    let saved: Value = serde_json::from_str(&fs::read_to_string(&state)?)?;
    assert_eq!(saved["books"]["note"][0]["key"], "groceries");
    Ok(())
}
