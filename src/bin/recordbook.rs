//! Interactive record book.
//!
//! Registers the built-in books, restores their state, prints the generated
//! command catalog, and then reads one command per line until `exit`/`close`,
//! end of input, or Ctrl-C. State is saved on every one of those paths.

use anyhow::{Context, Result, bail};
use recordbook::runtime::{self, InterruptibleStdin, ReadOutcome};
use recordbook::{CommandCatalog, Library, Outcome, open_library, resolve_state_path, save_state};
use std::env;
use std::ffi::OsString;
use std::io::{self, BufReader, ErrorKind, Write};
use std::path::PathBuf;
use tracing::{info, warn};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse()?;
    runtime::init_logging();

    if cli.catalog_only {
        let library = Library::with_default_books()?;
        let catalog = CommandCatalog::build(&library).context("building command catalog")?;
        let specs: Vec<_> = catalog.iter().collect();
        println!("{}", serde_json::to_string_pretty(&specs)?);
        return Ok(());
    }

    let state = resolve_state_path(cli.state.as_deref());
    let (mut library, dispatcher) = open_library(&state)?;
    runtime::install_interrupt_handler()?;
    info!(state = %state.display(), "session started");

    println!("{}", dispatcher.catalog().render());
    let mut input = BufReader::new(InterruptibleStdin);
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush().context("flushing prompt")?;
        let line = match runtime::read_line(&mut input) {
            Ok(ReadOutcome::Line(line)) => line,
            Ok(ReadOutcome::Eof) => {
                println!();
                println!("{}", Outcome::Exit);
                break;
            }
            Ok(ReadOutcome::Interrupted) => {
                info!("interrupted");
                println!();
                println!("{}", Outcome::Exit);
                break;
            }
            // The offending line has been consumed; carry on with the next.
            Err(err) if err.kind() == ErrorKind::InvalidData => {
                println!("Error: input is not valid UTF-8");
                continue;
            }
            Err(err) => {
                warn!(error = %err, "stdin failed; saving before exit");
                if !cli.no_save {
                    save_state(&library, &state)?;
                }
                return Err(err).context("reading command");
            }
        };
        match dispatcher.dispatch(&mut library, &line) {
            Ok(outcome) if outcome.is_silent() => {}
            Ok(outcome) => {
                println!("{outcome}");
                if outcome.ends_session() {
                    break;
                }
            }
            Err(err) => println!("Error: {err}"),
        }
    }

    if cli.no_save {
        info!("--no-save given; state not written");
    } else {
        save_state(&library, &state)?;
    }
    Ok(())
}

struct Cli {
    state: Option<PathBuf>,
    no_save: bool,
    catalog_only: bool,
}

impl Cli {
    fn parse() -> Result<Self> {
        let mut args = env::args_os().skip(1);
        let mut cli = Cli {
            state: None,
            no_save: false,
            catalog_only: false,
        };
        while let Some(arg) = args.next() {
            match arg.to_str() {
                Some("--state") => {
                    let value = next_value(&mut args, "--state")?;
                    cli.state = Some(PathBuf::from(value));
                }
                Some("--no-save") => cli.no_save = true,
                Some("--catalog") => cli.catalog_only = true,
                Some("--help" | "-h") => usage(0),
                Some(other) => bail!("unknown flag: {other}"),
                None => bail!("argument is not valid UTF-8"),
            }
        }
        Ok(cli)
    }
}

fn next_value(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<OsString> {
    match args.next() {
        Some(value) if !value.is_empty() => Ok(value),
        _ => bail!("missing value for {flag}"),
    }
}

fn usage(code: i32) -> ! {
    eprintln!(
        "Usage: recordbook [--state PATH] [--no-save] [--catalog]\n\
\n\
Options:\n\
  --state PATH   State file (default: $RECORDBOOK_STATE, then ~/.recordbook/state.json)\n\
  --no-save      Do not write state on exit\n\
  --catalog      Print the command catalog as JSON and exit\n\
\n\
Logging goes to stderr; set RECORDBOOK_LOG (e.g. debug) to change the filter."
    );
    std::process::exit(code);
}
