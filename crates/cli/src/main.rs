//! sysprop: command-line access to the system property store.
//!
//! - `sysprop create --dir D --contexts F [--load FILE]`: create the store and seed it
//! - `sysprop get NAME [DEFAULT]`: print one value
//! - `sysprop list`: print every readable property, sorted by name
//! - `sysprop wait [NAME] [--value V] [--timeout-ms N]`: block until a change
//!
//! Exit codes: 0 on success, 1 on error, 2 when a wait times out.

mod commands;
mod format;
mod parse;
mod value;

use std::process;
use std::time::{Duration, Instant};

use clap::ArgMatches;
use sysprops_engine::{PropertiesConfig, SystemProperties};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_error, format_property, OutputMode};
use parse::{config_from_matches, matches_to_action, CliAction};
use value::parse_property_file;

const EXIT_TIMEOUT: i32 = 2;

fn main() {
    let matches = build_cli().get_matches();
    init_tracing(&matches);

    let mode = if flag(&matches, "raw") {
        OutputMode::Raw
    } else {
        OutputMode::Human
    };

    let action = match matches_to_action(&matches) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    // Printing the default file needs no store, and no valid config either.
    if let CliAction::ShowConfig { write } = &action {
        process::exit(run_show_config(write.as_deref()));
    }

    let config = match config_from_matches(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let exit_code = match action {
        CliAction::Create { load } => run_create(config, load.as_deref()),
        other => match SystemProperties::open(config) {
            Ok(store) => run_reader(&store, other, mode),
            Err(e) => {
                eprintln!("{}", format_error(&e));
                1
            }
        },
    };
    process::exit(exit_code);
}

/// Global flags are readable from the subcommand's matches.
fn flag(matches: &ArgMatches, id: &str) -> bool {
    let sub = matches.subcommand().map(|(_, sub)| sub).unwrap_or(matches);
    sub.get_flag(id)
}

fn init_tracing(matches: &ArgMatches) {
    let fallback = if flag(matches, "verbose") { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_show_config(write: Option<&std::path::Path>) -> i32 {
    match write {
        None => {
            print!("{}", PropertiesConfig::default_toml());
            0
        }
        Some(path) => match PropertiesConfig::write_default_if_missing(path) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{}", format_error(&e));
                1
            }
        },
    }
}

fn run_create(config: PropertiesConfig, load: Option<&std::path::Path>) -> i32 {
    let pairs = match load {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(contents) => match parse_property_file(&contents) {
                Ok(pairs) => pairs,
                Err(e) => {
                    eprintln!("error: {}: {}", path.display(), e);
                    return 1;
                }
            },
            Err(e) => {
                eprintln!("error: {}: {}", path.display(), e);
                return 1;
            }
        },
        None => Vec::new(),
    };

    let store = match SystemProperties::open_writer(config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{}", format_error(&e));
            return 1;
        }
    };

    for (name, value) in &pairs {
        if let Err(e) = store.set(name, value) {
            eprintln!("{}: {}", name, format_error(&e));
            return 1;
        }
    }
    info!(
        target: "sysprops::cli",
        dir = %store.config().property_dir.display(),
        loaded = pairs.len(),
        "Property store created"
    );
    0
}

fn run_reader(store: &SystemProperties, action: CliAction, mode: OutputMode) -> i32 {
    match action {
        CliAction::Get { name, default } => {
            let value = match default {
                Some(default) => store.get_or(&name, &default),
                None => store.get(&name).unwrap_or_default(),
            };
            println!("{}", value);
            0
        }
        CliAction::List => {
            let mut props = Vec::new();
            store.foreach(|info| {
                if let Some(pair) = store.read(&info) {
                    props.push(pair);
                }
            });
            props.sort();
            for (name, value) in props {
                println!("{}", format_property(&name, &value, mode));
            }
            0
        }
        CliAction::Wait {
            name,
            value,
            timeout,
        } => {
            let deadline = timeout.map(|t| Instant::now() + t);
            let outcome = match name {
                Some(name) => wait_for_property(store, &name, value.as_deref(), deadline)
                    .map(|value| format_property(&name, &value, mode)),
                None => {
                    let old = store.area_serial();
                    store.wait(None, old, remaining(deadline)).map(|serial| serial.to_string())
                }
            };
            match outcome {
                Some(line) => {
                    println!("{}", line);
                    0
                }
                None => {
                    eprintln!("error: timed out");
                    EXIT_TIMEOUT
                }
            }
        }
        CliAction::Create { .. } | CliAction::ShowConfig { .. } => 1,
    }
}

/// Time left before `deadline`; `None` means wait forever.
fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}

fn expired(deadline: Option<Instant>) -> bool {
    matches!(deadline, Some(d) if Instant::now() >= d)
}

/// Wait for `name` to change, or to hold `expected` when given.
///
/// A property that does not exist yet is waited for on the store-wide serial
/// until it appears. Returns the value that ended the wait.
fn wait_for_property(
    store: &SystemProperties,
    name: &str,
    expected: Option<&str>,
    deadline: Option<Instant>,
) -> Option<String> {
    let mut first = true;
    loop {
        // Sample the store-wide serial before the lookup so an add racing
        // with it still wakes us.
        let area_serial = store.area_serial();
        match store.find(name) {
            Some(info) => {
                let serial = store.serial(&info);
                let (_, current) = store.read(&info)?;
                match expected {
                    Some(want) if current == want => return Some(current),
                    None if !first => return Some(current),
                    _ => {}
                }
                if expired(deadline) {
                    return None;
                }
                debug!(target: "sysprops::cli", name, serial, "Waiting for property change");
                store.wait(Some(&info), serial, remaining(deadline))?;
                first = false;
            }
            None => {
                if expired(deadline) {
                    return None;
                }
                debug!(target: "sysprops::cli", name, "Waiting for property to appear");
                store.wait(None, area_serial, remaining(deadline))?;
                // Appearing counts as a change.
                first = false;
            }
        }
    }
}
