//! ArgMatches → CliAction conversion.
//!
//! Global flags fold into a [`PropertiesConfig`]; the subcommand picks the
//! action to run against it.

use std::path::PathBuf;
use std::time::Duration;

use clap::ArgMatches;
use sysprops_contexts::ContextsCandidate;
use sysprops_engine::PropertiesConfig;

/// The result of parsing the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Create the store as its writer, seeding it from a file.
    Create { load: Option<PathBuf> },
    /// Print one value.
    Get {
        name: String,
        default: Option<String>,
    },
    /// Print every readable property.
    List,
    /// Block until something changes.
    Wait {
        name: Option<String>,
        value: Option<String>,
        timeout: Option<Duration>,
    },
    /// Print or write the default configuration file.
    ShowConfig { write: Option<PathBuf> },
}

/// Convert the matched subcommand into an action.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    match matches.subcommand() {
        Some(("create", sub)) => Ok(CliAction::Create {
            load: sub.get_one::<String>("load").map(PathBuf::from),
        }),
        Some(("get", sub)) => {
            let name = sub
                .get_one::<String>("name")
                .cloned()
                .ok_or("get: missing property name")?;
            Ok(CliAction::Get {
                name,
                default: sub.get_one::<String>("default").cloned(),
            })
        }
        Some(("list", _)) => Ok(CliAction::List),
        Some(("wait", sub)) => Ok(CliAction::Wait {
            name: sub.get_one::<String>("name").cloned(),
            value: sub.get_one::<String>("value").cloned(),
            timeout: sub
                .get_one::<u64>("timeout-ms")
                .map(|ms| Duration::from_millis(*ms)),
        }),
        Some(("config", sub)) => Ok(CliAction::ShowConfig {
            write: sub.get_one::<String>("write").map(PathBuf::from),
        }),
        Some((other, _)) => Err(format!("unknown command: {}", other)),
        None => Err("no command given".to_string()),
    }
}

/// Build the store configuration from `--config` and the override flags.
pub fn config_from_matches(matches: &ArgMatches) -> Result<PropertiesConfig, String> {
    let sub = matches.subcommand().map(|(_, sub)| sub).unwrap_or(matches);

    let mut config = match sub.get_one::<String>("config") {
        Some(path) => PropertiesConfig::from_file(path.as_ref()).map_err(|e| e.to_string())?,
        None => PropertiesConfig::default(),
    };
    if let Some(dir) = sub.get_one::<String>("dir") {
        config.property_dir = PathBuf::from(dir);
    }
    if let Some(contexts) = sub.get_one::<String>("contexts") {
        config.contexts = vec![ContextsCandidate::single(contexts)];
    }
    if sub.get_flag("trust-any-owner") {
        config.trust_any_owner = true;
    }
    if let Ok(Some(size)) = sub.try_get_one::<usize>("area-size") {
        config.area_size = *size;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}
