//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("sysprop")
        .about("Inspect and seed the shared-memory system property store")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .help("Configuration file (default: built-in system paths)")
                .global(true),
        )
        .arg(
            Arg::new("dir")
                .long("dir")
                .help("Property directory holding the area files")
                .global(true),
        )
        .arg(
            Arg::new("contexts")
                .long("contexts")
                .help("Property contexts file, overriding the search path")
                .global(true),
        )
        .arg(
            Arg::new("trust-any-owner")
                .long("trust-any-owner")
                .help("Map area files regardless of their owner")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .help("Print bare values")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log at debug level")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("create")
                .about("Create the store and seed it from a properties file")
                .arg(
                    Arg::new("load")
                        .long("load")
                        .help("File of name=value lines to add"),
                )
                .arg(
                    Arg::new("area-size")
                        .long("area-size")
                        .help("Size in bytes of each area file")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("get")
                .about("Print the value of a property")
                .arg(Arg::new("name").required(true).help("Property name"))
                .arg(
                    Arg::new("default")
                        .help("Printed when the property is absent or empty"),
                ),
        )
        .subcommand(Command::new("list").about("Print every readable property"))
        .subcommand(
            Command::new("wait")
                .about("Block until a property, or the whole store, changes")
                .arg(Arg::new("name").help("Property to watch"))
                .arg(
                    Arg::new("value")
                        .long("value")
                        .help("Keep waiting until the property holds this value")
                        .requires("name"),
                )
                .arg(
                    Arg::new("timeout-ms")
                        .long("timeout-ms")
                        .help("Give up after this many milliseconds")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Print the default configuration file")
                .arg(
                    Arg::new("write")
                        .long("write")
                        .help("Write it to this path instead, unless the file exists"),
                ),
        )
}
