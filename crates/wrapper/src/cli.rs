//! Command-line interface for the wrapper.
//!
//! Every option overrides the matching setting from the configuration file.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the extension module directory
    pub module_dir: Option<PathBuf>,
    /// Optional override for the command module
    pub commands: Option<String>,
    /// Optional override for the handler module
    pub handlers: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

fn command() -> Command {
    Command::new("wrapper")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Packet-intercepting game proxy with hot-reloadable commands and handlers")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("wrapper.toml"),
        )
        .arg(
            Arg::new("modules")
                .short('m')
                .long("modules")
                .value_name("DIR")
                .help("Directory containing extension modules"),
        )
        .arg(
            Arg::new("commands")
                .long("commands")
                .value_name("MODULE")
                .help("Module to load chat commands from"),
        )
        .arg(
            Arg::new("handlers")
                .long("handlers")
                .value_name("MODULE")
                .help("Module to load packet handlers from"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_default(),
            module_dir: matches.get_one::<String>("modules").map(PathBuf::from),
            commands: matches.get_one::<String>("commands").cloned(),
            handlers: matches.get_one::<String>("handlers").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}
