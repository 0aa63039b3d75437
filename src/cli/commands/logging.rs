//! Log verbosity: repeated `-v`, or a named level from `--log-level` /
//! `LIMVA_LOG_LEVEL`. The louder of the two wins.

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

pub const ARG_VERBOSE: &str = "verbose";
pub const ARG_LOG_LEVEL: &str = "log-level";

// Index equals the `-v` count that selects the same level.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSE)
                .short('v')
                .long("verbose")
                .help("More log output, repeat for more (-v warn ... -vvvv trace)")
                .global(true)
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new(ARG_LOG_LEVEL)
                .long("log-level")
                .help("Log level (default: error)")
                .env("LIMVA_LOG_LEVEL")
                .global(true)
                .ignore_case(true)
                .value_parser(LEVEL_NAMES),
        )
}

const fn level_for(count: u8) -> Option<Level> {
    match count {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

fn named_count(name: &str) -> u8 {
    LEVEL_NAMES
        .iter()
        .position(|level| level.eq_ignore_ascii_case(name))
        .and_then(|index| u8::try_from(index).ok())
        .unwrap_or(0)
}

/// Level requested on the command line. `None` keeps the telemetry default
/// (errors only).
#[must_use]
pub fn level(matches: &ArgMatches) -> Option<Level> {
    let count = matches.get_one::<u8>(ARG_VERBOSE).copied().unwrap_or(0);
    let named = matches
        .get_one::<String>(ARG_LOG_LEVEL)
        .map_or(0, |name| named_count(name));

    level_for(count.max(named))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(argv: &[&str]) -> ArgMatches {
        with_args(Command::new("limva")).get_matches_from(argv)
    }

    #[test]
    fn test_counts_map_to_levels() {
        assert_eq!(level_for(0), None);
        assert_eq!(level_for(1), Some(Level::WARN));
        assert_eq!(level_for(3), Some(Level::DEBUG));
        assert_eq!(level_for(9), Some(Level::TRACE));
    }

    #[test]
    fn test_default_is_errors_only() {
        temp_env::with_var("LIMVA_LOG_LEVEL", None::<&str>, || {
            assert_eq!(level(&matches(&["limva"])), None);
            assert_eq!(level(&matches(&["limva", "--log-level", "error"])), None);
        });
    }

    #[test]
    fn test_louder_setting_wins() {
        temp_env::with_var("LIMVA_LOG_LEVEL", Some("debug"), || {
            assert_eq!(level(&matches(&["limva", "-v"])), Some(Level::DEBUG));
            assert_eq!(level(&matches(&["limva", "-vvvv"])), Some(Level::TRACE));
        });
        temp_env::with_var("LIMVA_LOG_LEVEL", None::<&str>, || {
            assert_eq!(
                level(&matches(&["limva", "-vv", "--log-level", "WARN"])),
                Some(Level::INFO)
            );
        });
    }

    #[test]
    fn test_unknown_level_rejected() {
        temp_env::with_var("LIMVA_LOG_LEVEL", None::<&str>, || {
            let result = with_args(Command::new("limva"))
                .try_get_matches_from(["limva", "--log-level", "loud"]);
            assert!(result.is_err());
        });
    }
}
