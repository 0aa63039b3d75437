use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;

use crate::cli::{actions::Action, commands, globals::GlobalArgs};
use crate::credits::Feature;

fn required(matches: &clap::ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .ok_or_else(|| anyhow!("missing required argument: --{id}"))
}

/// Build the global arguments shared by every action.
///
/// # Errors
///
/// Returns an error if a required argument is missing
pub fn globals(matches: &clap::ArgMatches) -> Result<GlobalArgs> {
    let mut globals = GlobalArgs::new(required(matches, commands::ARG_FIREBASE_PROJECT_ID)?);
    globals.set_api_key(SecretString::from(required(
        matches,
        commands::ARG_FIREBASE_API_KEY,
    )?));

    if let Some(dir) = matches.get_one::<String>(commands::ARG_DATA_DIR) {
        globals.data_dir = PathBuf::from(dir);
    }
    if let Some(seconds) = matches.get_one::<u64>(commands::ARG_REMOTE_TIMEOUT) {
        globals.remote_timeout = Duration::from_secs(*seconds);
    }
    globals.admin_secret = matches
        .get_one::<String>(commands::ARG_ADMIN_SECRET)
        .filter(|secret| !secret.is_empty())
        .map(|secret| SecretString::from(secret.clone()));

    Ok(globals)
}

/// Map the parsed subcommand to an [`Action`].
///
/// # Errors
///
/// Returns an error if the subcommand or one of its arguments is missing
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let (name, sub_m) = matches.subcommand().context("missing subcommand")?;

    let email = required(sub_m, commands::ARG_EMAIL)?;
    let password = SecretString::from(required(sub_m, commands::ARG_PASSWORD)?);

    match name {
        commands::CMD_CREDITS => Ok(Action::Credits { email, password }),
        commands::CMD_CONSUME => {
            let feature: Feature = required(sub_m, commands::ARG_FEATURE)?
                .parse()
                .map_err(|err| anyhow!("{err}"))?;
            Ok(Action::Consume {
                email,
                password,
                feature,
            })
        }
        commands::CMD_REGISTER => Ok(Action::Register {
            email,
            password,
            name: required(sub_m, commands::ARG_NAME)?,
        }),
        other => Err(anyhow!("unknown subcommand: {other}")),
    }
}
