pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_FIREBASE_API_KEY: &str = "firebase-api-key";
pub const ARG_FIREBASE_PROJECT_ID: &str = "firebase-project-id";
pub const ARG_DATA_DIR: &str = "data-dir";
pub const ARG_REMOTE_TIMEOUT: &str = "remote-timeout";
pub const ARG_ADMIN_SECRET: &str = "admin-secret";
pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_FEATURE: &str = "feature";
pub const ARG_NAME: &str = "name";

pub const CMD_CREDITS: &str = "credits";
pub const CMD_CONSUME: &str = "consume";
pub const CMD_REGISTER: &str = "register";

fn credential_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_EMAIL)
                .short('e')
                .long("email")
                .help("Account email")
                .env("LIMVA_EMAIL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .short('p')
                .long("password")
                .help("Account password")
                .env("LIMVA_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("limva")
        .about("Limva session and daily credits")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_FIREBASE_API_KEY)
                .long("firebase-api-key")
                .help("Firebase Web API key")
                .env("LIMVA_FIREBASE_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_FIREBASE_PROJECT_ID)
                .long("firebase-project-id")
                .help("Firebase project id")
                .env("LIMVA_FIREBASE_PROJECT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_DATA_DIR)
                .long("data-dir")
                .help("Directory for the local credit fallback store")
                .default_value(".limva")
                .env("LIMVA_DATA_DIR"),
        )
        .arg(
            Arg::new(ARG_REMOTE_TIMEOUT)
                .long("remote-timeout")
                .help("Seconds to wait for the remote store before falling back")
                .default_value("5")
                .env("LIMVA_REMOTE_TIMEOUT")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_ADMIN_SECRET)
                .long("admin-secret")
                .help("Administrator secret, enables administrator self-restore")
                .env("LIMVA_ADMIN_SECRET")
                .hide_env_values(true),
        )
        .subcommand(credential_args(
            Command::new(CMD_CREDITS).about("Sign in and show today's credits"),
        ))
        .subcommand(
            credential_args(Command::new(CMD_CONSUME).about("Sign in and spend one credit"))
                .arg(
                    Arg::new(ARG_FEATURE)
                        .short('f')
                        .long("feature")
                        .help("Metered feature")
                        .value_parser(["grader", "generator"])
                        .required(true),
                ),
        )
        .subcommand(
            credential_args(Command::new(CMD_REGISTER).about("Create an account"))
                .arg(
                    Arg::new(ARG_NAME)
                        .short('n')
                        .long("name")
                        .help("Full name")
                        .required(true),
                ),
        );

    logging::with_args(command)
}
