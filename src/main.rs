// Entry point - dispatch and the single fatal-report path

use std::process::exit;

use clap::Parser;

mod app;
mod backend;
mod cli;
mod config;
mod error;
mod generator;
mod record;
mod registry;
mod session;

use crate::app::App;
use crate::config::{Config, EnvConfig};
use crate::error::Error;

fn main() {
    dotenvy::dotenv().ok();

    let env = EnvConfig::capture();
    if env.no_color {
        colored::control::set_override(false);
    }

    // Pre-scanned so the guard can honor --debug even when the failure
    // happens before option parsing.
    let debug = std::env::args().any(|arg| arg == "--debug");

    if let Err(err) = run(&env) {
        error::report_fatal(&err, debug);
        exit(1);
    }
}

fn run(env: &EnvConfig) -> Result<(), Error> {
    config::migrate_legacy(env)?;
    let config = Config::load(env)?;

    let mut args = std::env::args().skip(1);
    let requested = args.next().unwrap_or_else(|| "help".to_string());

    let command = registry::normalize(&requested, &config.aliases);
    let mut combined = config.default_args(&command).to_vec();
    combined.extend(args);

    match registry::classify(&command, &env.search_dirs) {
        registry::Classification::Internal => {
            // Handled before parsing so introspection works even when the
            // subcommand's required arguments are absent.
            if combined.iter().any(|arg| arg == "--introspect-flags") {
                for line in cli::introspect_flags(&command) {
                    println!("{}", line);
                }
                return Ok(());
            }

            let mut argv = vec!["kbsecret".to_string(), command.clone()];
            argv.extend(combined);
            App::new(config, env).run(cli::Cli::parse_from(argv))
        }
        registry::Classification::External(path) => Err(registry::exec_external(&path, &combined)),
        registry::Classification::Unknown => Err(Error::UnknownCommand(command)),
    }
}
