// CLI surface - clap derive types + flag introspection

use std::collections::BTreeSet;

use clap::{CommandFactory, Parser, Subcommand};

use crate::generator::GeneratorFormat;

#[derive(Parser)]
#[command(
    name = "kbsecret",
    about = "Manage secrets inside Keybase-encrypted sessions",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Print extra detail about what is happening
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Suppress warning messages
    #[arg(short = 'w', long = "no-warn", global = true)]
    pub no_warn: bool,

    /// Dump full diagnostic detail on fatal errors
    #[arg(long, global = true)]
    pub debug: bool,

    /// List every recognized flag and subcommand, one per line, then exit
    #[arg(long = "introspect-flags", global = true)]
    pub introspect_flags: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print usage information
    Help,

    /// Print the kbsecret version
    Version,

    /// List available commands
    Commands {
        /// Only list built-in commands
        #[arg(short = 'i', long, conflicts_with = "external_only")]
        internal_only: bool,
        /// Only list external kbsecret-* commands found on PATH
        #[arg(short = 'e', long)]
        external_only: bool,
    },

    /// List configured sessions
    Sessions {
        /// Show storage details for each session
        #[arg(short = 'a', long)]
        show_all: bool,
    },

    /// Manage sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Create a new record, prompting for its fields
    New {
        #[arg(short, long, default_value = "default")]
        session: String,
        /// Overwrite an existing record with the same label
        #[arg(short, long)]
        force: bool,
        /// Echo sensitive fields while typing
        #[arg(short, long)]
        echo: bool,
        /// Generate sensitive fields instead of prompting
        #[arg(short = 'g', long)]
        generate: bool,
        /// Generator profile used with --generate
        #[arg(short = 'G', long, default_value = "default")]
        generator: String,
        /// Record type (unique prefixes accepted)
        kind: String,
        label: String,
    },

    /// Remove a record
    Rm {
        #[arg(short, long, default_value = "default")]
        session: String,
        record: String,
    },

    /// List record labels in a session
    List {
        #[arg(short, long, default_value = "default")]
        session: String,
        /// Only list records of this type
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
    },

    /// Display login records
    Login {
        #[arg(short, long, default_value = "default")]
        session: String,
        /// Display every login record in the session
        #[arg(short, long)]
        all: bool,
        /// One record per line, fields joined by the separator
        #[arg(short = 'x', long)]
        terse: bool,
        /// Field separator for terse output
        #[arg(short = 'i', long)]
        ifs: Option<String>,
        labels: Vec<String>,
    },

    /// Print the password of a login record
    Pass {
        #[arg(short, long, default_value = "default")]
        session: String,
        record: String,
    },

    /// Print environment records as shell export lines
    Env {
        #[arg(short, long, default_value = "default")]
        session: String,
        /// Print every environment record in the session
        #[arg(short, long)]
        all: bool,
        /// Print only the values
        #[arg(short = 'v', long = "value-only")]
        value_only: bool,
        /// Omit the leading `export`
        #[arg(short = 'n', long = "no-export")]
        no_export: bool,
        labels: Vec<String>,
    },

    /// Print every field of a record in stored order
    DumpFields {
        #[arg(short, long, default_value = "default")]
        session: String,
        /// Print `key<sep>value` instead of `key: value`
        #[arg(short = 'x', long)]
        terse: bool,
        /// Field separator for terse output (default: $KBSECRET_IFS or `:`)
        #[arg(short = 'i', long)]
        ifs: Option<String>,
        record: String,
    },

    /// List generator profiles
    Generators {
        /// Show format and length for each profile
        #[arg(short = 'a', long)]
        show_all: bool,
    },

    /// Manage generator profiles
    Generator {
        #[command(subcommand)]
        action: GeneratorAction,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Configure a new session
    New {
        /// Back the session with a Keybase team folder
        #[arg(short = 't', long)]
        team: Option<String>,
        /// Users sharing the session (default: just you)
        #[arg(short = 'u', long, value_delimiter = ',')]
        users: Vec<String>,
        /// Storage directory name (default: the label)
        #[arg(short = 'r', long)]
        root: Option<String>,
        /// Create the team if it does not exist yet
        #[arg(short = 'c', long = "create-team")]
        create_team: bool,
        /// Reconfigure the session if the label is taken
        #[arg(short, long)]
        force: bool,
        /// Do not notify the other session members
        #[arg(short = 'n', long = "no-notify")]
        no_notify: bool,
        label: String,
    },

    /// Deconfigure a session
    Rm {
        /// Also delete the session's records from the backend
        #[arg(short, long)]
        delete: bool,
        session: String,
    },
}

#[derive(Subcommand)]
pub enum GeneratorAction {
    /// Configure a new generator profile
    New {
        #[arg(short = 'F', long, value_enum, default_value_t = GeneratorFormat::Hex)]
        format: GeneratorFormat,
        /// Random bytes fed into the encoder
        #[arg(short = 'l', long, default_value_t = 16)]
        length: u32,
        /// Reconfigure the profile if the label is taken
        #[arg(short, long)]
        force: bool,
        label: String,
    },

    /// Deconfigure a generator profile
    Rm { label: String },
}

/// Canonical names of every built-in command, sorted. The derived command
/// tree is the single source of truth; nothing is listed twice.
pub fn internal_commands() -> Vec<String> {
    let mut names: Vec<String> = Cli::command()
        .get_subcommands()
        .map(|c| c.get_name().to_string())
        .collect();
    names.sort();
    names
}

/// Flattened flag forms recognized by `subcommand` (globals included), plus
/// the names of its nested subcommands. Sorted, each exactly once.
pub fn introspect_flags(subcommand: &str) -> Vec<String> {
    let mut cmd = Cli::command();
    cmd.build();

    let mut out = BTreeSet::new();
    collect_flags(&cmd, &mut out);
    if let Some(sub) = cmd.find_subcommand(subcommand) {
        collect_flags(sub, &mut out);
        for nested in sub.get_subcommands() {
            out.insert(nested.get_name().to_string());
        }
    }
    out.into_iter().collect()
}

fn collect_flags(cmd: &clap::Command, out: &mut BTreeSet<String>) {
    for arg in cmd.get_arguments() {
        if let Some(long) = arg.get_long() {
            out.insert(format!("--{}", long));
        }
        if let Some(short) = arg.get_short() {
            out.insert(format!("-{}", short));
        }
    }
}
