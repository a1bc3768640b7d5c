use std::io::{self, IsTerminal};

use clap::CommandFactory;
use colored::Colorize;
use inquire::{Password, Text};

use crate::backend::{Backend, KbfsBackend, KeybaseCli, TeamService};
use crate::cli::{self, Cli, Command, GeneratorAction, SessionAction};
use crate::config::{Config, EnvConfig, SessionConfig};
use crate::error::Error;
use crate::generator::{self, GeneratorConfig, GeneratorFormat};
use crate::record::{Record, RecordType};
use crate::registry;
use crate::session::{self, Session};

/// Print a success message with checkmark
fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg.green());
}

pub struct App<'a> {
    config: Config,
    env: &'a EnvConfig,
    backend: KbfsBackend,
    teams: KeybaseCli,
    verbose: bool,
    no_warn: bool,
}

impl<'a> App<'a> {
    pub fn new(config: Config, env: &'a EnvConfig) -> Self {
        Self {
            config,
            env,
            backend: KbfsBackend,
            teams: KeybaseCli,
            verbose: false,
            no_warn: false,
        }
    }

    pub fn run(mut self, cli: Cli) -> Result<(), Error> {
        self.verbose = cli.verbose;
        self.no_warn = cli.no_warn;

        match cli.command {
            Command::Help => {
                Cli::command().print_help()?;
                Ok(())
            }
            Command::Version => {
                println!("kbsecret {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            Command::Commands {
                internal_only,
                external_only,
            } => self.commands(internal_only, external_only),
            Command::Sessions { show_all } => self.sessions(show_all),
            Command::Session { action } => match action {
                SessionAction::New {
                    team,
                    users,
                    root,
                    create_team,
                    force,
                    no_notify,
                    label,
                } => self.session_new(team, users, root, create_team, force, no_notify, label),
                SessionAction::Rm { delete, session } => self.session_rm(delete, &session),
            },
            Command::New {
                session,
                force,
                echo,
                generate,
                generator,
                kind,
                label,
            } => self.new_record(&session, force, echo, generate, &generator, &kind, &label),
            Command::Rm { session, record } => self.rm_record(&session, &record),
            Command::List { session, kind } => self.list(&session, kind.as_deref()),
            Command::Login {
                session,
                all,
                terse,
                ifs,
                labels,
            } => self.login(&session, all, terse, ifs, &labels),
            Command::Pass { session, record } => self.pass(&session, &record),
            Command::Env {
                session,
                all,
                value_only,
                no_export,
                labels,
            } => self.env_records(&session, all, value_only, no_export, &labels),
            Command::DumpFields {
                session,
                terse,
                ifs,
                record,
            } => self.dump_fields(&session, terse, ifs, &record),
            Command::Generators { show_all } => self.generators(show_all),
            Command::Generator { action } => match action {
                GeneratorAction::New {
                    format,
                    length,
                    force,
                    label,
                } => self.generator_new(format, length, force, label),
                GeneratorAction::Rm { label } => self.generator_rm(&label),
            },
        }
    }

    fn warn(&self, msg: &str) {
        if !self.no_warn {
            eprintln!("{} {}", "Warning:".yellow().bold(), msg);
        }
    }

    fn trace(&self, msg: &str) {
        if self.verbose {
            eprintln!("{}", msg.dimmed());
        }
    }

    fn ifs(&self, override_: Option<String>) -> String {
        override_.unwrap_or_else(|| self.env.ifs.clone())
    }

    fn commands(&self, internal_only: bool, external_only: bool) -> Result<(), Error> {
        if !external_only {
            for name in cli::internal_commands() {
                println!("{}", name);
            }
        }
        if !internal_only {
            for name in registry::scan_external(&self.env.search_dirs) {
                println!("{}", name);
            }
        }
        Ok(())
    }

    fn sessions(&self, show_all: bool) -> Result<(), Error> {
        for label in self.config.sessions.keys() {
            if show_all {
                let session = Session::resolve(&self.config, self.env, label)?;
                let kind = match &session.config.team {
                    Some(team) => format!("team {}", team),
                    None => format!("users {}", session.config.users.join(",")),
                };
                println!("{} ({}) -> {}", label, kind, session.path.display());
            } else {
                println!("{}", label);
            }
        }
        Ok(())
    }

    fn session_new(
        &mut self,
        team: Option<String>,
        users: Vec<String>,
        root: Option<String>,
        create_team: bool,
        force: bool,
        no_notify: bool,
        label: String,
    ) -> Result<(), Error> {
        if self.config.sessions.contains_key(&label) && !force {
            return Err(Error::SessionExists(label));
        }

        if let Some(team) = &team {
            if !self.teams.team_exists(team)? {
                if !create_team {
                    return Err(Error::TeamNotFound(team.clone()));
                }
                self.teams.create_team(team)?;
                self.trace(&format!("created team {}", team));
            }
        }

        let users = if team.is_some() {
            vec![]
        } else if users.is_empty() {
            vec![self.env.user.clone()]
        } else {
            users
        };
        let session_config = SessionConfig {
            root: root.unwrap_or_else(|| label.clone()),
            users,
            team,
        };

        let path = session::storage_path(self.env, &session_config);
        if self.backend.exists(&path) {
            self.warn(&format!(
                "storage directory {} already exists; records there become part of this session",
                path.display()
            ));
        }
        self.backend.mkdir(&path)?;
        self.trace(&format!("session storage at {}", path.display()));

        if !no_notify && session_config.team.is_none() {
            let others: Vec<String> = session_config
                .users
                .iter()
                .filter(|u| **u != self.env.user)
                .cloned()
                .collect();
            if !others.is_empty() {
                let message = format!("You have been added to the kbsecret session '{}'", label);
                if let Err(e) = self.teams.notify(&others, &message) {
                    self.warn(&format!("could not notify session members: {}", e));
                }
            }
        }

        self.config.sessions.insert(label.clone(), session_config);
        self.config.save(self.env)?;
        success(&format!("Session '{}' configured", label));
        Ok(())
    }

    fn session_rm(&mut self, delete: bool, label: &str) -> Result<(), Error> {
        // resolve before touching anything
        let session_config = self.config.session(label)?.clone();

        if delete {
            let path = session::storage_path(self.env, &session_config);
            if self.backend.exists(&path) {
                self.backend.remove_dir(&path)?;
                self.trace(&format!("deleted {}", path.display()));
            }
        }

        self.config.sessions.remove(label);
        self.config.save(self.env)?;
        success(&format!("Session '{}' deconfigured", label));
        Ok(())
    }

    fn new_record(
        &self,
        session: &str,
        force: bool,
        echo: bool,
        generate: bool,
        generator: &str,
        kind: &str,
        label: &str,
    ) -> Result<(), Error> {
        let kind = RecordType::resolve(kind)?;
        let profile = if generate {
            Some(self.config.generator(generator)?)
        } else {
            None
        };
        let session = Session::resolve(&self.config, self.env, session)?;

        if session.has_record(&self.backend, label) && !force {
            return Err(Error::RecordExists(label.to_string()));
        }

        let mut fields = Vec::new();
        for spec in kind.fields() {
            let value = if spec.sensitive {
                match &profile {
                    Some(profile) => generator::generate(profile),
                    None => prompt_secret(spec.name, echo)?,
                }
            } else {
                prompt_plain(spec.name)?
            };
            fields.push((spec.name.to_string(), value));
        }

        let record = Record::new(kind, label, fields);
        session.save_record(&self.backend, &record, force)?;
        self.trace(&format!(
            "wrote {}",
            session.record_path(label).display()
        ));
        success(&format!("Record '{}' created", label));
        Ok(())
    }

    fn rm_record(&self, session: &str, label: &str) -> Result<(), Error> {
        let session = Session::resolve(&self.config, self.env, session)?;
        session.remove_record(&self.backend, label)?;
        success(&format!("Record '{}' removed", label));
        Ok(())
    }

    fn list(&self, session: &str, kind: Option<&str>) -> Result<(), Error> {
        let filter = kind.map(RecordType::resolve).transpose()?;
        let session = Session::resolve(&self.config, self.env, session)?;

        if !self.backend.exists(&session.path) {
            self.warn(&format!(
                "session '{}' has no records yet",
                session.label
            ));
        }

        for label in session.record_labels(&self.backend)? {
            if let Some(filter) = filter {
                let record = session.load_record(&self.backend, &label)?;
                if record.kind != filter {
                    continue;
                }
            }
            println!("{}", label);
        }
        Ok(())
    }

    /// Labels to operate on: the explicit ones, or every record of `kind` in
    /// the session when none were named (or --all was passed).
    fn select_labels(
        &self,
        session: &Session,
        kind: RecordType,
        all: bool,
        labels: &[String],
    ) -> Result<Vec<String>, Error> {
        if !all && !labels.is_empty() {
            return Ok(labels.to_vec());
        }
        let mut selected = Vec::new();
        for label in session.record_labels(&self.backend)? {
            if session.load_record(&self.backend, &label)?.kind == kind {
                selected.push(label);
            }
        }
        Ok(selected)
    }

    fn load_typed(
        &self,
        session: &Session,
        label: &str,
        expected: RecordType,
    ) -> Result<Record, Error> {
        let record = session.load_record(&self.backend, label)?;
        if record.kind != expected {
            return Err(Error::WrongKind {
                label: label.to_string(),
                expected: expected.name(),
                actual: record.kind.name(),
            });
        }
        Ok(record)
    }

    fn login(
        &self,
        session: &str,
        all: bool,
        terse: bool,
        ifs: Option<String>,
        labels: &[String],
    ) -> Result<(), Error> {
        let ifs = self.ifs(ifs);
        let session = Session::resolve(&self.config, self.env, session)?;

        for label in self.select_labels(&session, RecordType::Login, all, labels)? {
            let record = self.load_typed(&session, &label, RecordType::Login)?;
            let username = record.field("username").unwrap_or_default();
            let password = record.field("password").unwrap_or_default();
            if terse {
                println!("{}", [label.as_str(), username, password].join(&ifs));
            } else {
                println!("{}:", label.bold());
                println!("  username: {}", username);
                println!("  password: {}", password);
            }
        }
        Ok(())
    }

    fn pass(&self, session: &str, label: &str) -> Result<(), Error> {
        let session = Session::resolve(&self.config, self.env, session)?;
        let record = self.load_typed(&session, label, RecordType::Login)?;
        let password = record
            .field("password")
            .ok_or_else(|| Error::RecordParse(label.to_string(), "no password field".into()))?;
        println!("{}", password);
        Ok(())
    }

    fn env_records(
        &self,
        session: &str,
        all: bool,
        value_only: bool,
        no_export: bool,
        labels: &[String],
    ) -> Result<(), Error> {
        let session = Session::resolve(&self.config, self.env, session)?;

        for label in self.select_labels(&session, RecordType::Environment, all, labels)? {
            let record = self.load_typed(&session, &label, RecordType::Environment)?;
            let variable = record.field("variable").unwrap_or_default();
            let value = record.field("value").unwrap_or_default();
            if value_only {
                println!("{}", value);
            } else if no_export {
                println!("{}={}", variable, value);
            } else {
                println!("export {}={}", variable, value);
            }
        }
        Ok(())
    }

    fn dump_fields(
        &self,
        session: &str,
        terse: bool,
        ifs: Option<String>,
        label: &str,
    ) -> Result<(), Error> {
        let ifs = self.ifs(ifs);
        let session = Session::resolve(&self.config, self.env, session)?;
        let record = session.load_record(&self.backend, label)?;

        for (key, value) in &record.fields {
            if terse {
                println!("{}{}{}", key, ifs, value);
            } else {
                println!("{}: {}", key.cyan(), value);
            }
        }
        Ok(())
    }

    fn generators(&self, show_all: bool) -> Result<(), Error> {
        let mut profiles = self.config.generators.clone();
        profiles
            .entry("default".to_string())
            .or_insert_with(GeneratorConfig::default);

        for (label, profile) in profiles {
            if show_all {
                println!("{} ({}, {} bytes)", label, profile.format, profile.length);
            } else {
                println!("{}", label);
            }
        }
        Ok(())
    }

    fn generator_new(
        &mut self,
        format: GeneratorFormat,
        length: u32,
        force: bool,
        label: String,
    ) -> Result<(), Error> {
        if self.config.generators.contains_key(&label) && !force {
            return Err(Error::GeneratorExists(label));
        }
        self.config
            .generators
            .insert(label.clone(), GeneratorConfig { format, length });
        self.config.save(self.env)?;
        success(&format!("Generator '{}' configured", label));
        Ok(())
    }

    fn generator_rm(&mut self, label: &str) -> Result<(), Error> {
        if self.config.generators.remove(label).is_none() {
            return Err(Error::Generator(label.to_string()));
        }
        self.config.save(self.env)?;
        success(&format!("Generator '{}' deconfigured", label));
        Ok(())
    }
}

/// Prompt for a plain field. Falls back to a buffered line read when stdin
/// is not a terminal (piped input).
fn prompt_plain(name: &str) -> Result<String, Error> {
    if !io::stdin().is_terminal() {
        return read_line();
    }
    Text::new(&format!("{}:", name))
        .prompt()
        .map_err(|e| Error::Prompt(e.to_string()))
}

/// Prompt for a sensitive field with echo disabled, unless echo was
/// explicitly requested or stdin is not a terminal.
fn prompt_secret(name: &str, echo: bool) -> Result<String, Error> {
    if !io::stdin().is_terminal() {
        return read_line();
    }
    if echo {
        return prompt_plain(name);
    }
    Password::new(&format!("{}:", name))
        .without_confirmation()
        .prompt()
        .map_err(|e| Error::Prompt(e.to_string()))
}

fn read_line() -> Result<String, Error> {
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
