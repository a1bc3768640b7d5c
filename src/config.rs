// Environment snapshot and configuration store

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::generator::GeneratorConfig;

pub const CONFIG_FILE: &str = "config.toml";

/// Everything this tool reads from the process environment, captured once at
/// startup and passed by reference. Components never consult `std::env`
/// themselves.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Default field separator for terse output (`KBSECRET_IFS`).
    pub ifs: String,
    /// `NO_COLOR` was set.
    pub no_color: bool,
    /// `PATH` entries searched for external `kbsecret-*` commands.
    pub search_dirs: Vec<PathBuf>,
    /// Active configuration directory.
    pub config_dir: PathBuf,
    /// Pre-XDG configuration directory, migrated on sight.
    pub legacy_dir: Option<PathBuf>,
    /// Root of the mounted encrypted filesystem.
    pub keybase_root: PathBuf,
    /// Invoking user, the default member of teamless sessions.
    pub user: String,
}

impl EnvConfig {
    pub fn capture() -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from);

        let config_dir = std::env::var_os("KBSECRET_CONFIG_DIR")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("XDG_CONFIG_HOME").map(|d| PathBuf::from(d).join("kbsecret"))
            })
            .or_else(|| home.as_ref().map(|h| h.join(".config").join("kbsecret")))
            .unwrap_or_else(|| PathBuf::from(".kbsecret"));

        let search_dirs = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();

        Self {
            ifs: std::env::var("KBSECRET_IFS").unwrap_or_else(|_| ":".to_string()),
            no_color: std::env::var_os("NO_COLOR").is_some(),
            search_dirs,
            config_dir,
            legacy_dir: home.as_ref().map(|h| h.join(".kbsecret")),
            keybase_root: std::env::var_os("KBSECRET_KEYBASE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/keybase")),
            user: std::env::var("USER").unwrap_or_default(),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

/// One configured session: a subdirectory of an encrypted folder shared with
/// `users`, or belonging to `team`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub root: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sessions: BTreeMap<String, SessionConfig>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub generators: BTreeMap<String, GeneratorConfig>,
}

impl Config {
    /// Load the config file, creating a default one on first run.
    pub fn load(env: &EnvConfig) -> Result<Self, Error> {
        let path = env.config_file();
        if !path.exists() {
            let config = Config::initial(env);
            config.save(env)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&path)?;
        toml::from_str(&contents).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    fn initial(env: &EnvConfig) -> Self {
        let mut config = Config::default();
        config.sessions.insert(
            "default".to_string(),
            SessionConfig {
                root: "default".to_string(),
                users: vec![env.user.clone()],
                team: None,
            },
        );
        config
    }

    pub fn save(&self, env: &EnvConfig) -> Result<(), Error> {
        fs::create_dir_all(&env.config_dir)?;
        let contents =
            toml::to_string_pretty(self).map_err(|e| Error::ConfigParse(e.to_string()))?;
        fs::write(env.config_file(), contents)?;
        Ok(())
    }

    pub fn session(&self, label: &str) -> Result<&SessionConfig, Error> {
        self.sessions
            .get(label)
            .ok_or_else(|| Error::SessionNotFound(label.to_string()))
    }

    /// Generator lookup by exact name. The `default` profile always resolves,
    /// whether or not the config file spells it out.
    pub fn generator(&self, label: &str) -> Result<GeneratorConfig, Error> {
        if let Some(profile) = self.generators.get(label) {
            return Ok(profile.clone());
        }
        if label == "default" {
            return Ok(GeneratorConfig::default());
        }
        Err(Error::Generator(label.to_string()))
    }

    /// Pre-configured argument list prepended to every invocation of `command`.
    pub fn default_args(&self, command: &str) -> &[String] {
        self.defaults.get(command).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Move the contents of the pre-XDG config directory into the active one.
///
/// Runs at most once per process, and only when the active directory has no
/// config yet. The whole tree is copied, every file byte-verified, before the
/// source directory is removed; a verification failure aborts with the source
/// intact.
pub fn migrate_legacy(env: &EnvConfig) -> Result<bool, Error> {
    let Some(legacy) = &env.legacy_dir else {
        return Ok(false);
    };
    if !legacy.join(CONFIG_FILE).is_file() || env.config_file().exists() {
        return Ok(false);
    }

    copy_verified(legacy, &env.config_dir)?;
    fs::remove_dir_all(legacy)?;
    Ok(true)
}

fn copy_verified(from: &Path, to: &Path) -> Result<(), Error> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_verified(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
            if fs::read(entry.path())? != fs::read(&dest)? {
                return Err(Error::Migration(format!(
                    "copy of {} did not verify",
                    entry.path().display()
                )));
            }
        }
    }
    Ok(())
}
