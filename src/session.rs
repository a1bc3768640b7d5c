// Session resolution and record storage paths

use std::path::PathBuf;

use crate::backend::Backend;
use crate::config::{Config, EnvConfig, SessionConfig};
use crate::error::Error;
use crate::record::Record;

const RECORD_EXT: &str = "json";

/// A resolved session, valid for one invocation. Borrows its configuration;
/// resolving has no side effects and opens nothing on the backend.
pub struct Session<'a> {
    pub label: String,
    pub config: &'a SessionConfig,
    pub path: PathBuf,
}

/// Where a session's records live on the encrypted filesystem:
/// `<root>/team/<team>/<dir>` for team sessions,
/// `<root>/private/<user,...>/<dir>` otherwise.
pub fn storage_path(env: &EnvConfig, config: &SessionConfig) -> PathBuf {
    match &config.team {
        Some(team) => env.keybase_root.join("team").join(team).join(&config.root),
        None => env
            .keybase_root
            .join("private")
            .join(config.users.join(","))
            .join(&config.root),
    }
}

impl<'a> Session<'a> {
    pub fn resolve(config: &'a Config, env: &EnvConfig, label: &str) -> Result<Self, Error> {
        let session_config = config.session(label)?;
        Ok(Session {
            label: label.to_string(),
            config: session_config,
            path: storage_path(env, session_config),
        })
    }

    pub fn record_path(&self, label: &str) -> PathBuf {
        self.path.join(format!("{}.{}", label, RECORD_EXT))
    }

    pub fn has_record(&self, backend: &dyn Backend, label: &str) -> bool {
        backend.exists(&self.record_path(label))
    }

    pub fn load_record(&self, backend: &dyn Backend, label: &str) -> Result<Record, Error> {
        let path = self.record_path(label);
        if !backend.exists(&path) {
            return Err(Error::RecordNotFound(label.to_string()));
        }
        Record::from_json(label, &backend.read(&path)?)
    }

    pub fn save_record(
        &self,
        backend: &dyn Backend,
        record: &Record,
        force: bool,
    ) -> Result<(), Error> {
        let path = self.record_path(&record.label);
        if backend.exists(&path) && !force {
            return Err(Error::RecordExists(record.label.clone()));
        }
        backend.mkdir(&self.path)?;
        backend.write(&path, &record.to_json()?)
    }

    pub fn remove_record(&self, backend: &dyn Backend, label: &str) -> Result<(), Error> {
        let path = self.record_path(label);
        if !backend.exists(&path) {
            return Err(Error::RecordNotFound(label.to_string()));
        }
        backend.remove_file(&path)
    }

    /// Labels of every record in this session, sorted. An absent storage
    /// directory is an empty session, not an error.
    pub fn record_labels(&self, backend: &dyn Backend) -> Result<Vec<String>, Error> {
        if !backend.exists(&self.path) {
            return Ok(vec![]);
        }
        let suffix = format!(".{}", RECORD_EXT);
        Ok(backend
            .list(&self.path)?
            .into_iter()
            .filter_map(|name| name.strip_suffix(&suffix).map(str::to_string))
            .collect())
    }
}
