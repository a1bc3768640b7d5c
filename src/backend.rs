// External collaborators - encrypted filesystem + team service

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::process::Command;

use crate::error::Error;

/// Primitive operations against the mounted encrypted filesystem. All
/// encryption and access control happens on the other side of the mount;
/// failures come back as opaque `Backend` errors with the message surfaced.
pub trait Backend {
    fn read(&self, path: &Path) -> Result<Vec<u8>, Error>;
    fn write(&self, path: &Path, data: &[u8]) -> Result<(), Error>;
    fn mkdir(&self, path: &Path) -> Result<(), Error>;
    fn remove_file(&self, path: &Path) -> Result<(), Error>;
    fn remove_dir(&self, path: &Path) -> Result<(), Error>;
    fn exists(&self, path: &Path) -> bool;
    /// File names (not paths) directly under `path`, sorted.
    fn list(&self, path: &Path) -> Result<Vec<String>, Error>;
}

/// The real backend: plain file operations against the KBFS mount point.
pub struct KbfsBackend;

fn backend_err(path: &Path, e: std::io::Error) -> Error {
    Error::Backend(format!("{}: {}", path.display(), e))
}

impl Backend for KbfsBackend {
    fn read(&self, path: &Path) -> Result<Vec<u8>, Error> {
        fs::read(path).map_err(|e| backend_err(path, e))
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<(), Error> {
        fs::write(path, data).map_err(|e| backend_err(path, e))
    }

    fn mkdir(&self, path: &Path) -> Result<(), Error> {
        fs::create_dir_all(path).map_err(|e| backend_err(path, e))
    }

    fn remove_file(&self, path: &Path) -> Result<(), Error> {
        fs::remove_file(path).map_err(|e| backend_err(path, e))
    }

    fn remove_dir(&self, path: &Path) -> Result<(), Error> {
        fs::remove_dir_all(path).map_err(|e| backend_err(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list(&self, path: &Path) -> Result<Vec<String>, Error> {
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(path).map_err(|e| backend_err(path, e))? {
            let entry = entry.map_err(|e| backend_err(path, e))?;
            if entry.path().is_file() {
                names.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names.into_iter().collect())
    }
}

/// Team management, delegated to the `keybase` executable.
pub trait TeamService {
    fn team_exists(&self, team: &str) -> Result<bool, Error>;
    fn create_team(&self, team: &str) -> Result<(), Error>;
    fn notify(&self, users: &[String], message: &str) -> Result<(), Error>;
}

pub struct KeybaseCli;

impl KeybaseCli {
    fn keybase(&self, args: &[&str]) -> Result<std::process::Output, Error> {
        Command::new("keybase")
            .args(args)
            .output()
            .map_err(|e| Error::Backend(format!("keybase: {}", e)))
    }
}

impl TeamService for KeybaseCli {
    fn team_exists(&self, team: &str) -> Result<bool, Error> {
        let output = self.keybase(&["team", "list-members", team])?;
        Ok(output.status.success())
    }

    fn create_team(&self, team: &str) -> Result<(), Error> {
        let output = self.keybase(&["team", "create", team])?;
        if !output.status.success() {
            return Err(Error::Backend(format!(
                "could not create team '{}': {}",
                team,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn notify(&self, users: &[String], message: &str) -> Result<(), Error> {
        for user in users {
            let output = self.keybase(&["chat", "send", user, message])?;
            if !output.status.success() {
                return Err(Error::Backend(format!(
                    "could not notify '{}': {}",
                    user,
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }
        }
        Ok(())
    }
}
