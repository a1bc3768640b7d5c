// Command classification, alias normalization, external dispatch

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::cli;
use crate::error::Error;

/// Prefix an external subcommand executable must carry: `kbsecret-<name>`.
const EXTERNAL_PREFIX: &str = "kbsecret-";

/// Well-known flag spellings that normalize to command names.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("-h", "help"),
    ("--help", "help"),
    ("-v", "version"),
    ("--version", "version"),
];

#[derive(Debug, PartialEq, Eq)]
pub enum Classification {
    Internal,
    External(PathBuf),
    Unknown,
}

/// Expand a requested command through the fixed flag table, then the user's
/// alias table. Applied exactly once, before classification; anything not in
/// either table passes through unchanged.
pub fn normalize(name: &str, aliases: &BTreeMap<String, String>) -> String {
    if let Some((_, canonical)) = BUILTIN_ALIASES.iter().find(|(alias, _)| *alias == name) {
        return canonical.to_string();
    }
    if let Some(target) = aliases.get(name) {
        return target.clone();
    }
    name.to_string()
}

/// Classify a normalized command name. An internal match always wins, even
/// when a like-named external executable exists on the search path.
pub fn classify(name: &str, search_dirs: &[PathBuf]) -> Classification {
    if cli::internal_commands().iter().any(|c| c == name) {
        return Classification::Internal;
    }
    match find_external(name, search_dirs) {
        Some(path) => Classification::External(path),
        None => Classification::Unknown,
    }
}

/// First executable `kbsecret-<name>` on the search path, if any.
pub fn find_external(name: &str, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    let file_name = format!("{}{}", EXTERNAL_PREFIX, name);
    search_dirs.iter().find_map(|dir| {
        let candidate = dir.join(&file_name);
        is_executable(&candidate).then_some(candidate)
    })
}

/// All external command names discoverable on the search path, sorted and
/// deduplicated.
pub fn scan_external(search_dirs: &[PathBuf]) -> Vec<String> {
    let mut found = BTreeSet::new();
    for dir in search_dirs {
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(stripped) = name.strip_prefix(EXTERNAL_PREFIX) {
                if !stripped.is_empty() && is_executable(&entry.path()) {
                    found.insert(stripped.to_string());
                }
            }
        }
    }
    found.into_iter().collect()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && path
            .metadata()
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Hand the invocation over to an external command. On unix the process
/// image is replaced, so this only returns when the launch itself failed.
#[cfg(unix)]
pub fn exec_external(path: &Path, args: &[String]) -> Error {
    use std::os::unix::process::CommandExt;
    let err = Command::new(path).args(args).exec();
    Error::Launch(path.display().to_string(), err)
}

/// Without in-place replacement: spawn, wait, and exit with the child's
/// code, which is indistinguishable from a replace to the caller.
#[cfg(not(unix))]
pub fn exec_external(path: &Path, args: &[String]) -> Error {
    match Command::new(path).args(args).status() {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(err) => Error::Launch(path.display().to_string(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn place_executable(dir: &Path, name: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
    }

    #[test]
    fn builtin_alias_normalization_is_idempotent() {
        let aliases = BTreeMap::new();
        for (alias, canonical) in BUILTIN_ALIASES {
            let once = normalize(alias, &aliases);
            assert_eq!(once, *canonical);
            assert_eq!(normalize(&once, &aliases), once);
        }
    }

    #[test]
    fn user_aliases_expand_and_unknown_names_pass_through() {
        let mut aliases = BTreeMap::new();
        aliases.insert("ls".to_string(), "list".to_string());

        assert_eq!(normalize("ls", &aliases), "list");
        assert_eq!(normalize("list", &aliases), "list");
        assert_eq!(normalize("frobnicate", &aliases), "frobnicate");
    }

    #[test]
    fn classification_is_exclusive_and_total() {
        let dirs: Vec<PathBuf> = vec![];
        assert_eq!(classify("list", &dirs), Classification::Internal);
        assert_eq!(classify("frobnicate", &dirs), Classification::Unknown);
    }

    #[cfg(unix)]
    #[test]
    fn internal_wins_over_a_like_named_external() {
        let dir = TempDir::new().unwrap();
        place_executable(dir.path(), "kbsecret-list");

        let dirs = vec![dir.path().to_path_buf()];
        assert_eq!(classify("list", &dirs), Classification::Internal);
    }

    #[cfg(unix)]
    #[test]
    fn external_requires_the_executable_bit() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("kbsecret-plain"), "not runnable").unwrap();
        place_executable(dir.path(), "kbsecret-runnable");

        let dirs = vec![dir.path().to_path_buf()];
        assert_eq!(find_external("plain", &dirs), None);
        assert!(find_external("runnable", &dirs).is_some());
        assert_eq!(classify("runnable", &dirs), Classification::External(
            dir.path().join("kbsecret-runnable")
        ));
        assert_eq!(scan_external(&dirs), ["runnable"]);
    }

    #[cfg(unix)]
    #[test]
    fn first_search_dir_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        place_executable(first.path(), "kbsecret-dup");
        place_executable(second.path(), "kbsecret-dup");

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(
            find_external("dup", &dirs),
            Some(first.path().join("kbsecret-dup"))
        );
        // duplicates collapse in the listing
        assert_eq!(scan_external(&dirs), ["dup"]);
    }

    #[test]
    fn scan_of_missing_dirs_is_empty() {
        let dirs = vec![PathBuf::from("/nonexistent/kbsecret-test")];
        assert!(scan_external(&dirs).is_empty());
    }
}
