//! `*.repo` configuration parsing
//!
//! ```ini
//! [fedora]
//! name=Fedora $releasever - $basearch
//! metalink=https://mirrors.fedoraproject.org/metalink?repo=fedora-$releasever&arch=$basearch
//! enabled=1
//! ```
//!
//! Every section is one repository. Only the fields the daemon reports are
//! read; URLs are left to the package manager that fills the cache.

use crate::error::{DnfDbusError, Result};
use ini::Ini;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One configured repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConf {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub source: PathBuf,
}

/// Values for `$releasever`, `$basearch` and `$arch`
#[derive(Debug, Clone, Default)]
pub struct RepoVars {
    pub releasever: String,
    pub basearch: String,
    pub arch: String,
}

impl RepoVars {
    pub fn substitute(&self, value: &str) -> String {
        [
            ("releasever", &self.releasever),
            ("basearch", &self.basearch),
            ("arch", &self.arch),
        ]
        .iter()
        .fold(value.to_string(), |acc, (var, val)| {
            acc.replace(&format!("${{{}}}", var), val)
                .replace(&format!("${}", var), val)
        })
    }
}

/// Load every `*.repo` file of the given directories, sorted by file name.
/// Missing directories are skipped; the first definition of a repo id wins.
pub fn load_repo_dirs(dirs: &[PathBuf], vars: &RepoVars) -> Result<Vec<RepoConf>> {
    let mut repos = Vec::new();
    let mut seen = HashSet::new();

    for dir in dirs {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "repo directory does not exist");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "repo"))
            .collect();
        files.sort();

        for file in files {
            for repo in load_repo_file(&file, vars)? {
                if seen.insert(repo.id.clone()) {
                    repos.push(repo);
                } else {
                    warn!(repo = %repo.id, file = %file.display(), "duplicate repository id ignored");
                }
            }
        }
    }

    Ok(repos)
}

/// Parse a single `.repo` file
pub fn load_repo_file(path: &Path, vars: &RepoVars) -> Result<Vec<RepoConf>> {
    let ini = Ini::load_from_file_noescape(path).map_err(|e| {
        DnfDbusError::Config(format!(
            "Failed to read repo file {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut repos = Vec::new();
    for (section_name, section) in ini.iter() {
        let Some(id) = section_name else {
            continue;
        };
        if id == "main" {
            continue;
        }
        let id = vars.substitute(id.trim());
        let name = section
            .get("name")
            .map(|n| vars.substitute(n.trim()))
            .unwrap_or_else(|| id.clone());
        let enabled = section.get("enabled").map_or(true, parse_bool);

        repos.push(RepoConf {
            id,
            name,
            enabled,
            source: path.to_path_buf(),
        });
    }

    Ok(repos)
}

fn parse_bool(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
