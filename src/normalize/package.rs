use super::nevra::PackageIdentity;
use super::version::RpmVersion;
use crate::repomd::model::{RpmChangelog, RpmPackage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pseudo-repository holding installed packages
pub const INSTALLED_REPO: &str = "@System";

/// A package as seen by one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    pub pkg_id: Option<i64>,
    pub identity: PackageIdentity,
    pub repo: String,
    pub summary: String,
    pub description: String,
    pub url: Option<String>,
    pub license: Option<String>,
    pub download_size: Option<u64>,
    pub install_size: Option<u64>,
    /// Only present once changelog metadata has been loaded
    pub changelog: Option<Vec<ChangelogEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub text: String,
}

impl From<RpmChangelog> for ChangelogEntry {
    fn from(raw: RpmChangelog) -> Self {
        Self {
            timestamp: DateTime::from_timestamp(raw.date, 0).unwrap_or_default(),
            author: raw.author,
            text: raw.text,
        }
    }
}

/// Repository configuration as reported to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: String,
    pub name: String,
    pub enabled: bool,
}

/// Package attributes a client can ask for by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Name,
    Epoch,
    Version,
    Release,
    Arch,
    Evr,
    Nevra,
    Repo,
    Summary,
    Description,
    Url,
    License,
    Size,
    DownloadSize,
    InstallSize,
    Changelog,
    Installed,
}

impl Attribute {
    /// Closed name mapping; `None` for names no package exposes
    pub fn from_name(name: &str) -> Option<Self> {
        let attr = match name {
            "name" => Attribute::Name,
            "epoch" => Attribute::Epoch,
            "version" => Attribute::Version,
            "release" => Attribute::Release,
            "arch" => Attribute::Arch,
            "evr" => Attribute::Evr,
            "nevra" => Attribute::Nevra,
            "reponame" | "repoid" | "repo" => Attribute::Repo,
            "summary" => Attribute::Summary,
            "description" => Attribute::Description,
            "url" => Attribute::Url,
            "license" => Attribute::License,
            "size" => Attribute::Size,
            "downloadsize" => Attribute::DownloadSize,
            "installsize" => Attribute::InstallSize,
            "changelog" | "changelogs" => Attribute::Changelog,
            "installed" => Attribute::Installed,
            _ => return None,
        };
        Some(attr)
    }
}

impl PackageRecord {
    pub fn new(identity: PackageIdentity, repo: impl Into<String>) -> Self {
        Self {
            pkg_id: None,
            identity,
            repo: repo.into(),
            summary: String::new(),
            description: String::new(),
            url: None,
            license: None,
            download_size: None,
            install_size: None,
            changelog: None,
        }
    }

    /// Convert a raw primary.xml package
    pub fn from_rpm_package(raw: RpmPackage, repo: String) -> Self {
        let identity = PackageIdentity::new(
            raw.name,
            raw.epoch.unwrap_or(0).to_string(),
            raw.version,
            raw.release,
            raw.arch,
        );
        Self {
            pkg_id: None,
            identity,
            repo,
            summary: raw.summary,
            description: raw.description,
            url: raw.url,
            license: raw.license,
            download_size: raw.download_size,
            install_size: raw.install_size,
            changelog: None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.repo == INSTALLED_REPO
    }

    pub fn to_rpm_version(&self) -> RpmVersion {
        self.identity.evr()
    }

    /// Download size, falling back to the installed size
    pub fn size(&self) -> u64 {
        self.download_size.or(self.install_size).unwrap_or(0)
    }

    /// `[identity, repo]`
    pub fn dump(&self) -> (String, String) {
        (self.identity.format(), self.repo.clone())
    }

    /// `[identity, repo, summary, size]`
    pub fn dump_list(&self) -> (String, String, String, u64) {
        (
            self.identity.format(),
            self.repo.clone(),
            self.summary.clone(),
            self.size(),
        )
    }

    pub fn attribute(&self, attr: Attribute) -> Value {
        let id = &self.identity;
        match attr {
            Attribute::Name => Value::from(id.name.clone()),
            Attribute::Epoch => Value::from(id.epoch_num()),
            Attribute::Version => Value::from(id.version.clone()),
            Attribute::Release => Value::from(id.release.clone()),
            Attribute::Arch => Value::from(id.arch.clone()),
            Attribute::Evr => Value::from(if id.epoch == "0" {
                format!("{}-{}", id.version, id.release)
            } else {
                format!("{}:{}-{}", id.epoch, id.version, id.release)
            }),
            Attribute::Nevra => Value::from(id.format()),
            Attribute::Repo => Value::from(self.repo.clone()),
            Attribute::Summary => Value::from(self.summary.clone()),
            Attribute::Description => Value::from(self.description.clone()),
            Attribute::Url => self.url.clone().map_or(Value::Null, Value::from),
            Attribute::License => self.license.clone().map_or(Value::Null, Value::from),
            Attribute::Size => Value::from(self.size()),
            Attribute::DownloadSize => self.download_size.map_or(Value::Null, Value::from),
            Attribute::InstallSize => self.install_size.map_or(Value::Null, Value::from),
            Attribute::Changelog => self
                .changelog
                .as_ref()
                .and_then(|entries| serde_json::to_value(entries).ok())
                .unwrap_or(Value::Null),
            Attribute::Installed => Value::from(self.is_installed()),
        }
    }
}
