use crate::error::{DnfDbusError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Well-known bus name the daemon owns
pub const DEFAULT_BUS_NAME: &str = "dk.rasmil.DnfDbus";

/// Default daemon configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/dnf-dbus/daemon.toml";

/// Message bus the daemon registers on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// System bus (production)
    #[default]
    System,
    /// Session bus (development)
    Session,
}

/// How remote callers are authorized
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyMode {
    /// Ask polkit for every (caller, permission) pair once
    #[default]
    Polkit,
    /// Grant everything; only meant for session-bus development
    AllowAll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bus to register on
    pub bus: BusKind,

    /// Well-known name to request
    pub bus_name: String,

    /// Authorization backend
    pub authorization: PolicyMode,

    /// Directories holding `*.repo` files
    pub repos_dirs: Vec<PathBuf>,

    /// dnf metadata cache
    pub cache_dir: PathBuf,

    /// Only use metadata already present in the cache
    pub cache_only: bool,

    /// rpm binary used to list installed packages (None disables the rpmdb)
    pub rpm_command: Option<PathBuf>,

    /// Package index database file (None keeps it in memory)
    pub db_path: Option<PathBuf>,

    /// Value substituted for `$releasever` (detected from os-release when unset)
    pub releasever: Option<String>,

    /// Value substituted for `$basearch` (detected from the host when unset)
    pub basearch: Option<String>,

    /// Locale used to pick translated group names, e.g. "da"
    pub locale: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: BusKind::default(),
            bus_name: DEFAULT_BUS_NAME.to_string(),
            authorization: PolicyMode::default(),
            repos_dirs: vec![PathBuf::from("/etc/yum.repos.d")],
            cache_dir: PathBuf::from("/var/cache/dnf"),
            cache_only: true,
            rpm_command: Some(PathBuf::from("rpm")),
            db_path: None,
            releasever: None,
            basearch: None,
            locale: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| DnfDbusError::Config(format!("Invalid daemon config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Default per-user config location, used for session-bus runs
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dnf-dbus").join("daemon.toml"))
    }

    /// Effective `$releasever`
    pub fn releasever(&self) -> String {
        self.releasever
            .clone()
            .or_else(|| detect_releasever(Path::new("/etc/os-release")))
            .unwrap_or_default()
    }

    /// Effective `$basearch`
    pub fn basearch(&self) -> String {
        self.basearch
            .clone()
            .unwrap_or_else(|| basearch_for(std::env::consts::ARCH).to_string())
    }
}

/// Read VERSION_ID from an os-release file
pub fn detect_releasever(os_release: &Path) -> Option<String> {
    let content = std::fs::read_to_string(os_release).ok()?;
    content.lines().find_map(|line| {
        line.strip_prefix("VERSION_ID=")
            .map(|v| v.trim().trim_matches('"').to_string())
    })
}

/// Map a machine architecture to the rpm base architecture
pub fn basearch_for(arch: &str) -> &str {
    match arch {
        "x86" | "i386" | "i486" | "i586" | "i686" => "i386",
        "arm" | "armv7hl" | "armv7l" => "armhfp",
        "powerpc64" => "ppc64",
        "powerpc64le" => "ppc64le",
        other => other,
    }
}
