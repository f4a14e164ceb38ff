//! Fake collaborators shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use dnf_dbus::auth::PolicyEngine;
use dnf_dbus::engine::{select, FillOptions, PackageEngine, ProgressFn, Selection};
use dnf_dbus::error::{DnfDbusError, Result};
use dnf_dbus::normalize::package::{ChangelogEntry, PackageRecord, RepositoryRecord, INSTALLED_REPO};
use dnf_dbus::normalize::PackageIdentity;
use dnf_dbus::repomd::model::{
    CompsCategory, CompsData, CompsGroup, GroupPackage, PackageOptionType,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_PKGS: [&str; 10] = [
    "AtomicParsley-0.9.5-17.fc34.x86_64;myrepo",
    "Box2D-2.4.1-5.fc34.x86_64;myrepo",
    "Carla-1:2.3.0-1.fc34.x86_64;myrepo",
    "Carla-vst-1:2.3.0-1.fc34.x86_64;myrepo",
    "GraphicsMagick-1.3.36-3.fc34.x86_64;myrepo",
    "ModemManager-1.16.4-1.fc34.x86_64;myrepo",
    "ModemManager-glib-1.16.4-1.fc34.x86_64;myrepo",
    "NetworkManager-1:1.30.4-1.fc34.x86_64;myrepo",
    "NetworkManager-adsl-1:1.30.4-1.fc34.x86_64;myrepo",
    "NetworkManager-bluetooth-1:1.30.4-1.fc34.x86_64;myrepo",
];

pub const INSTALLED_PKGS: [&str; 3] = [
    "AtomicParsley-0.9.4-1.fc34.x86_64",
    "NetworkManager-1:1.30.4-1.fc34.x86_64",
    "bash-5.1.0-2.fc34.x86_64",
];

pub fn record(pkg: &str) -> PackageRecord {
    let (identity, repo) = PackageIdentity::parse_with_repo(pkg).unwrap();
    let mut record = PackageRecord::new(identity, repo.unwrap_or_else(|| INSTALLED_REPO.to_string()));
    record.summary = format!("{} summary", record.identity.name);
    record.description = format!("{} description", record.identity.name);
    record.download_size = Some(1024);
    record
}

/// Calls the backend made into the engine
#[derive(Debug, Default)]
pub struct Calls {
    pub read_repos: AtomicUsize,
    pub fills: AtomicUsize,
    pub changelog_fills: AtomicUsize,
    pub comps_reads: AtomicUsize,
    pub group_packages: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct FakeEngine {
    pub calls: Arc<Calls>,
    /// Fail the next fills while set
    pub fail_fill: Arc<AtomicBool>,
    installed: Vec<PackageRecord>,
    available: Vec<PackageRecord>,
    filled: bool,
    changelogs: bool,
    comps: Option<CompsData>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            fail_fill: Arc::new(AtomicBool::new(false)),
            installed: INSTALLED_PKGS.iter().map(|p| record(p)).collect(),
            available: TEST_PKGS.iter().map(|p| record(p)).collect(),
            filled: false,
            changelogs: false,
            comps: None,
        }
    }

    fn changelog(&self, mut pkgs: Vec<PackageRecord>) -> Vec<PackageRecord> {
        if self.changelogs {
            for pkg in &mut pkgs {
                pkg.changelog = Some(vec![ChangelogEntry {
                    timestamp: chrono::DateTime::from_timestamp(1_617_192_000, 0).unwrap(),
                    author: "Tim Lauridsen <tla@rasmil.dk> - 1.0-1".to_string(),
                    text: "- Initial build".to_string(),
                }]);
            }
        }
        pkgs
    }

    fn all(&self) -> Vec<PackageRecord> {
        self.installed.iter().chain(&self.available).cloned().collect()
    }
}

impl PackageEngine for FakeEngine {
    fn read_all_repos(&mut self) -> Result<()> {
        self.calls.read_repos.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn fill_sack(&mut self, options: &FillOptions, progress: &mut ProgressFn<'_>) -> Result<()> {
        self.calls.fills.fetch_add(1, Ordering::SeqCst);
        self.filled = false;
        self.comps = None;
        if self.fail_fill.load(Ordering::SeqCst) {
            return Err(DnfDbusError::EngineUnavailable("no cached metadata".to_string()));
        }
        if options.changelogs {
            self.calls.changelog_fills.fetch_add(1, Ordering::SeqCst);
        }
        progress("Loading repository myrepo", 0.5);
        progress("Package index ready", 1.0);
        self.changelogs = options.changelogs;
        self.filled = true;
        Ok(())
    }

    fn repositories(&self) -> Result<Vec<RepositoryRecord>> {
        Ok(["id1", "id2", "id3"]
            .iter()
            .map(|id| RepositoryRecord {
                id: id.to_string(),
                name: id.to_string(),
                enabled: *id != "id3",
            })
            .collect())
    }

    fn query(&self, selection: &Selection<'_>) -> Result<Vec<PackageRecord>> {
        if !self.filled {
            return Err(DnfDbusError::EngineUnavailable("not filled".to_string()));
        }
        Ok(match *selection {
            Selection::Installed => self.installed.clone(),
            Selection::Available => self.available.clone(),
            Selection::AvailableLatest => select::latest(self.available.clone()),
            Selection::Upgrades => select::upgrades(&self.installed, self.available.clone()),
            Selection::BestQuery(pattern) => self.changelog(select::best_query(self.all(), pattern)),
            Selection::BestSelector { pattern, repo } => {
                let candidates = self
                    .all()
                    .into_iter()
                    .filter(|p| repo.map_or(true, |r| p.repo == r))
                    .collect();
                self.changelog(select::best_selector(candidates, pattern))
            }
        })
    }

    fn read_comps(&mut self) -> Result<()> {
        if !self.filled {
            return Err(DnfDbusError::EngineUnavailable("not filled".to_string()));
        }
        self.calls.comps_reads.fetch_add(1, Ordering::SeqCst);
        self.comps = Some(comps());
        Ok(())
    }

    fn comps(&self) -> Result<CompsData> {
        self.comps
            .clone()
            .ok_or_else(|| DnfDbusError::EngineUnavailable("comps not read".to_string()))
    }

    fn group_packages(&self, group_id: &str) -> Result<Vec<GroupPackage>> {
        if self.comps.is_none() {
            return Err(DnfDbusError::EngineUnavailable("comps not read".to_string()));
        }
        self.calls.group_packages.fetch_add(1, Ordering::SeqCst);
        Ok(match group_id {
            "networkmanager-submodules" => vec![
                GroupPackage {
                    name: "NetworkManager-adsl".to_string(),
                    option_type: PackageOptionType::Default,
                },
                GroupPackage {
                    name: "NetworkManager-bluetooth".to_string(),
                    option_type: PackageOptionType::Optional,
                },
            ],
            _ => Vec::new(),
        })
    }
}

fn group(id: &str, ui_name: &str) -> CompsGroup {
    CompsGroup {
        id: id.to_string(),
        name: ui_name.to_string(),
        ui_name: ui_name.to_string(),
        ui_description: format!("{} packages", ui_name),
    }
}

fn comps() -> CompsData {
    CompsData {
        categories: vec![
            CompsCategory {
                id: "base-system".to_string(),
                name: "Base System".to_string(),
                ui_name: "Base System".to_string(),
                ui_description: "Basic system tools".to_string(),
                group_ids: vec!["networkmanager-submodules".to_string(), "hardware-support".to_string()],
            },
            CompsCategory {
                id: "content".to_string(),
                name: "Content".to_string(),
                ui_name: "Content".to_string(),
                ui_description: "Graphics and sound".to_string(),
                group_ids: vec!["graphics".to_string()],
            },
        ],
        groups: vec![
            group("graphics", "Graphics"),
            group("hardware-support", "Hardware Support"),
            group("networkmanager-submodules", "NetworkManager Submodules"),
        ],
    }
}

/// Policy engine answering from a switch, counting checks
#[derive(Debug)]
pub struct FakePolicy {
    pub allow: AtomicBool,
    pub checks: Mutex<Vec<(String, String)>>,
}

impl FakePolicy {
    pub fn new(allow: bool) -> Arc<Self> {
        Arc::new(Self {
            allow: AtomicBool::new(allow),
            checks: Mutex::new(Vec::new()),
        })
    }

    pub fn check_count(&self) -> usize {
        self.checks.lock().unwrap().len()
    }
}

#[async_trait]
impl PolicyEngine for FakePolicy {
    async fn check(&self, subject: &str, action_id: &str) -> Result<bool> {
        self.checks
            .lock()
            .unwrap()
            .push((subject.to_string(), action_id.to_string()));
        Ok(self.allow.load(Ordering::SeqCst))
    }
}
