use crate::config::Config;
use crate::engine::repoconf::{load_repo_dirs, RepoConf, RepoVars};
use crate::engine::select::{self, literal_prefix};
use crate::engine::{rpmdb, FillOptions, PackageEngine, ProgressFn, Selection};
use crate::error::{DnfDbusError, Result};
use crate::normalize::package::{PackageRecord, RepositoryRecord};
use crate::repomd::model::{CompsData, GroupPackage, RepoDataIndex};
use crate::repomd::{CompsXmlParser, MetadataReader, OtherXmlParser, PrimaryXmlParser, RepomdXmlParser};
use crate::storage::{PackageStore, RepoScope};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// A repository whose cached metadata went into the package index
#[derive(Debug, Clone)]
struct LoadedRepo {
    id: String,
    dir: PathBuf,
    index: RepoDataIndex,
}

#[derive(Debug, Default)]
struct CompsState {
    data: CompsData,
    packages: HashMap<String, Vec<GroupPackage>>,
}

/// Package engine backed by the dnf metadata cache and the rpm database.
///
/// Never downloads: repositories without cached metadata are skipped.
pub struct CacheEngine {
    repos_dirs: Vec<PathBuf>,
    cache_dir: PathBuf,
    rpm_command: Option<PathBuf>,
    db_path: Option<PathBuf>,
    vars: RepoVars,
    locale: Option<String>,
    repos: Vec<RepoConf>,
    loaded: Vec<LoadedRepo>,
    store: Option<PackageStore>,
    changelogs_loaded: bool,
    comps: Option<CompsState>,
}

impl CacheEngine {
    pub fn new(config: &Config) -> Self {
        let basearch = config.basearch();
        Self {
            repos_dirs: config.repos_dirs.clone(),
            cache_dir: config.cache_dir.clone(),
            rpm_command: config.rpm_command.clone(),
            db_path: config.db_path.clone(),
            vars: RepoVars {
                releasever: config.releasever(),
                arch: std::env::consts::ARCH.to_string(),
                basearch,
            },
            locale: config.locale.clone(),
            repos: Vec::new(),
            loaded: Vec::new(),
            store: None,
            changelogs_loaded: false,
            comps: None,
        }
    }

    /// Newest `<cache_dir>/<id>[-<hex>]` directory holding `repodata/repomd.xml`
    pub fn find_repo_cache(&self, repo_id: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.cache_dir).ok()?;
        let prefix = format!("{}-", repo_id);

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name == repo_id
                    || name.strip_prefix(&prefix).is_some_and(|hash| {
                        !hash.is_empty() && hash.chars().all(|c| c.is_ascii_hexdigit())
                    })
            })
            .filter_map(|entry| {
                let repomd = entry.path().join("repodata").join("repomd.xml");
                let modified = std::fs::metadata(&repomd).and_then(|m| m.modified()).ok()?;
                Some((modified, entry.path()))
            })
            .max_by_key(|(modified, _)| *modified)
            .map(|(_, path)| path)
    }

    fn store(&self) -> Result<&PackageStore> {
        self.store.as_ref().ok_or_else(|| {
            DnfDbusError::EngineUnavailable("package index has not been filled".to_string())
        })
    }

    fn store_mut(&mut self) -> Result<&mut PackageStore> {
        self.store.as_mut().ok_or_else(|| {
            DnfDbusError::EngineUnavailable("package index has not been opened".to_string())
        })
    }

    /// Open the index on first use and empty it
    fn open_store(&mut self) -> Result<&mut PackageStore> {
        let mut store = match self.store.take() {
            Some(store) => store,
            None => match &self.db_path {
                Some(path) => PackageStore::new(path)?,
                None => PackageStore::in_memory()?,
            },
        };
        store.clear()?;
        Ok(self.store.insert(store))
    }

    /// Index one repository; returns the number of packages
    #[instrument(skip(self, dir), fields(repo = %repo_id))]
    fn load_repo(&mut self, repo_id: &str, dir: &Path, changelogs: bool) -> Result<usize> {
        let repomd = MetadataReader::read(dir.join("repodata").join("repomd.xml"))?;
        let index = RepomdXmlParser::parse(&repomd[..])?;

        let primary_href = index.primary.as_deref().ok_or_else(|| {
            DnfDbusError::EngineUnavailable(format!("{}: repomd.xml lists no primary data", repo_id))
        })?;
        let raw = PrimaryXmlParser::parse(&MetadataReader::read(dir.join(primary_href))?[..])?;

        let checksums: Vec<Option<String>> = raw.iter().map(|p| p.pkgid.clone()).collect();
        let records: Vec<PackageRecord> = raw
            .into_iter()
            .map(|p| PackageRecord::from_rpm_package(p, repo_id.to_string()))
            .collect();

        let store = self.store_mut()?;
        let pkg_ids = store.insert_packages_batch(&records)?;

        if changelogs {
            match index.other.as_deref() {
                Some(other_href) => {
                    let by_checksum: HashMap<String, i64> = checksums
                        .into_iter()
                        .zip(&pkg_ids)
                        .filter_map(|(sum, id)| sum.map(|s| (s, *id)))
                        .collect();
                    let other = OtherXmlParser::parse(&MetadataReader::read(dir.join(other_href))?[..])?;

                    let mut entries = Vec::with_capacity(other.len());
                    for pkg in other {
                        let pkg_id = match pkg.pkgid.as_ref().and_then(|s| by_checksum.get(s)) {
                            Some(id) => Some(*id),
                            None => store.find_package_by_nevra(
                                &pkg.name,
                                &pkg.arch,
                                pkg.epoch,
                                &pkg.version,
                                &pkg.release,
                                repo_id,
                            )?,
                        };
                        if let Some(pkg_id) = pkg_id {
                            entries.push((pkg_id, pkg.changelogs));
                        }
                    }
                    let count = store.insert_changelogs_batch(&entries)?;
                    debug!(changelogs = count, "indexed changelogs");
                }
                None => debug!("repository has no other.xml"),
            }
        }

        self.loaded.push(LoadedRepo {
            id: repo_id.to_string(),
            dir: dir.to_path_buf(),
            index,
        });
        Ok(records.len())
    }

    fn attach_changelogs(&self, mut packages: Vec<PackageRecord>) -> Result<Vec<PackageRecord>> {
        if !self.changelogs_loaded {
            return Ok(packages);
        }
        let store = self.store()?;
        for pkg in &mut packages {
            if let Some(pkg_id) = pkg.pkg_id {
                pkg.changelog = Some(store.changelogs_for(pkg_id)?);
            }
        }
        Ok(packages)
    }
}

impl PackageEngine for CacheEngine {
    #[instrument(skip(self))]
    fn read_all_repos(&mut self) -> Result<()> {
        self.repos = load_repo_dirs(&self.repos_dirs, &self.vars)?;
        info!(count = self.repos.len(), "read repository configuration");
        Ok(())
    }

    #[instrument(skip(self, progress))]
    fn fill_sack(&mut self, options: &FillOptions, progress: &mut ProgressFn<'_>) -> Result<()> {
        if !options.cache_only {
            return Err(DnfDbusError::EngineUnavailable(
                "metadata refresh is left to the package manager; run `dnf makecache` and use cache_only"
                    .to_string(),
            ));
        }

        self.open_store()?;
        self.loaded.clear();
        self.comps = None;
        self.changelogs_loaded = false;

        let enabled: Vec<String> = self
            .repos
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.id.clone())
            .collect();
        let steps = enabled.len() as f64 + 1.0;

        for (i, repo_id) in enabled.iter().enumerate() {
            progress(&format!("Loading repository {}", repo_id), i as f64 / steps);
            match self.find_repo_cache(repo_id) {
                Some(dir) => {
                    let count = self.load_repo(repo_id, &dir, options.changelogs)?;
                    info!(repo = %repo_id, packages = count, "loaded repository from cache");
                }
                None => warn!(repo = %repo_id, "no cached metadata, repository skipped"),
            }
        }

        if !enabled.is_empty() && self.loaded.is_empty() {
            return Err(DnfDbusError::EngineUnavailable(format!(
                "no cached metadata for any enabled repository in {}",
                self.cache_dir.display()
            )));
        }

        if let Some(rpm) = self.rpm_command.clone() {
            progress("Loading installed packages", enabled.len() as f64 / steps);
            let installed = rpmdb::query_installed(&rpm)?;
            self.store_mut()?.insert_packages_batch(&installed)?;
        }

        self.changelogs_loaded = options.changelogs;
        progress("Package index ready", 1.0);
        Ok(())
    }

    fn repositories(&self) -> Result<Vec<RepositoryRecord>> {
        Ok(self
            .repos
            .iter()
            .map(|r| RepositoryRecord {
                id: r.id.clone(),
                name: r.name.clone(),
                enabled: r.enabled,
            })
            .collect())
    }

    fn query(&self, selection: &Selection<'_>) -> Result<Vec<PackageRecord>> {
        let store = self.store()?;
        let packages = match *selection {
            Selection::Installed => store.packages(RepoScope::Installed)?,
            Selection::Available => store.packages(RepoScope::Available)?,
            Selection::AvailableLatest => select::latest(store.packages(RepoScope::Available)?),
            Selection::Upgrades => select::upgrades(
                &store.packages(RepoScope::Installed)?,
                store.packages(RepoScope::Available)?,
            ),
            Selection::BestQuery(pattern) => {
                let candidates = store.packages_matching(RepoScope::All, literal_prefix(pattern))?;
                self.attach_changelogs(select::best_query(candidates, pattern))?
            }
            Selection::BestSelector { pattern, repo } => {
                let scope = repo.map_or(RepoScope::All, RepoScope::Repo);
                let candidates = store.packages_matching(scope, literal_prefix(pattern))?;
                self.attach_changelogs(select::best_selector(candidates, pattern))?
            }
        };
        Ok(packages)
    }

    #[instrument(skip(self))]
    fn read_comps(&mut self) -> Result<()> {
        self.store()?;
        let mut state = CompsState::default();

        for repo in &self.loaded {
            let Some(href) = repo.index.group.as_deref() else {
                continue;
            };
            let data = MetadataReader::read(repo.dir.join(href))?;
            let doc = CompsXmlParser::parse(&data[..], self.locale.as_deref())?;
            debug!(
                repo = %repo.id,
                categories = doc.categories.len(),
                groups = doc.groups.len(),
                "read comps"
            );

            for category in doc.categories {
                match state.data.categories.iter_mut().find(|c| c.id == category.id) {
                    Some(existing) => {
                        for group_id in category.group_ids {
                            if !existing.group_ids.contains(&group_id) {
                                existing.group_ids.push(group_id);
                            }
                        }
                    }
                    None => state.data.categories.push(category),
                }
            }
            for (group, packages) in doc.groups {
                let merged = state.packages.entry(group.id.clone()).or_default();
                for pkg in packages {
                    if !merged.iter().any(|p| p.name == pkg.name) {
                        merged.push(pkg);
                    }
                }
                if !state.data.groups.iter().any(|g| g.id == group.id) {
                    state.data.groups.push(group);
                }
            }
        }

        info!(
            categories = state.data.categories.len(),
            groups = state.data.groups.len(),
            "comps loaded"
        );
        self.comps = Some(state);
        Ok(())
    }

    fn comps(&self) -> Result<CompsData> {
        self.comps
            .as_ref()
            .map(|c| c.data.clone())
            .ok_or_else(|| DnfDbusError::EngineUnavailable("comps have not been read".to_string()))
    }

    fn group_packages(&self, group_id: &str) -> Result<Vec<GroupPackage>> {
        let comps = self
            .comps
            .as_ref()
            .ok_or_else(|| DnfDbusError::EngineUnavailable("comps have not been read".to_string()))?;
        Ok(comps.packages.get(group_id).cloned().unwrap_or_default())
    }
}
