//! The package engine seam.
//!
//! Adapters above this layer only ever talk to a [`PackageEngine`]; the daemon
//! ships [`cache::CacheEngine`], which reads what the system package manager
//! already has on disk.

pub mod cache;
pub mod repoconf;
pub mod rpmdb;
pub mod select;

use crate::error::Result;
use crate::normalize::package::{PackageRecord, RepositoryRecord};
use crate::repomd::model::{CompsData, GroupPackage};

pub use cache::CacheEngine;

/// How the package index is (re)filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillOptions {
    /// Use only metadata already in the cache
    pub cache_only: bool,
    /// Also load changelog metadata
    pub changelogs: bool,
}

/// Named selections over the package index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    Installed,
    /// Every available package, all versions
    Available,
    /// Newest available package per name.arch
    AvailableLatest,
    /// Newest upgrade per name.arch for installed packages
    Upgrades,
    /// Installed and available packages matching a glob pattern
    BestQuery(&'a str),
    /// Newest match per repo, optionally limited to one repository
    BestSelector {
        pattern: &'a str,
        repo: Option<&'a str>,
    },
}

/// Progress callback: (message, fraction in 0.0..=1.0)
pub type ProgressFn<'a> = dyn FnMut(&str, f64) + 'a;

pub trait PackageEngine: Send {
    /// Read repository configuration
    fn read_all_repos(&mut self) -> Result<()>;

    /// Build the package index from the enabled repositories and the rpmdb
    fn fill_sack(&mut self, options: &FillOptions, progress: &mut ProgressFn<'_>) -> Result<()>;

    /// All configured repositories, enabled or not
    fn repositories(&self) -> Result<Vec<RepositoryRecord>>;

    fn query(&self, selection: &Selection<'_>) -> Result<Vec<PackageRecord>>;

    /// Load comps metadata of the enabled repositories
    fn read_comps(&mut self) -> Result<()>;

    /// Categories and groups loaded by [`PackageEngine::read_comps`]
    fn comps(&self) -> Result<CompsData>;

    /// Package list of one group
    fn group_packages(&self, group_id: &str) -> Result<Vec<GroupPackage>>;
}
