use super::DnfBackend;
use crate::engine::Selection;
use crate::error::Result;
use crate::normalize::package::PackageRecord;
use tracing::{debug, instrument};

/// Named selections over the package index.
///
/// Every selection fills the index on first use.
pub struct Packages<'a> {
    backend: &'a mut DnfBackend,
}

impl<'a> Packages<'a> {
    pub(super) fn new(backend: &'a mut DnfBackend) -> Self {
        Self { backend }
    }

    fn query(&mut self, selection: Selection<'_>) -> Result<Vec<PackageRecord>> {
        self.backend.setup(false, false)?;
        self.backend.engine.query(&selection)
    }

    pub fn installed(&mut self) -> Result<Vec<PackageRecord>> {
        self.query(Selection::Installed)
    }

    /// Newest available version of each package
    pub fn available(&mut self) -> Result<Vec<PackageRecord>> {
        self.query(Selection::AvailableLatest)
    }

    /// Every available version
    pub fn available_all(&mut self) -> Result<Vec<PackageRecord>> {
        self.query(Selection::Available)
    }

    pub fn updates(&mut self) -> Result<Vec<PackageRecord>> {
        self.query(Selection::Upgrades)
    }

    /// Installed and available packages matching a glob pattern
    #[instrument(skip(self))]
    pub fn by_key(&mut self, pattern: &str) -> Result<Vec<PackageRecord>> {
        self.query(Selection::BestQuery(pattern))
    }

    /// `installed`, `available` or `updates`; any other name selects nothing
    #[instrument(skip(self))]
    pub fn by_filter(&mut self, name: &str) -> Result<Vec<PackageRecord>> {
        match name {
            "installed" => self.installed(),
            "available" => self.available(),
            "updates" => self.updates(),
            _ => {
                debug!(filter = %name, "unknown filter");
                Ok(Vec::new())
            }
        }
    }

    /// Newest matches of a pattern per repository. An empty repo filter
    /// matches every repository.
    #[instrument(skip(self))]
    pub fn find(&mut self, pattern: &str, repo: Option<&str>) -> Result<Vec<PackageRecord>> {
        let repo = repo.filter(|r| !r.is_empty());
        self.query(Selection::BestSelector { pattern, repo })
    }
}
