use super::DnfBackend;
use crate::error::Result;
use crate::normalize::package::Attribute;
use crate::normalize::split_repo;
use serde_json::Value;
use tracing::{debug, instrument};

/// `(identity, repo, value)` for one matched package
pub type AttributeValue = (String, String, Value);

impl DnfBackend {
    /// Read one attribute from every package matching `pattern`.
    ///
    /// An empty `repo` matches all repositories; a pattern written as
    /// `identity;repo` then supplies the repository itself. Unknown
    /// attributes are null. Asking for changelogs refills the index with
    /// changelog metadata the first time.
    #[instrument(skip(self))]
    pub fn get_attribute(
        &mut self,
        pattern: &str,
        repo: Option<&str>,
        attribute: &str,
    ) -> Result<Vec<AttributeValue>> {
        let attr = Attribute::from_name(attribute);
        if attr == Some(Attribute::Changelog) && !self.changelogs_loaded() {
            debug!("changelogs requested, reloading with changelog metadata");
            self.setup(true, true)?;
        }

        let (pattern, repo) = match repo.filter(|r| !r.is_empty()) {
            Some(repo) => (pattern, Some(repo)),
            None => split_repo(pattern),
        };

        let packages = self.packages().find(pattern, repo)?;
        Ok(packages
            .into_iter()
            .map(|pkg| {
                let value = attr.map_or(Value::Null, |attr| pkg.attribute(attr));
                (pkg.identity.format(), pkg.repo, value)
            })
            .collect())
    }
}
