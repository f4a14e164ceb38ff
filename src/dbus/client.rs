//! Blocking client for the daemon.
//!
//! [`BusClient`] makes the raw calls, each one driven to completion on a
//! private single-threaded runtime. [`DnfDbusClient`] decodes the JSON
//! answers into value objects.

use super::protocol::{self, GroupDump, GroupPackageDump};
use crate::config::BusKind;
use crate::error::{DnfDbusError, Result};
use crate::normalize::PackageIdentity;
use crate::repomd::model::PackageOptionType;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tokio::runtime::Runtime;

/// The daemon's methods, answering with raw JSON
pub trait RemoteDaemon {
    fn version(&self) -> Result<String>;
    fn quit(&self) -> Result<()>;
    fn get_repositories(&self) -> Result<String>;
    fn get_packages_by_key(&self, key: &str) -> Result<String>;
    fn get_packages_by_filter(&self, flt: &str, extra: bool) -> Result<String>;
    fn get_package_attribute(&self, pkg: &str, reponame: &str, attribute: &str) -> Result<String>;
    fn get_categories(&self) -> Result<String>;
    fn get_groups_by_category(&self, category_id: &str) -> Result<String>;
    fn get_group_packages(&self, group_id: &str) -> Result<String>;
}

#[zbus::proxy(
    interface = "dk.rasmil.DnfDbus",
    default_service = "dk.rasmil.DnfDbus",
    default_path = "/dk/rasmil/DnfDbus",
    gen_blocking = false
)]
trait DnfDbus {
    fn version(&self) -> zbus::Result<String>;
    fn quit(&self) -> zbus::Result<()>;
    fn get_repositories(&self) -> zbus::Result<String>;
    fn get_packages_by_key(&self, key: &str) -> zbus::Result<String>;
    fn get_packages_by_filter(&self, flt: &str, extra: bool) -> zbus::Result<String>;
    fn get_package_attribute(&self, pkg: &str, reponame: &str, attribute: &str) -> zbus::Result<String>;
    fn get_categories(&self) -> zbus::Result<String>;
    fn get_groups_by_category(&self, category_id: &str) -> zbus::Result<String>;
    fn get_group_packages(&self, group_id: &str) -> zbus::Result<String>;
}

/// Map a method error reply back to its error kind
fn remote_error(err: zbus::Error) -> DnfDbusError {
    match err {
        zbus::Error::MethodError(name, detail, _) => {
            protocol::error_from_name(name.as_str(), detail.unwrap_or_default())
        }
        e => DnfDbusError::Bus(e),
    }
}

/// Connection to the daemon; one call at a time
pub struct BusClient {
    runtime: Runtime,
    proxy: DnfDbusProxy<'static>,
}

impl BusClient {
    pub fn connect(bus: BusKind) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let proxy = runtime.block_on(async {
            let connection = match bus {
                BusKind::System => zbus::Connection::system().await?,
                BusKind::Session => zbus::Connection::session().await?,
            };
            DnfDbusProxy::new(&connection).await
        })?;
        Ok(Self { runtime, proxy })
    }

    fn call<T>(&self, fut: impl std::future::Future<Output = zbus::Result<T>>) -> Result<T> {
        self.runtime.block_on(fut).map_err(remote_error)
    }
}

impl RemoteDaemon for BusClient {
    fn version(&self) -> Result<String> {
        self.call(self.proxy.version())
    }

    fn quit(&self) -> Result<()> {
        self.call(self.proxy.quit())
    }

    fn get_repositories(&self) -> Result<String> {
        self.call(self.proxy.get_repositories())
    }

    fn get_packages_by_key(&self, key: &str) -> Result<String> {
        self.call(self.proxy.get_packages_by_key(key))
    }

    fn get_packages_by_filter(&self, flt: &str, extra: bool) -> Result<String> {
        self.call(self.proxy.get_packages_by_filter(flt, extra))
    }

    fn get_package_attribute(&self, pkg: &str, reponame: &str, attribute: &str) -> Result<String> {
        self.call(self.proxy.get_package_attribute(pkg, reponame, attribute))
    }

    fn get_categories(&self) -> Result<String> {
        self.call(self.proxy.get_categories())
    }

    fn get_groups_by_category(&self, category_id: &str) -> Result<String> {
        self.call(self.proxy.get_groups_by_category(category_id))
    }

    fn get_group_packages(&self, group_id: &str) -> Result<String> {
        self.call(self.proxy.get_group_packages(group_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnfRepo {
    pub id: String,
    pub name: String,
    pub enabled: bool,
}

/// A package as reported by the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnfPkg {
    pub identity: PackageIdentity,
    pub repo: String,
    pub summary: Option<String>,
    pub size: Option<u64>,
}

impl DnfPkg {
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn epoch(&self) -> &str {
        &self.identity.epoch
    }

    pub fn version(&self) -> &str {
        &self.identity.version
    }

    pub fn release(&self) -> &str {
        &self.identity.release
    }

    pub fn arch(&self) -> &str {
        &self.identity.arch
    }
}

impl fmt::Display for DnfPkg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identity)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PackageWire {
    List(String, String, String, u64),
    Short(String, String),
}

impl PackageWire {
    fn decode(self) -> Result<DnfPkg> {
        let (nevra, repo, summary, size) = match self {
            PackageWire::List(nevra, repo, summary, size) => (nevra, repo, Some(summary), Some(size)),
            PackageWire::Short(nevra, repo) => (nevra, repo, None, None),
        };
        Ok(DnfPkg {
            identity: PackageIdentity::parse(&nevra)?,
            repo,
            summary,
            size,
        })
    }
}

/// One attribute value of one package
#[derive(Debug, Clone, PartialEq)]
pub struct PackageAttribute {
    pub pkg: DnfPkg,
    pub value: Value,
}

/// A comps category or group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub id: String,
    pub name: String,
    pub ui_name: String,
    pub ui_description: String,
}

impl From<GroupDump> for GroupInfo {
    fn from((id, name, ui_name, ui_description): GroupDump) -> Self {
        Self {
            id,
            name,
            ui_name,
            ui_description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPackage {
    pub name: String,
    pub option_type: PackageOptionType,
}

/// Typed facade over a [`RemoteDaemon`]
pub struct DnfDbusClient<P: RemoteDaemon = BusClient> {
    remote: P,
}

impl DnfDbusClient<BusClient> {
    /// Connect to the daemon on the system bus
    pub fn connect() -> Result<Self> {
        Ok(Self::new(BusClient::connect(BusKind::System)?))
    }
}

impl<P: RemoteDaemon> DnfDbusClient<P> {
    pub fn new(remote: P) -> Self {
        Self { remote }
    }

    pub fn version(&self) -> Result<String> {
        self.remote.version()
    }

    pub fn quit(&self) -> Result<()> {
        self.remote.quit()
    }

    pub fn get_repositories(&self) -> Result<Vec<DnfRepo>> {
        Ok(serde_json::from_str(&self.remote.get_repositories()?)?)
    }

    pub fn get_packages_by_key(&self, key: &str) -> Result<Vec<DnfPkg>> {
        decode_packages(&self.remote.get_packages_by_key(key)?)
    }

    /// `extra` adds summary and size to each package
    pub fn get_packages_by_filter(&self, flt: &str, extra: bool) -> Result<Vec<DnfPkg>> {
        decode_packages(&self.remote.get_packages_by_filter(flt, extra)?)
    }

    pub fn get_package_attribute(
        &self,
        pkg: &str,
        reponame: &str,
        attribute: &str,
    ) -> Result<Vec<PackageAttribute>> {
        let raw: Vec<(String, String, Value)> =
            serde_json::from_str(&self.remote.get_package_attribute(pkg, reponame, attribute)?)?;
        raw.into_iter()
            .map(|(nevra, repo, value)| {
                Ok(PackageAttribute {
                    pkg: PackageWire::Short(nevra, repo).decode()?,
                    value,
                })
            })
            .collect()
    }

    pub fn get_categories(&self) -> Result<Vec<GroupInfo>> {
        decode_groups(&self.remote.get_categories()?)
    }

    pub fn get_groups_by_category(&self, category_id: &str) -> Result<Vec<GroupInfo>> {
        decode_groups(&self.remote.get_groups_by_category(category_id)?)
    }

    pub fn get_group_packages(&self, group_id: &str) -> Result<Vec<GroupPackage>> {
        let raw: Vec<GroupPackageDump> =
            serde_json::from_str(&self.remote.get_group_packages(group_id)?)?;
        Ok(raw
            .into_iter()
            .map(|(name, option_type)| GroupPackage { name, option_type })
            .collect())
    }
}

fn decode_packages(json: &str) -> Result<Vec<DnfPkg>> {
    let raw: Vec<PackageWire> = serde_json::from_str(json)?;
    raw.into_iter().map(PackageWire::decode).collect()
}

fn decode_groups(json: &str) -> Result<Vec<GroupInfo>> {
    let raw: Vec<GroupDump> = serde_json::from_str(json)?;
    Ok(raw.into_iter().map(GroupInfo::from).collect())
}
