//! The `dk.rasmil.DnfDbus` service.
//!
//! [`DnfDbusDaemon`] does the work of each remote method: authorize the
//! sender, run the backend, encode the answer as JSON. [`DnfDbusInterface`]
//! puts it on the bus.

use super::protocol::{self, GroupDump, GroupPackageDump, PackageDump, PackageListDump, OBJECT_PATH};
use crate::auth::{AuthorizationGate, Permission};
use crate::backend::{BackendEvent, DnfBackend};
use crate::error::{DnfDbusError, Result};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};
use zbus::message::Header;
use zbus::object_server::SignalContext;

/// Request dispatcher behind the bus interface
pub struct DnfDbusDaemon {
    backend: Mutex<DnfBackend>,
    gate: AuthorizationGate,
    shutdown: Arc<Notify>,
}

impl DnfDbusDaemon {
    pub fn new(backend: DnfBackend, gate: AuthorizationGate) -> Self {
        Self {
            backend: Mutex::new(backend),
            gate,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Notified by [`DnfDbusDaemon::request_shutdown`]
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    pub fn version(&self) -> String {
        protocol::version_string()
    }

    /// Quit is the one write operation
    #[instrument(skip(self))]
    pub async fn quit(&self, sender: &str) -> Result<()> {
        self.gate.authorize(sender, Permission::Write).await?;
        info!("quit requested");
        Ok(())
    }

    /// Wake the serve loop so it shuts down
    pub fn request_shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// authorize → perform → serialize
    async fn read<T, F>(&self, sender: &str, op: F) -> Result<String>
    where
        T: Serialize,
        F: FnOnce(&mut DnfBackend) -> Result<T>,
    {
        self.gate.authorize(sender, Permission::Read).await?;
        let value = {
            let mut backend = self.backend.lock().map_err(|_| {
                DnfDbusError::EngineUnavailable("backend lock poisoned".to_string())
            })?;
            op(&mut backend)?
        };
        Ok(serde_json::to_string(&value)?)
    }

    #[instrument(skip(self))]
    pub async fn get_repositories(&self, sender: &str) -> Result<String> {
        self.read(sender, |backend| backend.get_repositories()).await
    }

    #[instrument(skip(self))]
    pub async fn get_packages_by_key(&self, sender: &str, key: &str) -> Result<String> {
        self.read(sender, |backend| {
            let pkgs = backend.packages().by_key(key)?;
            Ok(pkgs.iter().map(|p| p.dump()).collect::<Vec<PackageDump>>())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_packages_by_filter(&self, sender: &str, flt: &str, extra: bool) -> Result<String> {
        if extra {
            self.read(sender, |backend| {
                let pkgs = backend.packages().by_filter(flt)?;
                Ok(pkgs.iter().map(|p| p.dump_list()).collect::<Vec<PackageListDump>>())
            })
            .await
        } else {
            self.read(sender, |backend| {
                let pkgs = backend.packages().by_filter(flt)?;
                Ok(pkgs.iter().map(|p| p.dump()).collect::<Vec<PackageDump>>())
            })
            .await
        }
    }

    #[instrument(skip(self))]
    pub async fn get_package_attribute(
        &self,
        sender: &str,
        pkg: &str,
        repo: &str,
        attribute: &str,
    ) -> Result<String> {
        self.read(sender, |backend| backend.get_attribute(pkg, Some(repo), attribute))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_categories(&self, sender: &str) -> Result<String> {
        self.read(sender, |backend| {
            let mut groups = backend.groups();
            let categories = groups.categories()?;
            Ok(categories.iter().map(|c| c.dump()).collect::<Vec<GroupDump>>())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_groups_by_category(&self, sender: &str, category_id: &str) -> Result<String> {
        self.read(sender, |backend| {
            let mut groups = backend.groups();
            let members = groups.groups_by_category(category_id)?;
            Ok(members.iter().map(|g| g.dump()).collect::<Vec<GroupDump>>())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_group_packages(&self, sender: &str, group_id: &str) -> Result<String> {
        self.read(sender, |backend| {
            let pkgs = backend.groups().group_packages(group_id)?;
            Ok(pkgs
                .into_iter()
                .map(|p| (p.name, p.option_type))
                .collect::<Vec<GroupPackageDump>>())
        })
        .await
    }
}

/// Errors as they appear on the bus, named `dk.rasmil.DnfDbus.<Variant>`
#[derive(Debug, zbus::DBusError)]
#[zbus(prefix = "dk.rasmil.DnfDbus")]
pub enum BusError {
    #[zbus(error)]
    ZBus(zbus::Error),
    AccessDenied(String),
    MalformedIdentity(String),
    EngineUnavailable(String),
    Failed(String),
}

impl From<DnfDbusError> for BusError {
    fn from(err: DnfDbusError) -> Self {
        match err {
            DnfDbusError::AccessDenied(msg) => BusError::AccessDenied(msg),
            DnfDbusError::MalformedIdentity(msg) => BusError::MalformedIdentity(msg),
            DnfDbusError::Bus(e) => BusError::ZBus(e),
            e if e.is_engine_failure() => BusError::EngineUnavailable(e.to_string()),
            e => BusError::Failed(e.to_string()),
        }
    }
}

fn sender(header: &Header<'_>) -> std::result::Result<String, BusError> {
    header
        .sender()
        .map(|s| s.to_string())
        .ok_or_else(|| BusError::AccessDenied("message carries no sender".to_string()))
}

/// Bus face of [`DnfDbusDaemon`]
pub struct DnfDbusInterface {
    daemon: Arc<DnfDbusDaemon>,
}

impl DnfDbusInterface {
    pub fn new(daemon: Arc<DnfDbusDaemon>) -> Self {
        Self { daemon }
    }
}

#[zbus::interface(name = "dk.rasmil.DnfDbus")]
impl DnfDbusInterface {
    async fn version(&self) -> String {
        self.daemon.version()
    }

    async fn quit(
        &self,
        #[zbus(header)] header: Header<'_>,
        #[zbus(signal_context)] ctxt: SignalContext<'_>,
    ) -> std::result::Result<(), BusError> {
        let sender = sender(&header)?;
        self.daemon.quit(&sender).await?;
        Self::quitting(&ctxt).await?;
        self.daemon.request_shutdown();
        Ok(())
    }

    async fn get_repositories(
        &self,
        #[zbus(header)] header: Header<'_>,
    ) -> std::result::Result<String, BusError> {
        Ok(self.daemon.get_repositories(&sender(&header)?).await?)
    }

    async fn get_packages_by_key(
        &self,
        #[zbus(header)] header: Header<'_>,
        key: String,
    ) -> std::result::Result<String, BusError> {
        Ok(self.daemon.get_packages_by_key(&sender(&header)?, &key).await?)
    }

    async fn get_packages_by_filter(
        &self,
        #[zbus(header)] header: Header<'_>,
        flt: String,
        extra: bool,
    ) -> std::result::Result<String, BusError> {
        Ok(self
            .daemon
            .get_packages_by_filter(&sender(&header)?, &flt, extra)
            .await?)
    }

    async fn get_package_attribute(
        &self,
        #[zbus(header)] header: Header<'_>,
        pkg: String,
        reponame: String,
        attribute: String,
    ) -> std::result::Result<String, BusError> {
        Ok(self
            .daemon
            .get_package_attribute(&sender(&header)?, &pkg, &reponame, &attribute)
            .await?)
    }

    async fn get_categories(
        &self,
        #[zbus(header)] header: Header<'_>,
    ) -> std::result::Result<String, BusError> {
        Ok(self.daemon.get_categories(&sender(&header)?).await?)
    }

    async fn get_groups_by_category(
        &self,
        #[zbus(header)] header: Header<'_>,
        category_id: String,
    ) -> std::result::Result<String, BusError> {
        Ok(self
            .daemon
            .get_groups_by_category(&sender(&header)?, &category_id)
            .await?)
    }

    async fn get_group_packages(
        &self,
        #[zbus(header)] header: Header<'_>,
        group_id: String,
    ) -> std::result::Result<String, BusError> {
        Ok(self
            .daemon
            .get_group_packages(&sender(&header)?, &group_id)
            .await?)
    }

    #[zbus(signal)]
    async fn message(ctxt: &SignalContext<'_>, text: &str) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn progress(ctxt: &SignalContext<'_>, text: &str, fraction: f64) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn quitting(ctxt: &SignalContext<'_>) -> zbus::Result<()>;
}

/// Publish the interface, take the bus name and forward backend events as
/// signals until Quit (or Ctrl-C) ends the loop.
pub async fn serve(
    connection: zbus::Connection,
    bus_name: &str,
    daemon: Arc<DnfDbusDaemon>,
    events: UnboundedReceiver<BackendEvent>,
) -> Result<()> {
    connection
        .object_server()
        .at(OBJECT_PATH, DnfDbusInterface::new(daemon.clone()))
        .await?;
    connection.request_name(bus_name).await?;
    info!(name = %bus_name, path = OBJECT_PATH, "serving");

    run_until_shutdown(&connection, &daemon, events).await?;

    debug!("releasing bus name");
    connection.release_name(bus_name).await?;
    info!("stopped");
    Ok(())
}

/// Forward backend events as signals from the published interface until
/// shutdown is requested. Returns only after calls still being answered,
/// Quit included, have written their reply.
pub async fn run_until_shutdown(
    connection: &zbus::Connection,
    daemon: &DnfDbusDaemon,
    mut events: UnboundedReceiver<BackendEvent>,
) -> Result<()> {
    let shutdown = daemon.shutdown_handle();
    let iface = connection
        .object_server()
        .interface::<_, DnfDbusInterface>(OBJECT_PATH)
        .await?;

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            Some(event) = events.recv() => {
                let ctxt = iface.signal_context();
                let sent = match &event {
                    BackendEvent::Message(text) => DnfDbusInterface::message(ctxt, text).await,
                    BackendEvent::Progress(text, fraction) => {
                        DnfDbusInterface::progress(ctxt, text, *fraction).await
                    }
                };
                if let Err(e) = sent {
                    warn!(error = %e, ?event, "failed to emit signal");
                }
            }
        }
    }

    // a method call holds the interface until its reply is on the wire
    drop(iface.get_mut().await);
    Ok(())
}
