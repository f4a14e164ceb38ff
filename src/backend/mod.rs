//! Backend state shared by every remote call.
//!
//! [`DnfBackend`] owns the package engine and tracks whether the package
//! index has been filled. The first query fills it; later queries reuse it
//! until a refresh is asked for.

pub mod attribute;
pub mod groups;
pub mod packages;

use crate::engine::{FillOptions, PackageEngine};
use crate::error::Result;
use crate::normalize::package::RepositoryRecord;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument};

pub use groups::{Category, Group, Groups};
pub use packages::Packages;

use groups::CompsIndex;

/// Notifications raised while the backend works
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Message(String),
    /// Text and a fraction in `0.0..=1.0`
    Progress(String, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetupState {
    Unloaded,
    Ready { changelogs: bool },
}

pub struct DnfBackend {
    engine: Box<dyn PackageEngine>,
    cache_only: bool,
    repos_read: bool,
    /// Set once changelogs were asked for; later refreshes keep loading them
    want_changelogs: bool,
    state: SetupState,
    comps_read: bool,
    comps: CompsIndex,
    events: Option<UnboundedSender<BackendEvent>>,
}

impl DnfBackend {
    pub fn new(engine: Box<dyn PackageEngine>, cache_only: bool) -> Self {
        Self {
            engine,
            cache_only,
            repos_read: false,
            want_changelogs: false,
            state: SetupState::Unloaded,
            comps_read: false,
            comps: CompsIndex::Unbuilt,
            events: None,
        }
    }

    /// Forward progress and messages to a channel
    pub fn with_events(mut self, events: UnboundedSender<BackendEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn is_setup(&self) -> bool {
        matches!(self.state, SetupState::Ready { .. })
    }

    pub fn changelogs_loaded(&self) -> bool {
        matches!(self.state, SetupState::Ready { changelogs: true })
    }

    /// Read the repository configuration and fill the package index.
    ///
    /// Does nothing when the index is already filled, unless `refresh` is
    /// set. Repository configuration is read only once.
    #[instrument(skip(self))]
    pub fn setup(&mut self, changelogs: bool, refresh: bool) -> Result<()> {
        if self.is_setup() && !refresh {
            return Ok(());
        }

        if !self.repos_read {
            self.engine.read_all_repos()?;
            self.repos_read = true;
        }
        if changelogs {
            self.want_changelogs = true;
        }

        let options = FillOptions {
            cache_only: self.cache_only,
            changelogs: self.want_changelogs,
        };
        self.state = SetupState::Unloaded;
        self.comps_read = false;

        self.notify(BackendEvent::Message("Loading package information".to_string()));
        let events = self.events.clone();
        let mut progress = |text: &str, fraction: f64| {
            debug!(fraction, "{}", text);
            if let Some(tx) = &events {
                let _ = tx.send(BackendEvent::Progress(text.to_string(), fraction));
            }
        };
        self.engine.fill_sack(&options, &mut progress)?;

        self.state = SetupState::Ready {
            changelogs: options.changelogs,
        };
        info!(changelogs = options.changelogs, "package index ready");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get_repositories(&mut self) -> Result<Vec<RepositoryRecord>> {
        self.setup(false, false)?;
        self.engine.repositories()
    }

    /// Named package selections
    pub fn packages(&mut self) -> Packages<'_> {
        Packages::new(self)
    }

    /// Categories and groups from comps
    pub fn groups(&mut self) -> Groups<'_> {
        Groups::new(self)
    }

    /// Make sure the engine has comps loaded for the current index
    fn ensure_comps_read(&mut self) -> Result<()> {
        self.setup(false, false)?;
        if !self.comps_read {
            self.engine.read_comps()?;
            self.comps_read = true;
        }
        Ok(())
    }

    fn notify(&self, event: BackendEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
