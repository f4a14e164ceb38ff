//! Caller authorization
//!
//! Every remote call is tagged read or write and checked against a policy
//! engine (polkit on the system bus). A grant is remembered for the sender
//! until the daemon exits; a denial is never remembered, so the next call
//! asks again.

use crate::error::{DnfDbusError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use zbus::zvariant::{Type, Value};

/// Permission class of a remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Queries
    Read,
    /// Anything that changes daemon or system state (currently only Quit)
    Write,
}

impl Permission {
    /// polkit action id
    pub fn action_id(&self) -> &'static str {
        match self {
            Permission::Read => "dk.rasmil.DnfDbus.read",
            Permission::Write => "dk.rasmil.DnfDbus.write",
        }
    }
}

/// Yes/no decision for a (caller, action) pair
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    async fn check(&self, subject: &str, action_id: &str) -> Result<bool>;
}

/// Grants everything. Session bus development only.
#[derive(Debug, Default)]
pub struct AllowAll;

#[async_trait]
impl PolicyEngine for AllowAll {
    async fn check(&self, subject: &str, action_id: &str) -> Result<bool> {
        debug!(subject, action_id, "authorization disabled, granting");
        Ok(true)
    }
}

/// `(sa{sv})` polkit subject
#[derive(Debug, Serialize, Type)]
struct Subject<'a> {
    kind: &'a str,
    details: HashMap<&'a str, Value<'a>>,
}

/// `(bba{ss})` polkit authorization result
#[derive(Debug, Deserialize, Type)]
struct AuthorizationResult {
    is_authorized: bool,
    is_challenge: bool,
    details: HashMap<String, String>,
}

#[zbus::proxy(
    interface = "org.freedesktop.PolicyKit1.Authority",
    default_service = "org.freedesktop.PolicyKit1",
    default_path = "/org/freedesktop/PolicyKit1/Authority",
    gen_blocking = false
)]
trait Authority {
    fn check_authorization(
        &self,
        subject: &Subject<'_>,
        action_id: &str,
        details: HashMap<&str, &str>,
        flags: u32,
        cancellation_id: &str,
    ) -> zbus::Result<AuthorizationResult>;
}

/// AllowUserInteraction
const CHECK_FLAGS: u32 = 1;

/// polkit over the system bus
pub struct PolkitAuthority {
    proxy: AuthorityProxy<'static>,
}

impl PolkitAuthority {
    pub async fn new(connection: &zbus::Connection) -> Result<Self> {
        let proxy = AuthorityProxy::new(connection).await?;
        Ok(Self { proxy })
    }
}

#[async_trait]
impl PolicyEngine for PolkitAuthority {
    async fn check(&self, subject: &str, action_id: &str) -> Result<bool> {
        let subject = Subject {
            kind: "system-bus-name",
            details: HashMap::from([("name", Value::from(subject))]),
        };
        let result = self
            .proxy
            .check_authorization(&subject, action_id, HashMap::new(), CHECK_FLAGS, "")
            .await?;
        debug!(
            action_id,
            authorized = result.is_authorized,
            challenge = result.is_challenge,
            details = ?result.details,
            "polkit decision"
        );
        Ok(result.is_authorized)
    }
}

/// Remembers which senders hold which permission
pub struct AuthorizationGate {
    policy: Arc<dyn PolicyEngine>,
    granted: Mutex<HashMap<Permission, HashSet<String>>>,
}

impl AuthorizationGate {
    pub fn new(policy: Arc<dyn PolicyEngine>) -> Self {
        Self {
            policy,
            granted: Mutex::new(HashMap::new()),
        }
    }

    fn is_granted(&self, sender: &str, permission: Permission) -> bool {
        self.granted
            .lock()
            .map(|granted| granted.get(&permission).is_some_and(|s| s.contains(sender)))
            .unwrap_or(false)
    }

    /// Check `sender` for `permission`, asking the policy engine only when no
    /// earlier grant exists. Policy engine failures count as denials.
    pub async fn authorize(&self, sender: &str, permission: Permission) -> Result<()> {
        if self.is_granted(sender, permission) {
            return Ok(());
        }

        let action_id = permission.action_id();
        let allowed = match self.policy.check(sender, action_id).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(sender, action_id, error = %e, "authorization check failed");
                false
            }
        };

        if !allowed {
            info!(sender, action_id, "access denied");
            return Err(DnfDbusError::AccessDenied(format!(
                "{} is not authorized for {}",
                sender, action_id
            )));
        }

        if let Ok(mut granted) = self.granted.lock() {
            granted.entry(permission).or_default().insert(sender.to_string());
        }
        debug!(sender, action_id, "access granted");
        Ok(())
    }
}
