//! Names and payload shapes shared by the daemon and its clients.
//!
//! Every method except `Version` and `Quit` answers with a JSON string:
//!
//! | Method | Payload |
//! |---|---|
//! | `GetRepositories` | `[{"id", "name", "enabled"}]` |
//! | `GetPackagesByKey` | `[[identity, repo]]` |
//! | `GetPackagesByFilter` | `[[identity, repo]]` or `[[identity, repo, summary, size]]` |
//! | `GetPackageAttribute` | `[[identity, repo, value]]` |
//! | `GetCategories`, `GetGroupsByCategory` | `[[id, name, ui_name, ui_description]]` |
//! | `GetGroupPackages` | `[[name, option_type]]` |

use crate::error::DnfDbusError;
use crate::repomd::model::PackageOptionType;

pub const OBJECT_PATH: &str = "/dk/rasmil/DnfDbus";

pub const ERROR_ACCESS_DENIED: &str = "dk.rasmil.DnfDbus.AccessDenied";
pub const ERROR_MALFORMED_IDENTITY: &str = "dk.rasmil.DnfDbus.MalformedIdentity";
pub const ERROR_ENGINE_UNAVAILABLE: &str = "dk.rasmil.DnfDbus.EngineUnavailable";
pub const ERROR_FAILED: &str = "dk.rasmil.DnfDbus.Failed";

/// `[identity, repo]`
pub type PackageDump = (String, String);
/// `[identity, repo, summary, size]`
pub type PackageListDump = (String, String, String, u64);
/// `[id, name, ui_name, ui_description]`
pub type GroupDump = (String, String, String, String);
/// `[name, option_type]`
pub type GroupPackageDump = (String, PackageOptionType);

/// Answer of the `Version` method
pub fn version_string() -> String {
    format!("Version : {}", env!("CARGO_PKG_VERSION"))
}

/// Rebuild the error kind from a D-Bus error reply
pub fn error_from_name(name: &str, message: String) -> DnfDbusError {
    match name {
        ERROR_ACCESS_DENIED => DnfDbusError::AccessDenied(message),
        ERROR_MALFORMED_IDENTITY => DnfDbusError::MalformedIdentity(message),
        ERROR_ENGINE_UNAVAILABLE => DnfDbusError::EngineUnavailable(message),
        _ => DnfDbusError::Remote(format!("{}: {}", name, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names() {
        let denied = error_from_name(ERROR_ACCESS_DENIED, "no".to_string());
        assert!(matches!(denied, DnfDbusError::AccessDenied(msg) if msg == "no"));
        assert!(matches!(
            error_from_name(ERROR_MALFORMED_IDENTITY, "foo".to_string()),
            DnfDbusError::MalformedIdentity(_)
        ));
        assert!(matches!(
            error_from_name(ERROR_ENGINE_UNAVAILABLE, "no cache".to_string()),
            DnfDbusError::EngineUnavailable(_)
        ));
    }

    #[test]
    fn test_unknown_error_name() {
        let err = error_from_name("org.freedesktop.DBus.Error.ServiceUnknown", "gone".to_string());
        assert!(matches!(err, DnfDbusError::Remote(_)));
        let err = error_from_name(ERROR_FAILED, "bad config".to_string());
        assert!(matches!(err, DnfDbusError::Remote(_)));
    }

    #[test]
    fn test_version_string() {
        assert!(version_string().starts_with("Version : "));
    }
}
