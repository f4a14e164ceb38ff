pub mod nevra;
pub mod package;
pub mod version;

pub use nevra::{split_repo, PackageIdentity, REPO_SEPARATOR};
pub use package::*;
pub use version::RpmVersion;
