/// Package identity (NEVRA) codec
///
/// A package identity is written as `name-version-release.arch`, or
/// `name-epoch:version-release.arch` when the epoch is not zero. The name may
/// itself contain hyphens, so the string is split from the right: the final dot
/// segment is the architecture, the text after the last hyphen is the release,
/// the text before it (with an optional `epoch:` prefix) is the version and
/// everything left over is the name.
///
/// # Examples
///
/// ```
/// use dnf_dbus::normalize::PackageIdentity;
///
/// let id = PackageIdentity::parse("foo-bar-7:2.3.0-1.fc34.x86_64").unwrap();
/// assert_eq!(id.name, "foo-bar");
/// assert_eq!(id.epoch, "7");
/// assert_eq!(id.to_string(), "foo-bar-7:2.3.0-1.fc34.x86_64");
///
/// let id = PackageIdentity::parse("foo-2.3.0-1.fc34.noarch").unwrap();
/// assert_eq!(id.epoch, "0");
/// assert_eq!(id.to_string(), "foo-2.3.0-1.fc34.noarch");
/// ```
use crate::error::{DnfDbusError, Result};
use crate::normalize::version::RpmVersion;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Separator between an identity and its repository in `identity;repo` strings
pub const REPO_SEPARATOR: char = ';';

static NEVRA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^([a-z0-9_.+\-]+)-(?:([0-9]+):)?([0-9a-z._+~^]+)-([0-9a-z._+~^]+)\.([a-z0-9_]+)$",
    )
    .expect("NEVRA pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageIdentity {
    pub name: String,
    pub epoch: String,
    pub version: String,
    pub release: String,
    pub arch: String,
}

impl PackageIdentity {
    pub fn new(
        name: impl Into<String>,
        epoch: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        let epoch = epoch.into();
        Self {
            name: name.into(),
            epoch: if epoch.is_empty() { "0".to_string() } else { epoch },
            version: version.into(),
            release: release.into(),
            arch: arch.into(),
        }
    }

    /// Parse an identity string with the anchored pattern. Surrounding
    /// whitespace is not stripped and makes the identity malformed.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = NEVRA_RE
            .captures(s)
            .ok_or_else(|| DnfDbusError::MalformedIdentity(s.to_string()))?;

        Ok(Self::new(
            &caps[1],
            caps.get(2).map_or("0", |m| m.as_str()),
            &caps[3],
            &caps[4],
            &caps[5],
        ))
    }

    /// Parse an identity string by scanning for separators from the right.
    ///
    /// Agrees with [`PackageIdentity::parse`] on well-formed input but does not
    /// validate the characters of each field.
    pub fn parse_scan(s: &str) -> Result<Self> {
        let malformed = || DnfDbusError::MalformedIdentity(s.to_string());
        if s.trim() != s {
            return Err(malformed());
        }

        let (rest, arch) = s.rsplit_once('.').ok_or_else(malformed)?;
        let (rest, release) = rest.rsplit_once('-').ok_or_else(malformed)?;
        let (name, epoch_version) = rest.rsplit_once('-').ok_or_else(malformed)?;
        let (epoch, version) = match epoch_version.split_once(':') {
            Some((epoch, version)) => (epoch, version),
            None => ("0", epoch_version),
        };

        if [name, version, release, arch].iter().any(|f| f.is_empty())
            || !epoch.chars().all(|c| c.is_ascii_digit())
        {
            return Err(malformed());
        }

        Ok(Self::new(name, epoch, version, release, arch))
    }

    /// Parse `identity;repo`; the repo part is optional.
    pub fn parse_with_repo(s: &str) -> Result<(Self, Option<String>)> {
        let (nevra, repo) = split_repo(s);
        Ok((Self::parse(nevra)?, repo.map(str::to_string)))
    }

    /// Canonical string form
    pub fn format(&self) -> String {
        if self.epoch == "0" {
            format!("{}-{}-{}.{}", self.name, self.version, self.release, self.arch)
        } else {
            format!(
                "{}-{}:{}-{}.{}",
                self.name, self.epoch, self.version, self.release, self.arch
            )
        }
    }

    /// Canonical string form qualified with a repository id
    pub fn format_with_repo(&self, repo: &str) -> String {
        format!("{}{}{}", self.format(), REPO_SEPARATOR, repo)
    }

    /// Epoch as a number; non-numeric epochs compare as zero
    pub fn epoch_num(&self) -> i64 {
        self.epoch.parse().unwrap_or(0)
    }

    /// Version/release part used for ordering
    pub fn evr(&self) -> RpmVersion {
        RpmVersion::new(
            Some(self.epoch_num()),
            self.version.clone(),
            self.release.clone(),
        )
    }
}

/// Split `identity;repo` into its parts
pub fn split_repo(s: &str) -> (&str, Option<&str>) {
    match s.split_once(REPO_SEPARATOR) {
        Some((nevra, repo)) => (nevra, Some(repo)),
        None => (s, None),
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl FromStr for PackageIdentity {
    type Err = DnfDbusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageIdentity {
    type Error = DnfDbusError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<PackageIdentity> for String {
    fn from(id: PackageIdentity) -> Self {
        id.format()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PKGS: &[&str] = &[
        "Carla-vst-1:2.3.0-1.fc34.x86_64",
        "NetworkManager-adsl-1:1.30.4-1.fc34.x86_64",
        "AtomicParsley-0.9.5-17.fc34.x86_64",
        "foo-too-loo-3:2.3.0-1.fc34.noarch",
        "qt6-qttools-libs-designercomponents-6.0.1-1.fc34.x86_64",
        "python3.9-3.9.6-1.fc34.x86_64",
        "libstdc++-11.2.1-1.fc34.i686",
        "kernel-5.14.0~rc6-1.fc34.x86_64",
    ];

    #[test]
    fn test_parse_with_epoch() {
        let id = PackageIdentity::parse("foo-bar-7:2.3.0-1.fc34.x86_64").unwrap();
        assert_eq!(id.name, "foo-bar");
        assert_eq!(id.epoch, "7");
        assert_eq!(id.version, "2.3.0");
        assert_eq!(id.release, "1.fc34");
        assert_eq!(id.arch, "x86_64");
    }

    #[test]
    fn test_parse_without_epoch() {
        let id = PackageIdentity::parse("foo-2.3.0-1.fc34.x86_64").unwrap();
        assert_eq!(id.name, "foo");
        assert_eq!(id.epoch, "0");
        assert_eq!(id.version, "2.3.0");
        assert_eq!(id.release, "1.fc34");
        assert_eq!(id.arch, "x86_64");
    }

    #[test]
    fn test_parse_hyphenated_names() {
        let id = PackageIdentity::parse("foo-too-loo-3:2.3.0-1.fc34.noarch").unwrap();
        assert_eq!(id.name, "foo-too-loo");
        assert_eq!(id.epoch, "3");
        assert_eq!(id.arch, "noarch");

        let id =
            PackageIdentity::parse("qt6-qttools-libs-designercomponents-6.0.1-1.fc34.x86_64")
                .unwrap();
        assert_eq!(id.name, "qt6-qttools-libs-designercomponents");
        assert_eq!(id.version, "6.0.1");
        assert_eq!(id.epoch, "0");
    }

    #[test]
    fn test_name_with_version_like_segment() {
        let id = PackageIdentity::parse("python3-3.9-devel-3.9.6-1.fc34.x86_64").unwrap();
        assert_eq!(id.name, "python3-3.9-devel");
        assert_eq!(id.version, "3.9.6");
        assert_eq!(id.release, "1.fc34");
    }

    #[test]
    fn test_format() {
        let id = PackageIdentity::new("foo", "0", "1.0", "1", "noarch");
        assert_eq!(id.format(), "foo-1.0-1.noarch");

        let id = PackageIdentity::new("foo", "3", "1.0", "1", "noarch");
        assert_eq!(id.format(), "foo-3:1.0-1.noarch");

        let id = PackageIdentity::new("foo", "", "1.0", "1", "noarch");
        assert_eq!(id.epoch, "0");
    }

    #[test]
    fn test_format_with_repo() {
        let id = PackageIdentity::parse("AtomicParsley-0.9.5-17.fc34.x86_64").unwrap();
        assert_eq!(
            id.format_with_repo("myrepo"),
            "AtomicParsley-0.9.5-17.fc34.x86_64;myrepo"
        );

        let (parsed, repo) =
            PackageIdentity::parse_with_repo("Carla-vst-1:2.3.0-1.fc34.x86_64;myrepo").unwrap();
        assert_eq!(parsed.name, "Carla-vst");
        assert_eq!(repo.as_deref(), Some("myrepo"));

        let (_, repo) = PackageIdentity::parse_with_repo("foo-1.0-1.noarch").unwrap();
        assert!(repo.is_none());
    }

    #[test]
    fn test_round_trip() {
        for s in TEST_PKGS {
            let id = PackageIdentity::parse(s).unwrap();
            assert_eq!(&id.format(), s);
            assert_eq!(PackageIdentity::parse(&id.format()).unwrap(), id);
        }
    }

    #[test]
    fn test_strategies_agree() {
        for s in TEST_PKGS {
            assert_eq!(
                PackageIdentity::parse(s).unwrap(),
                PackageIdentity::parse_scan(s).unwrap(),
                "{}",
                s
            );
        }
    }

    #[test]
    fn test_malformed() {
        for s in ["", "foo", "foo-1.0", "foo-1.0-1", "foo 1.0-1.x86_64", "foo-a:1.0-1.noarch"] {
            assert!(
                matches!(
                    PackageIdentity::parse(s),
                    Err(DnfDbusError::MalformedIdentity(_))
                ),
                "{}",
                s
            );
        }
        assert!(PackageIdentity::parse_scan("foo").is_err());
        for s in ["foo-1.0-1.noarch ", " foo-1.0-1.noarch", "foo-1.0-1.noarch\n"] {
            assert!(PackageIdentity::parse(s).is_err(), "{:?}", s);
            assert!(PackageIdentity::parse_scan(s).is_err(), "{:?}", s);
        }
        assert!(PackageIdentity::parse_scan("foo-a:1.0-1.noarch").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let id = PackageIdentity::parse("foo-3:1.0-1.noarch").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"foo-3:1.0-1.noarch\"");
        let back: PackageIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<PackageIdentity>("\"bogus\"").is_err());
    }

    #[test]
    fn test_evr_ordering() {
        let old = PackageIdentity::parse("foo-1.0-1.fc34.noarch").unwrap();
        let new = PackageIdentity::parse("foo-1.0-2.fc34.noarch").unwrap();
        let epoch = PackageIdentity::parse("foo-1:0.1-1.fc34.noarch").unwrap();
        assert!(old.evr() < new.evr());
        assert!(new.evr() < epoch.evr());
    }
}
