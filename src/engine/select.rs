//! Named package selections shared by engine implementations

use crate::normalize::package::PackageRecord;
use crate::normalize::RpmVersion;
use glob::Pattern;
use std::collections::HashMap;

/// Keep the highest EVR per (name, arch); every package carrying that EVR
/// survives, so the same build offered by two repositories is listed twice.
pub fn latest(packages: Vec<PackageRecord>) -> Vec<PackageRecord> {
    latest_by(packages, |pkg| {
        (pkg.identity.name.clone(), pkg.identity.arch.clone(), String::new())
    })
}

/// Keep the highest EVR per (name, arch, repo)
pub fn latest_per_repo(packages: Vec<PackageRecord>) -> Vec<PackageRecord> {
    latest_by(packages, |pkg| {
        (
            pkg.identity.name.clone(),
            pkg.identity.arch.clone(),
            pkg.repo.clone(),
        )
    })
}

fn latest_by<K>(packages: Vec<PackageRecord>, key: K) -> Vec<PackageRecord>
where
    K: Fn(&PackageRecord) -> (String, String, String),
{
    let mut best: HashMap<(String, String, String), RpmVersion> = HashMap::new();
    for pkg in &packages {
        let evr = pkg.to_rpm_version();
        best.entry(key(pkg))
            .and_modify(|current| {
                if evr > *current {
                    *current = evr.clone();
                }
            })
            .or_insert_with(|| evr.clone());
    }

    let mut selected: Vec<PackageRecord> = packages
        .into_iter()
        .filter(|pkg| best.get(&key(pkg)) == Some(&pkg.to_rpm_version()))
        .collect();
    sort_packages(&mut selected);
    selected
}

/// Available packages newer than an installed package of the same name and a
/// compatible arch, reduced to the latest of each (name, arch).
pub fn upgrades(installed: &[PackageRecord], available: Vec<PackageRecord>) -> Vec<PackageRecord> {
    let mut installed_by_name: HashMap<&str, Vec<&PackageRecord>> = HashMap::new();
    for pkg in installed {
        installed_by_name
            .entry(pkg.identity.name.as_str())
            .or_default()
            .push(pkg);
    }

    let candidates = available
        .into_iter()
        .filter(|pkg| {
            installed_by_name
                .get(pkg.identity.name.as_str())
                .is_some_and(|inst| {
                    let compatible: Vec<_> = inst
                        .iter()
                        .filter(|i| arch_compatible(&i.identity.arch, &pkg.identity.arch))
                        .collect();
                    !compatible.is_empty()
                        && compatible
                            .iter()
                            .all(|i| pkg.to_rpm_version() > i.to_rpm_version())
                })
        })
        .collect();

    latest(candidates)
}

fn arch_compatible(installed: &str, candidate: &str) -> bool {
    installed == candidate || installed == "noarch" || candidate == "noarch"
}

/// The string forms a package can be addressed by
pub fn nevra_forms(pkg: &PackageRecord) -> [String; 7] {
    let id = &pkg.identity;
    [
        id.name.clone(),
        format!("{}.{}", id.name, id.arch),
        format!("{}-{}", id.name, id.version),
        format!("{}-{}-{}", id.name, id.version, id.release),
        format!("{}-{}-{}.{}", id.name, id.version, id.release, id.arch),
        format!(
            "{}-{}:{}-{}.{}",
            id.name, id.epoch, id.version, id.release, id.arch
        ),
        format!("{}-{}:{}-{}", id.name, id.epoch, id.version, id.release),
    ]
}

/// Compile a user pattern; invalid glob syntax is matched literally
pub fn compile_pattern(pattern: &str) -> Pattern {
    Pattern::new(pattern).unwrap_or_else(|_| {
        Pattern::new(&Pattern::escape(pattern)).unwrap_or_default()
    })
}

/// Literal text before the first glob metacharacter
pub fn literal_prefix(pattern: &str) -> &str {
    let end = pattern.find(['*', '?', '[']).unwrap_or(pattern.len());
    &pattern[..end]
}

pub fn matches(pkg: &PackageRecord, pattern: &Pattern) -> bool {
    nevra_forms(pkg).iter().any(|form| pattern.matches(form))
}

/// Every package matching the pattern in any of its forms
pub fn best_query(packages: Vec<PackageRecord>, pattern: &str) -> Vec<PackageRecord> {
    let pattern = compile_pattern(pattern);
    let mut selected: Vec<_> = packages
        .into_iter()
        .filter(|pkg| matches(pkg, &pattern))
        .collect();
    sort_packages(&mut selected);
    selected
}

/// Matching packages reduced to the newest per (name, arch, repo)
pub fn best_selector(packages: Vec<PackageRecord>, pattern: &str) -> Vec<PackageRecord> {
    latest_per_repo(best_query(packages, pattern))
}

/// Deterministic listing order: name, arch, EVR, repo
pub fn sort_packages(packages: &mut [PackageRecord]) {
    packages.sort_by(|a, b| {
        a.identity
            .name
            .cmp(&b.identity.name)
            .then_with(|| a.identity.arch.cmp(&b.identity.arch))
            .then_with(|| a.to_rpm_version().cmp(&b.to_rpm_version()))
            .then_with(|| a.repo.cmp(&b.repo))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::package::INSTALLED_REPO;
    use crate::normalize::PackageIdentity;

    fn pkg(nevra: &str, repo: &str) -> PackageRecord {
        PackageRecord::new(PackageIdentity::parse(nevra).unwrap(), repo)
    }

    fn names(pkgs: &[PackageRecord]) -> Vec<String> {
        pkgs.iter()
            .map(|p| p.identity.format_with_repo(&p.repo))
            .collect()
    }

    #[test]
    fn test_latest() {
        let pkgs = vec![
            pkg("foo-1.0-1.fc34.x86_64", "fedora"),
            pkg("foo-1.1-1.fc34.x86_64", "updates"),
            pkg("foo-1.0-1.fc34.i686", "fedora"),
            pkg("bar-2.0-1.fc34.noarch", "fedora"),
            pkg("bar-2.0-1.fc34.noarch", "mirror"),
        ];
        assert_eq!(
            names(&latest(pkgs)),
            vec![
                "bar-2.0-1.fc34.noarch;fedora",
                "bar-2.0-1.fc34.noarch;mirror",
                "foo-1.0-1.fc34.i686;fedora",
                "foo-1.1-1.fc34.x86_64;updates",
            ]
        );
    }

    #[test]
    fn test_upgrades() {
        let installed = vec![
            pkg("foo-1.0-1.fc34.x86_64", INSTALLED_REPO),
            pkg("bar-2.0-1.fc34.noarch", INSTALLED_REPO),
            pkg("baz-1:1.0-1.fc34.x86_64", INSTALLED_REPO),
        ];
        let available = vec![
            pkg("foo-1.1-1.fc34.x86_64", "updates"),
            pkg("foo-1.2-1.fc34.x86_64", "updates-testing"),
            pkg("foo-1.5-1.fc34.i686", "updates"),
            pkg("bar-2.0-1.fc34.noarch", "fedora"),
            pkg("baz-9.0-1.fc34.x86_64", "updates"),
            pkg("new-1.0-1.fc34.x86_64", "fedora"),
        ];
        assert_eq!(
            names(&upgrades(&installed, available)),
            vec!["foo-1.2-1.fc34.x86_64;updates-testing"]
        );
    }

    #[test]
    fn test_best_query_forms() {
        let pkgs = vec![
            pkg("foo-bar-7:2.3.0-1.fc34.x86_64", "myrepo"),
            pkg("foo-2.3.0-1.fc34.x86_64", "myrepo"),
            pkg("foo-2.3.0-1.fc34.x86_64", INSTALLED_REPO),
        ];

        assert_eq!(best_query(pkgs.clone(), "foo").len(), 2);
        assert_eq!(best_query(pkgs.clone(), "foo*").len(), 3);
        assert_eq!(best_query(pkgs.clone(), "foo.x86_64").len(), 2);
        assert_eq!(best_query(pkgs.clone(), "foo-bar-2.3.0").len(), 1);
        assert_eq!(best_query(pkgs.clone(), "foo-bar-7:2.3.0-1.fc34.x86_64").len(), 1);
        assert_eq!(best_query(pkgs.clone(), "foo-0:2.3.0-1.fc34.x86_64").len(), 2);
        assert!(best_query(pkgs, "nothing*").is_empty());
    }

    #[test]
    fn test_best_selector_newest_per_repo() {
        let pkgs = vec![
            pkg("foo-1.0-1.fc34.x86_64", "fedora"),
            pkg("foo-1.1-1.fc34.x86_64", "fedora"),
            pkg("foo-1.0-1.fc34.x86_64", INSTALLED_REPO),
        ];
        assert_eq!(
            names(&best_selector(pkgs, "foo")),
            vec![
                "foo-1.0-1.fc34.x86_64;@System",
                "foo-1.1-1.fc34.x86_64;fedora",
            ]
        );
    }

    #[test]
    fn test_invalid_glob_is_literal() {
        let pkgs = vec![pkg("foo-1.0-1.fc34.x86_64", "fedora")];
        assert!(best_query(pkgs, "foo[").is_empty());
        assert!(compile_pattern("foo[").matches("foo["));
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(literal_prefix("foo-1.0*"), "foo-1.0");
        assert_eq!(literal_prefix("*foo"), "");
        assert_eq!(literal_prefix("foo"), "foo");
    }
}
