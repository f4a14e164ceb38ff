//! Installed packages, read through `rpm -qa`

use crate::error::{DnfDbusError, Result};
use crate::normalize::package::{PackageRecord, INSTALLED_REPO};
use crate::normalize::PackageIdentity;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

/// Query format: one record per package, fields separated by control characters
fn query_format() -> String {
    [
        "%{NAME}",
        "%{EPOCHNUM}",
        "%{VERSION}",
        "%{RELEASE}",
        "%{ARCH}",
        "%{SIZE}",
        "%{SUMMARY}",
        "%{URL}",
        "%{LICENSE}",
        "%{DESCRIPTION}",
    ]
    .join(&FIELD_SEP.to_string())
        + &RECORD_SEP.to_string()
}

/// List installed packages with the given rpm binary
pub fn query_installed(rpm_command: &Path) -> Result<Vec<PackageRecord>> {
    let output = Command::new(rpm_command)
        .arg("-qa")
        .arg("--queryformat")
        .arg(query_format())
        .output()
        .map_err(|e| {
            DnfDbusError::EngineUnavailable(format!(
                "cannot run {}: {}",
                rpm_command.display(),
                e
            ))
        })?;

    if !output.status.success() {
        return Err(DnfDbusError::EngineUnavailable(format!(
            "{} -qa failed: {}",
            rpm_command.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let packages = parse_query_output(&String::from_utf8_lossy(&output.stdout));
    debug!(count = packages.len(), "read installed packages");
    Ok(packages)
}

/// Parse `rpm -qa` output produced with [`query_format`]
pub fn parse_query_output(output: &str) -> Vec<PackageRecord> {
    output
        .split(RECORD_SEP)
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let fields: Vec<&str> = record.trim_start_matches('\n').split(FIELD_SEP).collect();
            if fields.len() != 10 {
                warn!(fields = fields.len(), "skipping malformed rpmdb record");
                return None;
            }
            // gpg-pubkey entries have no architecture
            if fields[4] == "(none)" {
                return None;
            }

            let identity = PackageIdentity::new(fields[0], fields[1], fields[2], fields[3], fields[4]);
            let optional = |value: &str| (value != "(none)" && !value.is_empty()).then(|| value.to_string());

            let mut pkg = PackageRecord::new(identity, INSTALLED_REPO);
            pkg.install_size = fields[5].parse().ok();
            pkg.summary = fields[6].to_string();
            pkg.url = optional(fields[7]);
            pkg.license = optional(fields[8]);
            pkg.description = fields[9].to_string();
            Some(pkg)
        })
        .collect()
}
