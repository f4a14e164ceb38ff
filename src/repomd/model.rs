use serde::{Deserialize, Serialize};

/// Raw package metadata from primary.xml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpmPackage {
    pub name: String,
    pub epoch: Option<i64>,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub summary: String,
    pub description: String,
    pub url: Option<String>,
    pub license: Option<String>,
    /// `<checksum pkgid="YES">`, the key other.xml refers back to
    pub pkgid: Option<String>,
    /// `<size package=...>`
    pub download_size: Option<u64>,
    /// `<size installed=...>`
    pub install_size: Option<u64>,
}

/// One `<changelog>` entry from other.xml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpmChangelog {
    pub author: String,
    pub date: i64,
    pub text: String,
}

/// Changelogs of one package from other.xml (matched to packages by NEVRA)
#[derive(Debug, Clone, Default)]
pub struct OtherPackage {
    pub pkgid: Option<String>,
    pub name: String,
    pub arch: String,
    pub epoch: Option<i64>,
    pub version: String,
    pub release: String,
    pub changelogs: Vec<RpmChangelog>,
}

/// Locations of the metadata files listed in repomd.xml
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoDataIndex {
    pub primary: Option<String>,
    pub other: Option<String>,
    pub group: Option<String>,
}

/// How a package is pulled in when its group is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageOptionType {
    #[default]
    Mandatory,
    Default,
    Optional,
    Conditional,
}

impl PackageOptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageOptionType::Mandatory => "mandatory",
            PackageOptionType::Default => "default",
            PackageOptionType::Optional => "optional",
            PackageOptionType::Conditional => "conditional",
        }
    }

    /// comps `type` attribute; unknown values count as mandatory like dnf does
    pub fn from_comps(value: &str) -> Self {
        match value {
            "default" => PackageOptionType::Default,
            "optional" => PackageOptionType::Optional,
            "conditional" => PackageOptionType::Conditional,
            _ => PackageOptionType::Mandatory,
        }
    }
}

/// `<packagereq>` inside a comps group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPackage {
    pub name: String,
    pub option_type: PackageOptionType,
}

/// comps `<category>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompsCategory {
    pub id: String,
    pub name: String,
    pub ui_name: String,
    pub ui_description: String,
    pub group_ids: Vec<String>,
}

/// comps `<group>` without its package list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompsGroup {
    pub id: String,
    pub name: String,
    pub ui_name: String,
    pub ui_description: String,
}

/// Merged comps data of all loaded repositories
#[derive(Debug, Clone, Default)]
pub struct CompsData {
    pub categories: Vec<CompsCategory>,
    pub groups: Vec<CompsGroup>,
}
