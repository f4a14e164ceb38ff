/// Integration tests for the cache engine over a throw-away dnf cache
#[cfg(test)]
mod tests {
    use dnf_dbus::backend::DnfBackend;
    use dnf_dbus::config::Config;
    use dnf_dbus::engine::{CacheEngine, FillOptions, PackageEngine, Selection};
    use dnf_dbus::error::DnfDbusError;
    use dnf_dbus::repomd::model::PackageOptionType;
    use serde_json::Value;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    const REPOMD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo">
  <revision>1617192000</revision>
  <data type="primary">
    <location href="repodata/0a1b-primary.xml.gz"/>
  </data>
  <data type="other">
    <location href="repodata/2c3d-other.xml.zst"/>
  </data>
  <data type="group_xz">
    <location href="repodata/4e5f-comps.xml.xz"/>
  </data>
</repomd>"#;

    const PRIMARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="4">
  <package type="rpm">
    <name>AtomicParsley</name>
    <arch>x86_64</arch>
    <version epoch="0" ver="0.9.5" rel="17.fc34"/>
    <checksum type="sha256" pkgid="YES">aaa111</checksum>
    <summary>Command line program for reading iTunes-style metadata</summary>
    <description>AtomicParsley is a lightweight command line program.</description>
    <size package="64896" installed="154201" archive="155184"/>
    <format><rpm:license>GPLv2+</rpm:license></format>
  </package>
  <package type="rpm">
    <name>AtomicParsley</name>
    <arch>x86_64</arch>
    <version epoch="0" ver="0.9.4" rel="1.fc34"/>
    <checksum type="sha256" pkgid="YES">aaa000</checksum>
    <summary>Command line program for reading iTunes-style metadata</summary>
    <description>Older build.</description>
    <size package="60000" installed="150000" archive="150000"/>
  </package>
  <package type="rpm">
    <name>NetworkManager-adsl</name>
    <arch>x86_64</arch>
    <version epoch="1" ver="1.30.4" rel="1.fc34"/>
    <checksum type="sha256" pkgid="YES">bbb222</checksum>
    <summary>ADSL device plugin for NetworkManager</summary>
    <description>This package contains NetworkManager support for ADSL devices.</description>
    <size package="41234" installed="98765" archive="99000"/>
  </package>
  <package type="rpm">
    <name>NetworkManager-bluetooth</name>
    <arch>x86_64</arch>
    <version epoch="1" ver="1.30.4" rel="1.fc34"/>
    <checksum type="sha256" pkgid="YES">ccc333</checksum>
    <summary>Bluetooth device plugin for NetworkManager</summary>
    <description>Bluetooth support.</description>
    <size package="51234" installed="108765" archive="109000"/>
  </package>
</metadata>"#;

    const OTHER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<otherdata xmlns="http://linux.duke.edu/metadata/other" packages="1">
  <package pkgid="aaa111" name="AtomicParsley" arch="x86_64">
    <version epoch="0" ver="0.9.5" rel="17.fc34"/>
    <changelog author="Fedora Release Engineering &lt;releng@fedoraproject.org&gt; - 0.9.5-16" date="1579608000">- Rebuilt for Fedora 32</changelog>
    <changelog author="Fedora Release Engineering &lt;releng@fedoraproject.org&gt; - 0.9.5-17" date="1611748800">- Rebuilt for Fedora 34</changelog>
  </package>
</otherdata>"#;

    const COMPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<comps>
  <group>
    <id>networkmanager-submodules</id>
    <name>NetworkManager Submodules</name>
    <name xml:lang="da">NetworkManager-undermoduler</name>
    <description>Plugins for NetworkManager.</description>
    <packagelist>
      <packagereq type="default">NetworkManager-adsl</packagereq>
      <packagereq type="optional">NetworkManager-bluetooth</packagereq>
    </packagelist>
  </group>
  <category>
    <id>base-system</id>
    <name>Base System</name>
    <description>Basic system tools.</description>
    <grouplist>
      <groupid>networkmanager-submodules</groupid>
    </grouplist>
  </category>
</comps>"#;

    struct Fixture {
        _root: TempDir,
        config: Config,
    }

    fn write_gz(path: &Path, data: &str) {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data.as_bytes()).unwrap();
        std::fs::write(path, encoder.finish().unwrap()).unwrap();
    }

    fn write_xz(path: &Path, data: &str) {
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder.write_all(data.as_bytes()).unwrap();
        std::fs::write(path, encoder.finish().unwrap()).unwrap();
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let repos = root.path().join("yum.repos.d");
        let cache = root.path().join("cache");
        std::fs::create_dir_all(&repos).unwrap();

        std::fs::write(
            repos.join("fedora.repo"),
            "[fedora]\nname=Fedora $releasever - $basearch\nenabled=1\n\n\
             [fedora-debuginfo]\nname=Fedora $releasever - Debug\nenabled=0\n",
        )
        .unwrap();
        std::fs::write(repos.join("extra.repo"), "[extra]\nname=Extra\nenabled=1\n").unwrap();

        let repodata = cache.join("fedora-4d5b4e3c2a1f0e9d").join("repodata");
        std::fs::create_dir_all(&repodata).unwrap();
        std::fs::write(repodata.join("repomd.xml"), REPOMD).unwrap();
        write_gz(&repodata.join("0a1b-primary.xml.gz"), PRIMARY);
        std::fs::write(
            repodata.join("2c3d-other.xml.zst"),
            zstd::encode_all(OTHER.as_bytes(), 3).unwrap(),
        )
        .unwrap();
        write_xz(&repodata.join("4e5f-comps.xml.xz"), COMPS);

        let config = Config {
            repos_dirs: vec![repos],
            cache_dir: cache,
            rpm_command: None,
            releasever: Some("34".to_string()),
            basearch: Some("x86_64".to_string()),
            locale: Some("da_DK".to_string()),
            ..Config::default()
        };
        Fixture {
            _root: root,
            config,
        }
    }

    fn fill(engine: &mut CacheEngine, changelogs: bool) -> Vec<(String, f64)> {
        let mut progress = Vec::new();
        engine.read_all_repos().unwrap();
        engine
            .fill_sack(
                &FillOptions {
                    cache_only: true,
                    changelogs,
                },
                &mut |text: &str, fraction: f64| progress.push((text.to_string(), fraction)),
            )
            .unwrap();
        progress
    }

    #[test]
    fn test_repositories() {
        let fx = fixture();
        let mut engine = CacheEngine::new(&fx.config);
        engine.read_all_repos().unwrap();

        let repos = engine.repositories().unwrap();
        let ids: Vec<_> = repos.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["extra", "fedora", "fedora-debuginfo"]);
        assert_eq!(repos[1].name, "Fedora 34 - x86_64");
        assert!(!repos[2].enabled);
    }

    #[test]
    fn test_fill_skips_repo_without_cache() {
        let fx = fixture();
        let mut engine = CacheEngine::new(&fx.config);
        let progress = fill(&mut engine, false);

        assert_eq!(progress.first().map(|p| p.0.as_str()), Some("Loading repository extra"));
        assert_eq!(progress.last().map(|p| p.1), Some(1.0));

        let available = engine.query(&Selection::Available).unwrap();
        assert_eq!(available.len(), 4);
        assert!(available.iter().all(|p| p.repo == "fedora"));
        assert!(engine.query(&Selection::Installed).unwrap().is_empty());
    }

    #[test]
    fn test_latest_and_patterns() {
        let fx = fixture();
        let mut engine = CacheEngine::new(&fx.config);
        fill(&mut engine, false);

        let latest = engine.query(&Selection::AvailableLatest).unwrap();
        assert_eq!(latest.len(), 3);
        assert_eq!(latest[0].identity.format(), "AtomicParsley-0.9.5-17.fc34.x86_64");
        assert_eq!(latest[0].size(), 64896);

        let matched = engine.query(&Selection::BestQuery("NetworkManager-*")).unwrap();
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].identity.epoch, "1");

        let newest = engine
            .query(&Selection::BestSelector {
                pattern: "AtomicParsley",
                repo: Some("fedora"),
            })
            .unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].identity.version, "0.9.5");
        assert!(newest[0].changelog.is_none());

        let elsewhere = engine
            .query(&Selection::BestSelector {
                pattern: "AtomicParsley",
                repo: Some("extra"),
            })
            .unwrap();
        assert!(elsewhere.is_empty());
    }

    #[test]
    fn test_changelogs() {
        let fx = fixture();
        let mut engine = CacheEngine::new(&fx.config);
        fill(&mut engine, true);

        let pkgs = engine
            .query(&Selection::BestSelector {
                pattern: "AtomicParsley",
                repo: None,
            })
            .unwrap();
        let changelog = pkgs[0].changelog.as_ref().unwrap();
        assert_eq!(changelog.len(), 2);
        assert_eq!(changelog[0].text, "- Rebuilt for Fedora 34");
        assert_eq!(
            changelog[0].author,
            "Fedora Release Engineering <releng@fedoraproject.org> - 0.9.5-17"
        );
    }

    #[test]
    fn test_comps() {
        let fx = fixture();
        let mut engine = CacheEngine::new(&fx.config);
        fill(&mut engine, false);

        assert!(matches!(engine.comps(), Err(DnfDbusError::EngineUnavailable(_))));
        engine.read_comps().unwrap();

        let comps = engine.comps().unwrap();
        assert_eq!(comps.categories[0].id, "base-system");
        assert_eq!(comps.groups[0].ui_name, "NetworkManager-undermoduler");
        assert_eq!(comps.groups[0].name, "NetworkManager Submodules");

        let pkgs = engine.group_packages("networkmanager-submodules").unwrap();
        assert_eq!(pkgs.len(), 2);
        assert_eq!(pkgs[0].option_type, PackageOptionType::Default);
        assert!(engine.group_packages("unknown").unwrap().is_empty());
    }

    #[test]
    fn test_missing_cache_is_engine_unavailable() {
        let fx = fixture();
        let mut config = fx.config.clone();
        config.cache_dir = fx._root.path().join("empty-cache");
        let mut engine = CacheEngine::new(&config);
        engine.read_all_repos().unwrap();

        let err = engine
            .fill_sack(
                &FillOptions {
                    cache_only: true,
                    changelogs: false,
                },
                &mut |_: &str, _: f64| {},
            )
            .unwrap_err();
        assert!(matches!(err, DnfDbusError::EngineUnavailable(_)));
        assert!(engine.query(&Selection::Available).unwrap().is_empty());
    }

    #[test]
    fn test_refresh_from_network_is_refused() {
        let fx = fixture();
        let mut engine = CacheEngine::new(&fx.config);
        engine.read_all_repos().unwrap();
        let err = engine
            .fill_sack(&FillOptions::default(), &mut |_: &str, _: f64| {})
            .unwrap_err();
        assert!(err.is_engine_failure());
    }

    #[test]
    fn test_backend_over_cache() {
        let fx = fixture();
        let mut backend = DnfBackend::new(Box::new(CacheEngine::new(&fx.config)), true);

        let available = backend.packages().by_filter("available").unwrap();
        assert_eq!(available.len(), 3);

        let values = backend
            .get_attribute("AtomicParsley-0.9.5-17.fc34.x86_64", Some("fedora"), "changelog")
            .unwrap();
        assert_eq!(values.len(), 1);
        let entries = values[0].2.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["text"], Value::from("- Rebuilt for Fedora 32"));

        let groups = backend.groups().groups_by_category("base-system").unwrap().len();
        assert_eq!(groups, 1);
        let pkgs = backend.groups().group_packages("networkmanager-submodules").unwrap();
        assert_eq!(pkgs[1].name, "NetworkManager-bluetooth");
    }
}
