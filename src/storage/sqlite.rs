use crate::error::Result;
use crate::normalize::package::{ChangelogEntry, PackageRecord, INSTALLED_REPO};
use crate::normalize::PackageIdentity;
use crate::repomd::model::RpmChangelog;
use crate::storage::schema::Schema;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const PACKAGE_COLUMNS: &str = "pkg_id, name, epoch, version, release, arch, repo, summary, \
     description, url, license, download_size, install_size";

/// Which repositories a package listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoScope<'a> {
    All,
    Installed,
    Available,
    Repo(&'a str),
}

/// SQLite index of every package the engine currently knows about
pub struct PackageStore {
    conn: Connection,
}

impl PackageStore {
    /// Open a file-backed store
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory store
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Schema::migrate(&conn)?;
        Schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Remove every package and changelog
    pub fn clear(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM changelogs", [])?;
        tx.execute("DELETE FROM packages", [])?;
        tx.commit()?;
        Ok(())
    }

    /// Batch insert packages in a single transaction; returns their pkg_ids
    pub fn insert_packages_batch(&mut self, packages: &[PackageRecord]) -> Result<Vec<i64>> {
        let tx = self.conn.transaction()?;
        let mut pkg_ids = Vec::with_capacity(packages.len());

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO packages (name, epoch, version, release, arch, repo, summary,
                     description, url, license, download_size, install_size)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;

            for package in packages {
                let id = &package.identity;
                stmt.execute(params![
                    id.name,
                    id.epoch_num(),
                    id.version,
                    id.release,
                    id.arch,
                    package.repo,
                    package.summary,
                    package.description,
                    package.url,
                    package.license,
                    package.download_size.map(|s| s as i64),
                    package.install_size.map(|s| s as i64),
                ])?;
                pkg_ids.push(tx.last_insert_rowid());
            }
        }

        tx.commit()?;
        Ok(pkg_ids)
    }

    /// Batch insert changelogs; `entries` is (pkg_id, changelogs)
    pub fn insert_changelogs_batch(&mut self, entries: &[(i64, Vec<RpmChangelog>)]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut count = 0;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO changelogs (pkg_id, author, date, text) VALUES (?, ?, ?, ?)",
            )?;
            for (pkg_id, changelogs) in entries {
                for entry in changelogs {
                    stmt.execute(params![pkg_id, entry.author, entry.date, entry.text])?;
                    count += 1;
                }
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// Find a package by NEVRA + repo
    pub fn find_package_by_nevra(
        &self,
        name: &str,
        arch: &str,
        epoch: Option<i64>,
        version: &str,
        release: &str,
        repo: &str,
    ) -> Result<Option<i64>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT pkg_id FROM packages
             WHERE name = ? AND arch = ? AND version = ? AND release = ? AND repo = ?
             AND epoch = ?",
        )?;

        let pkg_id: Option<i64> = stmt
            .query_row(
                params![name, arch, version, release, repo, epoch.unwrap_or(0)],
                |row| row.get(0),
            )
            .optional()?;

        Ok(pkg_id)
    }

    /// Packages in scope, ordered by name, arch, repo
    pub fn packages(&self, scope: RepoScope<'_>) -> Result<Vec<PackageRecord>> {
        self.packages_matching(scope, "")
    }

    /// Packages in scope whose name could match a pattern starting with `prefix`
    ///
    /// Returns a superset: either the name starts with the prefix or the prefix
    /// starts with the name (patterns like `foo-1.0*` name the package `foo`).
    pub fn packages_matching(&self, scope: RepoScope<'_>, prefix: &str) -> Result<Vec<PackageRecord>> {
        let (scope_sql, scope_arg) = match scope {
            RepoScope::All => ("1 = 1", None),
            RepoScope::Installed => ("repo = ?1", Some(INSTALLED_REPO)),
            RepoScope::Available => ("repo != ?1", Some(INSTALLED_REPO)),
            RepoScope::Repo(repo) => ("repo = ?1", Some(repo)),
        };
        let sql = format!(
            "SELECT {} FROM packages
             WHERE {} AND (?2 = '' OR name LIKE ?3 ESCAPE '\\' OR substr(?2, 1, length(name)) = name)
             ORDER BY name, arch, repo, pkg_id",
            PACKAGE_COLUMNS, scope_sql
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let like = format!("{}%", escape_like(prefix));
        let packages = stmt
            .query_map(
                params![scope_arg.unwrap_or(""), prefix, like],
                Self::row_to_package,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(packages)
    }

    /// Changelogs of a package, newest first
    pub fn changelogs_for(&self, pkg_id: i64) -> Result<Vec<ChangelogEntry>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT author, date, text FROM changelogs WHERE pkg_id = ? ORDER BY date DESC, id",
        )?;

        let entries = stmt
            .query_map([pkg_id], |row| {
                Ok(RpmChangelog {
                    author: row.get(0)?,
                    date: row.get(1)?,
                    text: row.get(2)?,
                })
            })?
            .map(|raw| raw.map(ChangelogEntry::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    pub fn count_packages(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM packages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_package(row: &Row<'_>) -> rusqlite::Result<PackageRecord> {
        let epoch: i64 = row.get(2)?;
        let identity = PackageIdentity::new(
            row.get::<_, String>(1)?,
            epoch.to_string(),
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        );
        let download_size: Option<i64> = row.get(11)?;
        let install_size: Option<i64> = row.get(12)?;

        Ok(PackageRecord {
            pkg_id: Some(row.get(0)?),
            identity,
            repo: row.get(6)?,
            summary: row.get(7)?,
            description: row.get(8)?,
            url: row.get(9)?,
            license: row.get(10)?,
            download_size: download_size.map(|s| s.max(0) as u64),
            install_size: install_size.map(|s| s.max(0) as u64),
            changelog: None,
        })
    }
}

/// Escape SQL LIKE special characters (used with `ESCAPE '\'`)
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
