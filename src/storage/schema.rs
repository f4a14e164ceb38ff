use crate::error::Result;
use rusqlite::Connection;

pub const SCHEMA_VERSION: i32 = 1;

pub struct Schema;

impl Schema {
    /// Initialize the package index schema
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS packages (
                pkg_id        INTEGER PRIMARY KEY,
                name          TEXT NOT NULL,
                epoch         INTEGER NOT NULL DEFAULT 0,
                version       TEXT NOT NULL,
                release       TEXT NOT NULL,
                arch          TEXT NOT NULL,
                repo          TEXT NOT NULL,
                summary       TEXT NOT NULL DEFAULT '',
                description   TEXT NOT NULL DEFAULT '',
                url           TEXT,
                license       TEXT,
                download_size INTEGER,
                install_size  INTEGER,
                checksum      TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_packages_name ON packages(name);
            CREATE INDEX IF NOT EXISTS idx_packages_repo ON packages(repo);

            CREATE TABLE IF NOT EXISTS changelogs (
                id      INTEGER PRIMARY KEY,
                pkg_id  INTEGER NOT NULL,
                author  TEXT NOT NULL,
                date    INTEGER NOT NULL,
                text    TEXT NOT NULL,
                FOREIGN KEY(pkg_id) REFERENCES packages(pkg_id)
            );
            CREATE INDEX IF NOT EXISTS idx_changelogs_pkg_id ON changelogs(pkg_id);

            CREATE TABLE IF NOT EXISTS metadata (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;

        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)",
            [SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// Schema version stored in the database, 0 when missing
    pub fn get_version(conn: &Connection) -> Result<i32> {
        let version: String = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap_or_default();
        Ok(version.parse().unwrap_or(0))
    }

    /// Drop tables written by an incompatible schema version
    pub fn migrate(conn: &Connection) -> Result<()> {
        let has_metadata: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'metadata'",
            [],
            |row| row.get(0),
        )?;
        if has_metadata && Self::get_version(conn)? != SCHEMA_VERSION {
            conn.execute_batch(
                "DROP TABLE IF EXISTS changelogs;
                 DROP TABLE IF EXISTS packages;
                 DROP TABLE IF EXISTS metadata;",
            )?;
        }
        Ok(())
    }
}
