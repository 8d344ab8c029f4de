//! Installed worker versions, one row per script path.

use super::connection::CacheDb;
use crate::Error;
use serde::Serialize;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// The version a worker script last installed successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InstalledVersion {
    pub script_path: String,
    pub scope: String,
    /// Static store of the installed version; it names the cache version.
    pub static_store: String,
    pub installed_at: String,
}

impl CacheDb {
    /// Record that `script_path` installed the version owning `static_store`.
    pub async fn record_install(&self, script_path: &str, scope: &str, static_store: &str) -> Result<(), Error> {
        let script_path = script_path.to_string();
        let scope = scope.to_string();
        let static_store = static_store.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO worker_registrations (script_path, scope, static_store, installed_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(script_path) DO UPDATE SET
                        scope = excluded.scope,
                        static_store = excluded.static_store,
                        installed_at = excluded.installed_at",
                    params![script_path, scope, static_store, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The version `script_path` last installed, if any.
    pub async fn installed_version(&self, script_path: &str) -> Result<Option<InstalledVersion>, Error> {
        let script_path = script_path.to_string();
        self.conn
            .call(move |conn| -> Result<Option<InstalledVersion>, Error> {
                let row = conn
                    .query_row(
                        "SELECT script_path, scope, static_store, installed_at
                         FROM worker_registrations WHERE script_path = ?1",
                        params![script_path],
                        |row| {
                            Ok(InstalledVersion {
                                script_path: row.get(0)?,
                                scope: row.get(1)?,
                                static_store: row.get(2)?,
                                installed_at: row.get(3)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_installed_version_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.installed_version("/service-worker.js").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_install_replaces_previous_version() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.record_install("/service-worker.js", "/", "soci-app-static-v4").await.unwrap();
        db.record_install("/service-worker.js", "/", "soci-app-static-v5").await.unwrap();

        let installed = db.installed_version("/service-worker.js").await.unwrap().unwrap();
        assert_eq!(installed.static_store, "soci-app-static-v5");
        assert_eq!(installed.scope, "/");
    }

    #[tokio::test]
    async fn test_versions_tracked_per_script() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.record_install("/service-worker.js", "/", "soci-app-static-v5").await.unwrap();

        assert!(db.installed_version("/admin/service-worker.js").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_stores_keeps_registrations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.record_install("/service-worker.js", "/", "soci-app-static-v5").await.unwrap();
        db.open_store("soci-app-static-v5").await.unwrap();

        db.clear_stores().await.unwrap();

        assert!(db.installed_version("/service-worker.js").await.unwrap().is_some());
    }
}
