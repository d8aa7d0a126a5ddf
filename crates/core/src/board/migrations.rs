//! Board schema migrations.
//!
//! Applied versions are tracked in `_migrations`; each pending migration runs
//! in its own transaction together with its bookkeeping row.

use crate::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered (version, SQL) pairs. Versions must increase.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_messages.sql")),
    (2, include_str!("../../migrations/002_collaborators.sql")),
];

/// Apply every migration newer than the recorded schema version.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute; the failing
/// migration is rolled back and later ones are not attempted.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    let applied = conn
        .call(|conn| -> Result<Vec<i64>, Error> {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL
                )",
                [],
            )?;

            let current: i64 =
                conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

            let mut applied = Vec::new();
            for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
                let tx = conn.transaction()?;
                tx.execute_batch(sql).map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
                tx.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version, chrono::Utc::now().to_rfc3339()],
                )?;
                tx.commit()?;
                applied.push(*version);
            }

            Ok(applied)
        })
        .await
        .map_err(Error::from)?;

    if !applied.is_empty() {
        tracing::info!(versions = ?applied, "applied board migrations");
    }
    Ok(())
}
