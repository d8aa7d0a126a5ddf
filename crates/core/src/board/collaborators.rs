//! People who have posted on a project's board.

use super::connection::BoardDb;
use super::now;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Collaborator {
    pub name: String,
    pub role: String,
    pub first_seen: String,
    pub last_seen: String,
}

impl BoardDb {
    /// Record that `name` acting as `role` was active on the project.
    ///
    /// Empty names or roles are ignored.
    pub async fn record_collaborator(&self, project_id: &str, name: &str, role: &str) -> Result<(), Error> {
        if name.trim().is_empty() || role.trim().is_empty() {
            return Ok(());
        }

        let (project_id, name, role) = (project_id.to_string(), name.to_string(), role.to_string());
        let seen = now();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO collaborators (project_id, name, role, first_seen, last_seen)
                    VALUES (?1, ?2, ?3, ?4, ?4)
                    ON CONFLICT(project_id, name, role) DO UPDATE SET last_seen = excluded.last_seen",
                    params![project_id, name, role, seen],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Collaborators of a project in the order they first appeared.
    pub async fn collaborators(&self, project_id: &str) -> Result<Vec<Collaborator>, Error> {
        let project_id = project_id.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<Collaborator>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT name, role, first_seen, last_seen FROM collaborators
                     WHERE project_id = ?1 ORDER BY first_seen, rowid",
                )?;
                let rows = stmt.query_map(params![project_id], |row| {
                    Ok(Collaborator {
                        name: row.get(0)?,
                        role: row.get(1)?,
                        first_seen: row.get(2)?,
                        last_seen: row.get(3)?,
                    })
                })?;
                let collaborators = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(collaborators)
            })
            .await
            .map_err(Error::from)
    }
}
