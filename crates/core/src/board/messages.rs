//! Message CRUD operations.

use super::connection::BoardDb;
use super::now;
use crate::Error;
use crate::cache::DocumentMetadata;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Normal,
    /// Read-only lookup request for another collaborator.
    Task,
    Question,
    Urgent,
    /// Long-lived notes: pitfalls, conventions, decisions.
    Knowledge,
}

impl MessageType {
    pub const ALL: [MessageType; 5] =
        [MessageType::Normal, MessageType::Task, MessageType::Question, MessageType::Urgent, MessageType::Knowledge];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Normal => "normal",
            MessageType::Task => "task",
            MessageType::Question => "question",
            MessageType::Urgent => "urgent",
            MessageType::Knowledge => "knowledge",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|t| t.as_str() == s).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unknown message type '{s}', expected one of: normal, task, question, urgent, knowledge"
            ))
        })
    }
}

/// Who wrote or edited a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub role: String,
}

/// A new message before it is assigned an id.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub summary: String,
    pub content: String,
    pub mentions: Vec<String>,
    pub message_type: MessageType,
    pub author: Author,
    pub document: DocumentMetadata,
}

/// Fields changed by an edit; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct MessageEdit {
    pub summary: Option<String>,
    pub content: Option<String>,
    pub mentions: Option<Vec<String>>,
    pub message_type: Option<MessageType>,
}

impl MessageEdit {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.content.is_none() && self.mentions.is_none() && self.message_type.is_none()
    }
}

/// A stored message. Ids are unique per project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub project_id: String,
    pub id: i64,
    pub summary: String,
    pub content: String,
    pub mentions: Vec<String>,
    pub message_type: MessageType,
    pub author_name: String,
    pub author_role: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub updated_by_name: Option<String>,
    pub updated_by_role: Option<String>,
    pub document: DocumentMetadata,
}

impl Message {
    pub fn is_edited(&self) -> bool {
        self.updated_at.is_some()
    }

    /// Key messages are grouped by: project and document.
    pub fn group_key(&self) -> (String, Option<String>) {
        (self.project_id.clone(), self.document.doc_id.clone())
    }
}

/// Listing criteria; every field narrows the result.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Restrict to one project; all projects when `None`.
    pub project_id: Option<String>,
    pub message_type: Option<MessageType>,
    /// Matched against summary and content.
    pub search: Option<Regex>,
    pub limit: Option<usize>,
}

const SELECT_COLUMNS: &str = "project_id, id, summary, content, mentions_json, message_type,
    author_name, author_role, created_at, updated_at, updated_by_name, updated_by_role,
    project_name, folder_name, doc_id, doc_name, doc_type, doc_version, doc_updated_at, doc_url";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let project_id: String = row.get(0)?;
    let mentions_json: String = row.get(4)?;
    let message_type: String = row.get(5)?;

    Ok(Message {
        id: row.get(1)?,
        summary: row.get(2)?,
        content: row.get(3)?,
        mentions: serde_json::from_str(&mentions_json).unwrap_or_default(),
        message_type: message_type.parse().unwrap_or_default(),
        author_name: row.get(6)?,
        author_role: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        updated_by_name: row.get(10)?,
        updated_by_role: row.get(11)?,
        document: DocumentMetadata {
            project_id: Some(project_id.clone()),
            project_name: row.get(12)?,
            folder_name: row.get(13)?,
            doc_id: row.get(14)?,
            doc_name: row.get(15)?,
            doc_type: row.get(16)?,
            doc_version: row.get(17)?,
            doc_updated_at: row.get(18)?,
            doc_url: row.get(19)?,
        },
        project_id,
    })
}

fn encode_mentions(mentions: &[String]) -> Result<String, Error> {
    serde_json::to_string(mentions).map_err(|e| Error::InvalidInput(e.to_string()))
}

impl BoardDb {
    /// Store a new message under the next id of `project_id`.
    pub async fn post_message(&self, project_id: &str, message: NewMessage) -> Result<Message, Error> {
        let project_id = project_id.to_string();
        let mentions_json = encode_mentions(&message.mentions)?;
        let created_at = now();

        let stored = self
            .conn
            .call(move |conn| -> Result<Message, Error> {
                let tx = conn.transaction()?;

                tx.execute(
                    "INSERT INTO project_counters (project_id, next_id) VALUES (?1, 1)
                     ON CONFLICT(project_id) DO NOTHING",
                    params![project_id],
                )?;
                let id: i64 = tx.query_row(
                    "SELECT next_id FROM project_counters WHERE project_id = ?1",
                    params![project_id],
                    |row| row.get(0),
                )?;
                tx.execute(
                    "UPDATE project_counters SET next_id = next_id + 1 WHERE project_id = ?1",
                    params![project_id],
                )?;

                let doc = &message.document;
                tx.execute(
                    "INSERT INTO messages (
                        project_id, id, summary, content, mentions_json, message_type,
                        author_name, author_role, created_at,
                        project_name, folder_name, doc_id, doc_name, doc_type, doc_version, doc_updated_at, doc_url
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                    params![
                        project_id,
                        id,
                        message.summary,
                        message.content,
                        mentions_json,
                        message.message_type.as_str(),
                        message.author.name,
                        message.author.role,
                        created_at,
                        doc.project_name,
                        doc.folder_name,
                        doc.doc_id,
                        doc.doc_name,
                        doc.doc_type,
                        doc.doc_version,
                        doc.doc_updated_at,
                        doc.doc_url,
                    ],
                )?;
                tx.commit()?;

                Ok(Message {
                    project_id: project_id.clone(),
                    id,
                    summary: message.summary,
                    content: message.content,
                    mentions: message.mentions,
                    message_type: message.message_type,
                    author_name: message.author.name,
                    author_role: message.author.role,
                    created_at,
                    updated_at: None,
                    updated_by_name: None,
                    updated_by_role: None,
                    document: DocumentMetadata { project_id: Some(project_id), ..message.document },
                })
            })
            .await
            .map_err(Error::from)?;

        tracing::info!(project_id = %stored.project_id, id = stored.id, message_type = %stored.message_type, "message posted");
        Ok(stored)
    }

    /// Get a message by project and id.
    ///
    /// Returns None if the message doesn't exist.
    pub async fn get_message(&self, project_id: &str, id: i64) -> Result<Option<Message>, Error> {
        let project_id = project_id.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Message>, Error> {
                let sql = format!("SELECT {SELECT_COLUMNS} FROM messages WHERE project_id = ?1 AND id = ?2");
                let message = conn.query_row(&sql, params![project_id, id], row_to_message).optional()?;
                Ok(message)
            })
            .await
            .map_err(Error::from)
    }

    /// Messages matching `filter`, newest first.
    pub async fn list_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>, Error> {
        let project_id = filter.project_id.clone();
        let message_type = filter.message_type.map(|t| t.as_str().to_string());

        let messages = self
            .conn
            .call(move |conn| -> Result<Vec<Message>, Error> {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM messages
                     WHERE (?1 IS NULL OR project_id = ?1) AND (?2 IS NULL OR message_type = ?2)
                     ORDER BY created_at DESC, rowid DESC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![project_id, message_type], row_to_message)?;
                let messages = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(messages)
            })
            .await
            .map_err(Error::from)?;

        let matched = messages.into_iter().filter(|m| match &filter.search {
            Some(re) => re.is_match(&m.summary) || re.is_match(&m.content),
            None => true,
        });

        Ok(match filter.limit {
            Some(limit) => matched.take(limit).collect(),
            None => matched.collect(),
        })
    }

    /// Apply `edit` and record the editor. Returns None if the message doesn't exist.
    pub async fn update_message(
        &self, project_id: &str, id: i64, edit: MessageEdit, editor: &Author,
    ) -> Result<Option<Message>, Error> {
        let key = project_id.to_string();
        let mentions_json = edit.mentions.as_deref().map(encode_mentions).transpose()?;
        let message_type = edit.message_type.map(|t| t.as_str().to_string());
        let editor = editor.clone();
        let updated_at = now();

        let changed = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let changed = conn.execute(
                    "UPDATE messages SET
                        summary = COALESCE(?3, summary),
                        content = COALESCE(?4, content),
                        mentions_json = COALESCE(?5, mentions_json),
                        message_type = COALESCE(?6, message_type),
                        updated_at = ?7,
                        updated_by_name = ?8,
                        updated_by_role = ?9
                     WHERE project_id = ?1 AND id = ?2",
                    params![
                        key,
                        id,
                        edit.summary,
                        edit.content,
                        mentions_json,
                        message_type,
                        updated_at,
                        editor.name,
                        editor.role
                    ],
                )?;
                Ok(changed)
            })
            .await
            .map_err(Error::from)?;

        if changed == 0 {
            return Ok(None);
        }
        tracing::info!(project_id, id, "message edited");
        self.get_message(project_id, id).await
    }

    /// Delete a message. Returns whether it existed.
    pub async fn delete_message(&self, project_id: &str, id: i64) -> Result<bool, Error> {
        let key = project_id.to_string();
        let deleted = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                Ok(conn.execute("DELETE FROM messages WHERE project_id = ?1 AND id = ?2", params![key, id])?)
            })
            .await
            .map_err(Error::from)?;

        if deleted > 0 {
            tracing::info!(project_id, id, "message deleted");
        }
        Ok(deleted > 0)
    }
}
