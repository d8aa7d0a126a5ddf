//! Team message board tools.
//!
//! Every board tool takes a Lanhu URL naming at least the team and project,
//! and records the calling user as a collaborator of that project.

pub mod delete;
pub mod detail;
pub mod edit;
pub mod list;
pub mod members;
pub mod say;

pub use delete::{SayDeleteParams, delete_impl};
pub use detail::{SayDetailParams, detail_impl};
pub use edit::{SayEditParams, edit_impl};
pub use list::{SayListParams, list_impl};
pub use members::members_impl;
pub use say::{SayParams, say_impl};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lanhu_client::DocumentUrl;
use lanhu_core::board::{EVERYONE, MessageType};
use lanhu_core::{AppConfig, Error};

use crate::state::AppState;

/// Parameters for tools that only need a project URL.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UrlParams {
    /// Lanhu URL containing tid and pid.
    pub url: String,
}

pub(crate) fn parse_message_type(raw: Option<&str>) -> Result<Option<MessageType>, Error> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::parse).transpose()
}

/// Mentions must name someone from the mention directory, or everyone.
/// With an empty directory any non-empty name is accepted.
pub(crate) fn validate_mentions(config: &AppConfig, mentions: &[String]) -> Result<(), Error> {
    let invalid: Vec<&str> = mentions
        .iter()
        .map(String::as_str)
        .filter(|m| {
            m.trim().is_empty()
                || !(EVERYONE.contains(m)
                    || config.mention_directory.is_empty()
                    || config.mention_directory.contains_key(*m))
        })
        .collect();

    if invalid.is_empty() {
        return Ok(());
    }

    let mut valid: Vec<&str> = config.mention_directory.keys().map(String::as_str).collect();
    valid.extend_from_slice(EVERYONE);
    Err(Error::InvalidInput(format!(
        "unknown mentions: {}; valid names: {}",
        invalid.join(", "),
        valid.join(", ")
    )))
}

/// Record the caller on the project's board. A failure is logged, not returned.
pub(crate) async fn record_activity(state: &AppState, project_id: &str) {
    let author = state.author();
    if let Err(e) = state.board.record_collaborator(project_id, &author.name, &author.role).await {
        tracing::warn!(project_id, error = %e, "failed to record collaborator");
    }
}

pub(crate) fn project_url(raw_url: &str) -> Result<DocumentUrl, Error> {
    Ok(DocumentUrl::parse(raw_url)?)
}
