//! Viewer-specific projections of board messages.

use serde::Serialize;

use super::messages::{Message, MessageType};
use super::roles::mentions_me;
use crate::cache::DocumentMetadata;

/// Identity of the user reading the board.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub name: String,
    pub role: String,
}

impl Viewer {
    pub fn is_mentioned(&self, message: &Message) -> bool {
        mentions_me(&message.mentions, &self.name, &self.role)
    }
}

/// A message as shown in listings: no content, no document metadata.
#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub id: i64,
    pub summary: String,
    pub message_type: MessageType,
    pub mentions: Vec<String>,
    pub author_name: String,
    pub author_role: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by_role: Option<String>,
    pub is_edited: bool,
    pub is_mine: bool,
    pub mentions_me: bool,
}

impl MessageSummary {
    pub fn new(message: &Message, viewer: &Viewer) -> Self {
        Self {
            id: message.id,
            summary: message.summary.clone(),
            message_type: message.message_type,
            mentions: message.mentions.clone(),
            author_name: message.author_name.clone(),
            author_role: message.author_role.clone(),
            created_at: message.created_at.clone(),
            updated_at: message.updated_at.clone(),
            updated_by_name: message.updated_by_name.clone(),
            updated_by_role: message.updated_by_role.clone(),
            is_edited: message.is_edited(),
            is_mine: message.author_name == viewer.name,
            mentions_me: viewer.is_mentioned(message),
        }
    }
}

/// Messages of one (project, document) pair; the metadata appears once.
#[derive(Debug, Clone, Serialize)]
pub struct MessageGroup {
    #[serde(flatten)]
    pub document: DocumentMetadata,
    pub message_count: usize,
    pub mentions_me_count: usize,
    pub messages: Vec<MessageSummary>,
}

/// Group newest-first `messages` by project and document.
///
/// Groups are ordered by their newest message; each group's metadata comes
/// from its newest message.
pub fn group_messages(messages: &[Message], viewer: &Viewer) -> Vec<MessageGroup> {
    let mut groups: Vec<((String, Option<String>), MessageGroup)> = Vec::new();

    for message in messages {
        let key = message.group_key();
        let summary = MessageSummary::new(message, viewer);
        let idx = match groups.iter().position(|(k, _)| *k == key) {
            Some(idx) => idx,
            None => {
                groups.push((
                    key,
                    MessageGroup {
                        document: message.document.clone(),
                        message_count: 0,
                        mentions_me_count: 0,
                        messages: Vec::new(),
                    },
                ));
                groups.len() - 1
            }
        };

        let group = &mut groups[idx].1;
        group.message_count += 1;
        if summary.mentions_me {
            group.mentions_me_count += 1;
        }
        group.messages.push(summary);
    }

    groups.into_iter().map(|(_, group)| group).collect()
}
