//! Webhook notifications for board messages.
//!
//! Posting a message that mentions someone sends a rich-text `post` payload to
//! an incoming webhook (Feishu bot format). Delivery runs on a spawned task;
//! its outcome is only logged and never affects the post itself.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{Value, json};

use lanhu_core::board::Message;
use lanhu_core::{AppConfig, Error};

/// Maximum characters of message content included in a notification.
const MAX_CONTENT_CHARS: usize = 500;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends board notifications to a configured webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    webhook_url: String,
    directory: BTreeMap<String, String>,
}

impl WebhookNotifier {
    pub fn new(webhook_url: impl Into<String>, directory: BTreeMap<String, String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(|e| Error::NotifyFailed(e.to_string()))?;
        Ok(Self { http, webhook_url: webhook_url.into(), directory })
    }

    /// Notifier for the configured webhook, or `None` when notifications are off.
    pub fn from_app(config: &AppConfig) -> Result<Option<Self>, Error> {
        match config.webhook_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Ok(Some(Self::new(url, config.mention_directory.clone())?)),
            None => Ok(None),
        }
    }

    /// Names that can be mentioned, in directory order.
    pub fn known_names(&self) -> impl Iterator<Item = &str> {
        self.directory.keys().map(String::as_str)
    }

    /// Rich-text payload for `message`, or `None` when nobody is mentioned.
    pub fn build_payload(&self, message: &Message) -> Option<Value> {
        if message.mentions.is_empty() {
            return None;
        }

        let mut lines = vec![
            vec![text_node(format!("Author: {} ({})\n", message.author_name, message.author_role))],
            vec![text_node(format!("Type: {}\n", message.message_type))],
        ];

        let user_ids: Vec<&str> =
            message.mentions.iter().filter_map(|name| self.directory.get(name)).map(String::as_str).collect();
        if !user_ids.is_empty() {
            let mut line = vec![text_node("Mentions: ")];
            for user_id in user_ids {
                line.push(json!({"tag": "at", "user_id": user_id}));
                line.push(text_node(" "));
            }
            line.push(text_node("\n"));
            lines.push(line);
        }

        if let Some(project) = &message.document.project_name {
            lines.push(vec![text_node(format!("Project: {project}\n"))]);
        }
        if let Some(doc) = &message.document.doc_name {
            lines.push(vec![text_node(format!("Document: {doc}\n"))]);
        }

        lines.push(vec![text_node(format!("\nContent:\n{}\n", preview(&message.content)))]);

        if let Some(url) = &message.document.doc_url {
            lines.push(vec![text_node("\n"), json!({"tag": "a", "text": "Open document", "href": url})]);
        }

        Some(json!({
            "msg_type": "post",
            "content": {
                "post": {
                    "zh_cn": {
                        "title": message.summary,
                        "content": lines,
                    }
                }
            }
        }))
    }

    /// Fire-and-forget delivery. Returns whether a notification was dispatched.
    pub fn notify(&self, message: &Message) -> bool {
        let Some(payload) = self.build_payload(message) else {
            return false;
        };

        let http = self.http.clone();
        let url = self.webhook_url.clone();
        let project_id = message.project_id.clone();
        let id = message.id;
        tokio::spawn(async move {
            match deliver(&http, &url, &payload).await {
                Ok(()) => tracing::info!(project_id = %project_id, message_id = id, "board notification sent"),
                Err(e) => tracing::warn!(project_id = %project_id, message_id = id, error = %e, "board notification failed"),
            }
        });
        true
    }
}

async fn deliver(http: &reqwest::Client, url: &str, payload: &Value) -> Result<(), Error> {
    let response = http.post(url).json(payload).send().await.map_err(|e| Error::NotifyFailed(e.to_string()))?;
    let body: Value = response.json().await.map_err(|e| Error::NotifyFailed(e.to_string()))?;

    match body.get("code").and_then(Value::as_i64) {
        Some(0) => Ok(()),
        _ => Err(Error::NotifyFailed(body.to_string())),
    }
}

fn text_node(text: impl Into<String>) -> Value {
    json!({"tag": "text", "text": text.into()})
}

/// Plain-text preview of message content, truncated to [`MAX_CONTENT_CHARS`].
fn preview(content: &str) -> String {
    let plain = plain_text(&Value::String(content.to_string()));
    match plain.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((idx, _)) => format!("{}...", &plain[..idx]),
        None => plain,
    }
}

/// Flatten rich-text JSON into plain text: strings that parse as JSON are
/// descended into, arrays are joined by spaces, objects contribute `text`.
fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ (Value::Array(_) | Value::Object(_))) => plain_text(&parsed),
            _ => s.clone(),
        },
        Value::Array(items) => items.iter().map(plain_text).filter(|t| !t.is_empty()).collect::<Vec<_>>().join(" "),
        Value::Object(map) => map.get("text").map(plain_text).unwrap_or_default(),
        Value::Null | Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanhu_core::DocumentMetadata;
    use lanhu_core::board::MessageType;

    fn notifier() -> WebhookNotifier {
        let directory = BTreeMap::from([("alice".to_string(), "ou_alice".to_string())]);
        WebhookNotifier::new("http://127.0.0.1:9/hook", directory).unwrap()
    }

    fn message(mentions: &[&str], content: &str) -> Message {
        Message {
            project_id: "p1".into(),
            id: 3,
            summary: "Login flow changed".into(),
            content: content.into(),
            mentions: mentions.iter().map(|m| m.to_string()).collect(),
            message_type: MessageType::Task,
            author_name: "bob".into(),
            author_role: "backend".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: None,
            updated_by_name: None,
            updated_by_role: None,
            document: DocumentMetadata {
                project_name: Some("Shop".into()),
                doc_name: Some("PRD".into()),
                doc_url: Some("https://lanhuapp.com/web/#/doc".into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_no_mentions_no_payload() {
        assert!(notifier().build_payload(&message(&[], "hi")).is_none());
    }

    #[test]
    fn test_payload_shape() {
        let payload = notifier().build_payload(&message(&["alice", "carol"], "please check")).unwrap();
        assert_eq!(payload["msg_type"], "post");

        let post = &payload["content"]["post"]["zh_cn"];
        assert_eq!(post["title"], "Login flow changed");

        let lines = post["content"].as_array().unwrap();
        let mention_line = lines[2].as_array().unwrap();
        let ats: Vec<_> = mention_line.iter().filter(|n| n["tag"] == "at").collect();
        assert_eq!(ats.len(), 1);
        assert_eq!(ats[0]["user_id"], "ou_alice");

        let last = lines.last().unwrap().as_array().unwrap();
        assert_eq!(last[1]["href"], "https://lanhuapp.com/web/#/doc");
    }

    #[test]
    fn test_unknown_mentions_still_notify_without_at_line() {
        let payload = notifier().build_payload(&message(&["carol"], "hello")).unwrap();
        let lines = payload["content"]["post"]["zh_cn"]["content"].as_array().unwrap().clone();
        assert!(lines.iter().flat_map(|l| l.as_array().unwrap()).all(|n| n["tag"] != "at"));
    }

    #[test]
    fn test_plain_text_from_rich_content() {
        let rich = r#"[{"text": "first"}, {"children": []}, [{"text": "second"}], "third"]"#;
        assert_eq!(plain_text(&Value::String(rich.into())), "first second third");
        assert_eq!(plain_text(&Value::String("just text".into())), "just text");
        assert_eq!(plain_text(&Value::String("42".into())), "42");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "需".repeat(600);
        let preview = preview(&long);
        assert_eq!(preview.chars().count(), MAX_CONTENT_CHARS + 3);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_from_app_disabled_without_url() {
        assert!(WebhookNotifier::from_app(&AppConfig::default()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_notify_dispatches_only_with_mentions() {
        let notifier = notifier();
        assert!(!notifier.notify(&message(&[], "x")));
        assert!(notifier.notify(&message(&["alice"], "x")));
    }
}
