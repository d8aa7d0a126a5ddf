//! Lanhu document URL parsing.
//!
//! Accepted forms:
//! - `https://lanhuapp.com/web/#/item/project/product?tid=..&pid=..&docId=..`
//!   (parameters live in the fragment)
//! - `?tid=..&pid=..`
//! - `tid=..&pid=..`

use std::collections::HashMap;

/// Error type for document URL parsing failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    Invalid(String),

    #[error("Lanhu URL has no fragment part")]
    MissingFragment,

    #[error("missing required parameter {param} ({meaning})")]
    MissingParam { param: &'static str, meaning: &'static str },
}

impl From<UrlError> for lanhu_core::Error {
    fn from(err: UrlError) -> Self {
        lanhu_core::Error::InvalidUrl(err.to_string())
    }
}

/// Identifiers extracted from a document URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUrl {
    pub team_id: String,
    pub project_id: String,
    pub doc_id: Option<String>,
    pub version_id: Option<String>,
}

impl DocumentUrl {
    /// Parse any of the accepted URL forms.
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(UrlError::Empty);
        }

        let query = if trimmed.starts_with("http") {
            let parsed = url::Url::parse(trimmed).map_err(|e| UrlError::Invalid(e.to_string()))?;
            let fragment = parsed.fragment().filter(|f| !f.is_empty()).ok_or(UrlError::MissingFragment)?;
            match fragment.split_once('?') {
                Some((_, query)) => query.to_string(),
                None => fragment.to_string(),
            }
        } else {
            trimmed.trim_start_matches('?').to_string()
        };

        let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let project_id = params
            .get("pid")
            .cloned()
            .ok_or(UrlError::MissingParam { param: "pid", meaning: "project_id" })?;
        let team_id =
            params.get("tid").cloned().ok_or(UrlError::MissingParam { param: "tid", meaning: "team_id" })?;
        let doc_id = params.get("docId").or_else(|| params.get("image_id")).cloned();
        let version_id = params.get("versionId").cloned();

        Ok(Self { team_id, project_id, doc_id, version_id })
    }

    /// Document id, for operations that need one.
    pub fn require_doc(&self) -> Result<&str, UrlError> {
        self.doc_id.as_deref().ok_or(UrlError::MissingParam { param: "docId", meaning: "document id" })
    }

    /// Web URL of the project's design stage.
    pub fn stage_url(&self, base_url: &str) -> String {
        format!(
            "{}/web/#/item/project/stage?tid={}&pid={}",
            base_url.trim_end_matches('/'),
            self.team_id,
            self.project_id
        )
    }

    /// Canonical web URL of the document.
    pub fn web_url(&self, base_url: &str) -> Option<String> {
        let doc_id = self.doc_id.as_deref()?;
        Some(format!(
            "{}/web/#/item/project/product?tid={}&pid={}&docId={}",
            base_url.trim_end_matches('/'),
            self.team_id,
            self.project_id,
            doc_id
        ))
    }
}

/// An absolute http(s) invite or share link, returned trimmed.
pub fn parse_invite(input: &str) -> Result<String, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = url::Url::parse(trimmed).map_err(|e| UrlError::Invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UrlError::Invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        let url = DocumentUrl::parse(
            "https://lanhuapp.com/web/#/item/project/product?tid=t-1&pid=p-1&docId=d-1&versionId=v-1",
        )
        .unwrap();
        assert_eq!(url.team_id, "t-1");
        assert_eq!(url.project_id, "p-1");
        assert_eq!(url.doc_id.as_deref(), Some("d-1"));
        assert_eq!(url.version_id.as_deref(), Some("v-1"));
    }

    #[test]
    fn test_parse_bare_params() {
        let url = DocumentUrl::parse("?tid=t&pid=p&image_id=img").unwrap();
        assert_eq!(url.doc_id.as_deref(), Some("img"));

        let url = DocumentUrl::parse("tid=t&pid=p").unwrap();
        assert_eq!(url.doc_id, None);
        assert!(url.require_doc().is_err());
    }

    #[test]
    fn test_doc_id_preferred_over_image_id() {
        let url = DocumentUrl::parse("tid=t&pid=p&image_id=img&docId=doc").unwrap();
        assert_eq!(url.doc_id.as_deref(), Some("doc"));
    }

    #[test]
    fn test_missing_required_params() {
        assert_eq!(
            DocumentUrl::parse("tid=t&docId=d"),
            Err(UrlError::MissingParam { param: "pid", meaning: "project_id" })
        );
        assert_eq!(
            DocumentUrl::parse("pid=p"),
            Err(UrlError::MissingParam { param: "tid", meaning: "team_id" })
        );
        assert_eq!(DocumentUrl::parse("https://lanhuapp.com/web/"), Err(UrlError::MissingFragment));
        assert_eq!(DocumentUrl::parse("  "), Err(UrlError::Empty));
    }

    #[test]
    fn test_web_url() {
        let url = DocumentUrl::parse("tid=t&pid=p&docId=d").unwrap();
        assert_eq!(
            url.web_url("https://lanhuapp.com/").as_deref(),
            Some("https://lanhuapp.com/web/#/item/project/product?tid=t&pid=p&docId=d")
        );
    }

    #[test]
    fn test_error_maps_to_invalid_url() {
        let err: lanhu_core::Error = UrlError::MissingFragment.into();
        assert!(err.to_string().starts_with("INVALID_URL"));
    }

    #[test]
    fn test_stage_url() {
        let url = DocumentUrl::parse("tid=t&pid=p&docId=d").unwrap();
        assert_eq!(url.stage_url("https://lanhuapp.com/"), "https://lanhuapp.com/web/#/item/project/stage?tid=t&pid=p");
    }

    #[test]
    fn test_parse_invite() {
        assert_eq!(
            parse_invite(" https://lanhuapp.com/link/#/invite?sid=abc ").as_deref(),
            Ok("https://lanhuapp.com/link/#/invite?sid=abc")
        );
        assert_eq!(parse_invite(""), Err(UrlError::Empty));
        assert!(matches!(parse_invite("sid=abc"), Err(UrlError::Invalid(_))));
        assert!(matches!(parse_invite("file:///etc/passwd"), Err(UrlError::Invalid(_))));
    }
}
