//! Paste records, submission payloads and API views.

use crate::config::str2bool;
use crate::ids::Visibility;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Length of the parent name kept in a fork title.
const FORK_TITLE_PARENT_CHARS: usize = 32;

/// A stored paste, serialized as JSON under `paste:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paste {
    pub code: String,
    pub name: String,
    pub syntax: String,
    #[serde(deserialize_with = "bool_like")]
    pub private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forked_from: Option<String>,
    /// Submitter address; never exposed through views.
    #[serde(default)]
    pub origin_addr: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Paste {
    /// Visibility derived from the `private` flag.
    pub fn visibility(&self) -> Visibility {
        if self.private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }
}

/// A form or JSON scalar before it is interpreted.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Text(String),
    Number(i64),
}

/// Accept both JSON booleans and the legacy `"0"`/`"1"` strings.
fn bool_like<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Bool(value) => value,
        Scalar::Text(value) => str2bool(&value),
        Scalar::Number(value) => value != 0,
    })
}

/// Keep form fields as text while letting JSON clients send booleans and
/// numbers: `true` becomes `"1"`, `60` becomes `"60"`.
fn text_like<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Bool(value) => if value { "1" } else { "0" }.to_string(),
        Scalar::Text(value) => value,
        Scalar::Number(value) => value.to_string(),
    })
}

fn default_private() -> String {
    "0".to_string()
}

/// Submission payload, shared by the web form, CLI posts and the JSON API.
///
/// `phone` is a honeypot: real users never see it, so any value marks a bot.
/// `webform` is set by the HTML form only; its absence means a CLI post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitPasteRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub syntax: String,
    #[serde(default = "default_private", deserialize_with = "text_like")]
    pub private: String,
    #[serde(default)]
    pub forked_from: String,
    #[serde(default, alias = "g-recaptcha-response")]
    pub recaptcha_answer: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub webform: String,
    /// Optional client-chosen lifetime in minutes.
    #[serde(default, deserialize_with = "text_like")]
    pub ttl: String,
}

impl SubmitPasteRequest {
    /// Trim every field except `code`, which is stored verbatim.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.syntax,
            &mut self.private,
            &mut self.forked_from,
            &mut self.recaptcha_answer,
            &mut self.phone,
            &mut self.webform,
            &mut self.ttl,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }
        self
    }

    /// Whether the HTML form (rather than a script) submitted this paste.
    pub fn is_web_form(&self) -> bool {
        !self.webform.is_empty()
    }

    pub fn is_private(&self) -> bool {
        str2bool(&self.private)
    }

    pub fn visibility(&self) -> Visibility {
        if self.is_private() {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    pub fn forked_from(&self) -> Option<&str> {
        Some(self.forked_from.as_str()).filter(|parent| !parent.is_empty())
    }

    /// Build the record to persist.
    pub fn into_paste(self, origin_addr: String) -> Paste {
        let private = self.is_private();
        let forked_from = self.forked_from().map(str::to_string);
        Paste {
            code: self.code,
            name: self.name,
            syntax: self.syntax,
            private,
            forked_from,
            origin_addr,
            created_at: Utc::now(),
        }
    }
}

/// Public view of a paste; omits the submitter address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasteView {
    pub id: String,
    pub code: String,
    pub name: String,
    pub syntax: String,
    pub private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forked_from: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PasteView {
    pub fn new(id: &str, paste: Paste) -> Self {
        Self {
            id: id.to_string(),
            code: paste.code,
            name: paste.name,
            syntax: paste.syntax,
            private: paste.private,
            forked_from: paste.forked_from,
            created_at: paste.created_at,
        }
    }
}

/// Pre-filled submission form for forking an existing paste.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForkDraft {
    /// Parent id, submitted back as `forked_from`.
    pub paste_id: String,
    pub title: String,
    pub code: String,
    pub syntax: String,
    /// `"0"` or `"1"`, matching the form field.
    pub private: String,
    /// Left empty: the forker names themselves.
    pub name: String,
}

impl ForkDraft {
    pub fn from_parent(parent_id: &str, parent: Paste) -> Self {
        Self {
            paste_id: parent_id.to_string(),
            title: fork_title(&parent.name),
            code: parent.code,
            syntax: parent.syntax,
            private: if parent.private { "1" } else { "0" }.to_string(),
            name: String::new(),
        }
    }
}

/// `"re: "` followed by at most 32 characters of the parent name.
pub fn fork_title(parent_name: &str) -> String {
    let truncated: String = parent_name.chars().take(FORK_TITLE_PARENT_CHARS).collect();
    format!("re: {}", truncated)
}

/// Create-response for JSON/CLI clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedPaste {
    pub id: String,
    pub url: String,
}
