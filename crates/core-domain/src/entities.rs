use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const PREVIEW_CHARS: usize = 150;
pub const ANALYSIS_BODY_CHARS: usize = 25_000;
pub const NO_SUBJECT: &str = "(no subject)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderType {
    Inbox,
    Sent,
    Drafts,
    Trash,
    Spam,
    Custom,
}

impl FolderType {
    /// Rank used by catalog ordering: inbox, then the well-known mail
    /// folders, then everything else.
    pub fn sort_rank(self) -> u8 {
        match self {
            Self::Inbox => 0,
            Self::Sent | Self::Drafts | Self::Trash => 1,
            Self::Spam | Self::Custom => 2,
        }
    }
}

impl fmt::Display for FolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbox => write!(f, "inbox"),
            Self::Sent => write!(f, "sent"),
            Self::Drafts => write!(f, "drafts"),
            Self::Trash => write!(f, "trash"),
            Self::Spam => write!(f, "spam"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderAttributes {
    #[serde(skip)]
    pub raw_attributes: BTreeSet<String>,
    pub is_hidden: bool,
    pub is_selectable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub folder_type: FolderType,
    pub attributes: FolderAttributes,
    pub delimiter: String,
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] ({})", self.display_name, self.folder_type, self.name)
    }
}

/// Folders in display order. The only way to build one is through
/// [`FolderCatalog::sorted`], so the ordering always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FolderCatalog(Vec<Folder>);

impl FolderCatalog {
    pub fn sorted(mut folders: Vec<Folder>) -> Self {
        folders.sort_by(|a, b| {
            a.folder_type
                .sort_rank()
                .cmp(&b.folder_type.sort_rank())
                .then_with(|| {
                    a.display_name
                        .to_lowercase()
                        .cmp(&b.display_name.to_lowercase())
                })
                .then_with(|| a.name.cmp(&b.name))
        });
        Self(folders)
    }

    pub fn folders(&self) -> &[Folder] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Folder> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Folder> {
        self.0.iter().find(|f| f.name == name)
    }

    pub fn into_inner(self) -> Vec<Folder> {
        self.0
    }
}

impl<'a> IntoIterator for &'a FolderCatalog {
    type Item = &'a Folder;
    type IntoIter = std::slice::Iter<'a, Folder>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Everything a parsed message carries before the preview is derived.
#[derive(Debug, Clone, Default)]
pub struct EmailParts {
    pub id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub content_type: String,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    id: String,
    from: String,
    to: String,
    subject: String,
    date: String,
    content_type: String,
    body: Option<String>,
    html_body: Option<String>,
    preview: String,
}

impl Email {
    pub fn new(parts: EmailParts) -> Self {
        let subject = if parts.subject.trim().is_empty() {
            NO_SUBJECT.to_string()
        } else {
            parts.subject
        };
        let body = parts
            .text_body
            .filter(|text| !text.trim().is_empty())
            .or_else(|| parts.html_body.clone());
        let preview = body.as_deref().map(preview_text).unwrap_or_default();
        Self {
            id: parts.id,
            from: parts.from,
            to: parts.to,
            subject,
            date: parts.date,
            content_type: parts.content_type,
            body,
            html_body: parts.html_body,
            preview,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn html_body(&self) -> Option<&str> {
        self.html_body.as_deref()
    }

    pub fn preview(&self) -> &str {
        &self.preview
    }

    /// Copy handed to payload-limited consumers such as the analysis
    /// service: identical except that `body` is cut to
    /// [`ANALYSIS_BODY_CHARS`] characters.
    pub fn analysis_payload(&self) -> Self {
        let mut copy = self.clone();
        if let Some(body) = copy.body.as_mut() {
            if let Some((idx, _)) = body.char_indices().nth(ANALYSIS_BODY_CHARS) {
                body.truncate(idx);
            }
        }
        copy
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.id, self.from, self.subject)
    }
}

/// Collapse line breaks, trim, and cut to [`PREVIEW_CHARS`] characters,
/// appending "..." when something was cut.
pub fn preview_text(body: &str) -> String {
    let flat = body.replace(['\n', '\r'], " ");
    let flat = flat.trim();
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat.to_string(),
    }
}

/// Outcome of normalizing one item inside a batch. A skip never aborts the
/// batch; callers count skips and move on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<T> {
    Value(T),
    Skipped(String),
}

impl<T> Parsed<T> {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Outgoing message handed to the send capability. `cc` and `bcc` are
/// comma-separated address lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftEmail {
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

impl DraftEmail {
    /// All envelope recipients: `to`, then cc, then bcc.
    pub fn recipients(&self) -> Vec<String> {
        let mut all = split_addresses(&self.to);
        for list in [&self.cc, &self.bcc].into_iter().flatten() {
            all.extend(split_addresses(list));
        }
        all
    }
}

pub fn split_addresses(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    pub recipients: Vec<String>,
    pub message: String,
}
