use std::collections::BTreeSet;

use nimbus_domain::FolderType;

use crate::folder::ParsedFolder;

const HIDDEN_ATTRIBUTES: &[&str] = &["Hidden", "Noselect", "All", "Archive", "Important"];

const GMAIL_MARKERS: &[&str] = &[
    "[gmail]", "gmail/", "all mail", "important", "starred", "chats", "spam", "trash",
];

const OUTLOOK_MARKERS: &[&str] = &[
    "calendar",
    "contacts",
    "tasks",
    "notes",
    "journal",
    "sync issues",
    "conversation history",
    "quick step settings",
    "suggested contacts",
    "recipient cache",
];

const YAHOO_MARKERS: &[&str] = &["bulk mail"];

const SYSTEM_NAMES: &[&str] = &[
    ".", "..", "tmp", "temp", ".imap", ".subscriptions", "calendar", "contacts", "tasks",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub folder_type: FolderType,
    pub is_hidden: bool,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HiddenReason {
    Attribute(String),
    ProviderMarker {
        provider: &'static str,
        marker: &'static str,
    },
    SystemName,
}

pub fn classify(name: &str, parsed: &ParsedFolder) -> Classification {
    Classification {
        folder_type: folder_type(name),
        is_hidden: hidden_reason(name, &parsed.attributes).is_some(),
        display_name: display_name(name, &parsed.delimiter),
    }
}

/// First matching rule wins. Only a name that is or ends with "inbox" is
/// the inbox.
pub fn folder_type(name: &str) -> FolderType {
    let lower = name.to_lowercase();
    if lower.contains("spam") || lower.contains("junk") {
        FolderType::Spam
    } else if lower.contains("sent") {
        FolderType::Sent
    } else if lower.contains("draft") {
        FolderType::Drafts
    } else if lower.contains("trash") || lower.contains("deleted") {
        FolderType::Trash
    } else if lower.ends_with("inbox") {
        FolderType::Inbox
    } else {
        FolderType::Custom
    }
}

pub fn hidden_reason(name: &str, attributes: &BTreeSet<String>) -> Option<HiddenReason> {
    if let Some(attr) = HIDDEN_ATTRIBUTES.iter().find(|a| attributes.contains(**a)) {
        return Some(HiddenReason::Attribute(attr.to_string()));
    }

    let lower = name.to_lowercase();
    let providers = [
        ("gmail", GMAIL_MARKERS),
        ("outlook", OUTLOOK_MARKERS),
        ("yahoo", YAHOO_MARKERS),
    ];
    for (provider, markers) in providers {
        if let Some(marker) = markers.iter().find(|m| lower.contains(**m)) {
            return Some(HiddenReason::ProviderMarker {
                provider,
                marker: *marker,
            });
        }
    }

    if SYSTEM_NAMES.contains(&lower.as_str()) {
        return Some(HiddenReason::SystemName);
    }
    None
}

pub fn is_hidden(name: &str, attributes: &BTreeSet<String>) -> bool {
    hidden_reason(name, attributes).is_some()
}

pub fn display_name(name: &str, delimiter: &str) -> String {
    let segment = last_segment(name, delimiter);
    let cleaned = segment.replace(['_', '-'], " ");
    let canonical = match cleaned.to_lowercase().as_str() {
        "inbox" => Some("Inbox"),
        "sent" | "sent items" | "sent messages" | "sent mail" => Some("Sent"),
        "drafts" | "draft" => Some("Drafts"),
        "spam" | "junk" | "junk e mail" | "junk email" => Some("Spam"),
        "trash" | "deleted" | "deleted items" | "deleted messages" => Some("Trash"),
        _ => None,
    };
    canonical
        .map(str::to_string)
        .unwrap_or_else(|| title_case(&cleaned))
}

fn last_segment<'a>(name: &'a str, delimiter: &str) -> &'a str {
    let sep = [delimiter, ".", "/"]
        .into_iter()
        .find(|d| !d.is_empty() && name.contains(*d));
    let segment = match sep {
        Some(d) => name.rsplit(d).next().unwrap_or(name),
        None => name,
    };
    if segment.trim().is_empty() {
        name
    } else {
        segment
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(name: &str, delimiter: &str, attrs: &[&str]) -> ParsedFolder {
        ParsedFolder {
            name: name.to_string(),
            delimiter: delimiter.to_string(),
            attributes: attrs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn plain_inbox() {
        let c = classify("INBOX", &parsed("INBOX", "/", &[]));
        assert_eq!(c.folder_type, FolderType::Inbox);
        assert!(!c.is_hidden);
        assert_eq!(c.display_name, "Inbox");
    }

    #[test]
    fn spam_beats_inbox() {
        assert_eq!(folder_type("INBOX.Spam"), FolderType::Spam);
        assert_eq!(folder_type("Junk E-mail"), FolderType::Spam);
        assert_eq!(folder_type("INBOX.junk"), FolderType::Spam);
    }

    #[test]
    fn type_rules_in_order() {
        assert_eq!(folder_type("INBOX.Sent"), FolderType::Sent);
        assert_eq!(folder_type("[Gmail]/Drafts"), FolderType::Drafts);
        assert_eq!(folder_type("Deleted Items"), FolderType::Trash);
        assert_eq!(folder_type("Work/Inbox"), FolderType::Inbox);
        assert_eq!(folder_type("INBOX.Receipts"), FolderType::Custom);
        assert_eq!(folder_type("Inbox Archive"), FolderType::Custom);
    }

    #[test]
    fn gmail_system_folders_hidden() {
        let c = classify("[Gmail]/All Mail", &parsed("[Gmail]/All Mail", "/", &[]));
        assert!(c.is_hidden);
        assert_eq!(c.display_name, "All Mail");
        assert_eq!(
            hidden_reason("[Gmail]/Starred", &BTreeSet::new()),
            Some(HiddenReason::ProviderMarker {
                provider: "gmail",
                marker: "[gmail]"
            })
        );
    }

    #[test]
    fn outlook_and_yahoo_markers() {
        assert!(is_hidden("Sync Issues/Conflicts", &BTreeSet::new()));
        assert!(is_hidden("Suggested Contacts", &BTreeSet::new()));
        assert!(is_hidden("Bulk Mail", &BTreeSet::new()));
        assert!(!is_hidden("Receipts", &BTreeSet::new()));
    }

    #[test]
    fn hidden_by_attribute() {
        let attrs: BTreeSet<String> = ["HasNoChildren", "Archive"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            hidden_reason("Old", &attrs),
            Some(HiddenReason::Attribute("Archive".into()))
        );
    }

    #[test]
    fn system_names_hidden() {
        assert_eq!(hidden_reason("tmp", &BTreeSet::new()), Some(HiddenReason::SystemName));
        assert_eq!(hidden_reason(".imap", &BTreeSet::new()), Some(HiddenReason::SystemName));
        assert!(!is_hidden("tmpfiles", &BTreeSet::new()));
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name("INBOX.Sent", "."), "Sent");
        assert_eq!(display_name("INBOX.sent-items", "."), "Sent");
        assert_eq!(display_name("Junk_E-mail", "/"), "Spam");
        assert_eq!(display_name("Deleted Messages", "/"), "Trash");
        assert_eq!(display_name("work/client_projects", "/"), "Client Projects");
        assert_eq!(display_name("INBOX.2024 TAXES", "."), "2024 Taxes");
        assert_eq!(display_name("a.b/c", "/"), "C");
        assert_eq!(display_name("Folder/", "/"), "Folder/");
    }
}
