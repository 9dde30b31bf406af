use nimbus_domain::{Email, Folder, FolderCatalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Compact,
    Full,
}

impl Format {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("full" | "json") => Self::Full,
            _ => Self::Compact,
        }
    }
}

pub fn format_catalog(catalog: &FolderCatalog, fmt: Format) -> String {
    match fmt {
        Format::Compact => {
            let mut lines: Vec<String> = Vec::with_capacity(catalog.len() + 1);
            lines.push(format!("{} folders:", catalog.len()));
            for f in catalog {
                lines.push(format_folder_line(f));
            }
            lines.join("\n")
        }
        Format::Full => to_json(catalog),
    }
}

pub fn format_emails(folder: &str, emails: &[Email], fmt: Format) -> String {
    match fmt {
        Format::Compact => {
            let mut lines: Vec<String> = Vec::with_capacity(emails.len() + 1);
            lines.push(format!("{} emails in {folder}:", emails.len()));
            for e in emails {
                lines.push(format_email_line(e));
            }
            lines.join("\n")
        }
        Format::Full => to_json(emails),
    }
}

fn format_folder_line(f: &Folder) -> String {
    let hidden = if f.attributes.is_hidden { " hidden" } else { "" };
    format!("  {} [{}]{} name:{}", f.display_name, f.folder_type, hidden, f.name)
}

fn format_email_line(e: &Email) -> String {
    let html = if e.html_body().is_some() { " +html" } else { "" };
    let preview = if e.preview().is_empty() {
        String::new()
    } else {
        format!(" - {}", truncate(e.preview(), 80))
    };
    format!(
        "  [{date}] {from}: {subj}{preview}{html} (id:{id})",
        date = e.date(),
        from = e.from(),
        subj = truncate(e.subject(), 60),
        id = e.id(),
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let truncated: String = s.chars().take(max).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

pub fn to_json<T: serde::Serialize + ?Sized>(val: &T) -> String {
    serde_json::to_string(val).unwrap_or_else(|e| format!("serialization error: {e}"))
}

#[cfg(test)]
mod tests {
    use nimbus_domain::EmailParts;

    use super::*;
    use crate::build_catalog;

    #[test]
    fn compact_catalog_lists_display_names() {
        let catalog = build_catalog(
            [
                r#"(\HasNoChildren) "." "INBOX""#,
                r#"(\HasNoChildren) "." "INBOX.Sent""#,
            ],
            false,
            |_| false,
        );
        let out = format_catalog(&catalog, Format::Compact);
        assert_eq!(
            out,
            "2 folders:\n  Inbox [inbox] name:INBOX\n  Sent [sent] name:INBOX.Sent"
        );
    }

    #[test]
    fn full_catalog_is_json_array() {
        let catalog = build_catalog([r#"(\HasNoChildren) "/" "INBOX""#], false, |_| false);
        let out = format_catalog(&catalog, Format::Full);
        assert!(out.starts_with(r#"[{"name":"INBOX","displayName":"Inbox","type":"inbox""#));
    }

    #[test]
    fn compact_email_line() {
        let email = Email::new(EmailParts {
            id: "3".into(),
            from: "bob@example.com".into(),
            subject: "Lunch".into(),
            date: "Tue, 2 Jan 2024".into(),
            text_body: Some("See you\nat noon".into()),
            ..Default::default()
        });
        let out = format_emails("INBOX", &[email], Format::Compact);
        assert_eq!(
            out,
            "1 emails in INBOX:\n  [Tue, 2 Jan 2024] bob@example.com: Lunch - See you at noon (id:3)"
        );
    }

    #[test]
    fn parse_format() {
        assert_eq!(Format::parse(Some("json")), Format::Full);
        assert_eq!(Format::parse(None), Format::Compact);
    }
}
