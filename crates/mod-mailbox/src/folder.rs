//! IMAP `LIST` line parsing. Matchers run strictest first.

use std::collections::BTreeSet;

use tracing::debug;

/// Delimiter assumed when the server reports none (`NIL`) or when the line
/// could only be parsed heuristically.
pub const DEFAULT_DELIMITER: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFolder {
    pub name: String,
    pub delimiter: String,
    pub attributes: BTreeSet<String>,
}

impl ParsedFolder {
    fn new(name: String, delimiter: impl Into<String>, attributes: BTreeSet<String>) -> Option<Self> {
        if name.trim().is_empty() {
            return None;
        }
        Some(Self {
            name,
            delimiter: delimiter.into(),
            attributes,
        })
    }

    pub fn has_attribute(&self, attr: &str) -> bool {
        self.attributes.contains(attr)
    }

    pub fn is_selectable(&self) -> bool {
        !self.has_attribute("Noselect")
    }
}

pub trait LineMatcher: Sync {
    fn name(&self) -> &'static str;

    fn try_parse(&self, line: &str) -> Option<ParsedFolder>;
}

/// `(attrs) "delim" "name"`
pub struct QuotedDelimQuotedName;

pub struct QuotedDelimBareName;

pub struct BareDelim;

pub struct NilDelim;

/// The last token that is not an attribute is the name.
pub struct LastToken;

pub static MATCHERS: &[&dyn LineMatcher] = &[
    &QuotedDelimQuotedName,
    &QuotedDelimBareName,
    &BareDelim,
    &NilDelim,
    &LastToken,
];

impl LineMatcher for QuotedDelimQuotedName {
    fn name(&self) -> &'static str {
        "quoted-delim-quoted-name"
    }

    fn try_parse(&self, line: &str) -> Option<ParsedFolder> {
        let (attributes, rest) = attribute_group(line)?;
        let (delimiter, rest) = quoted(rest)?;
        let (name, tail) = quoted(rest.trim_start())?;
        if !tail.trim().is_empty() {
            return None;
        }
        ParsedFolder::new(name, delimiter, attributes)
    }
}

impl LineMatcher for QuotedDelimBareName {
    fn name(&self) -> &'static str {
        "quoted-delim-bare-name"
    }

    fn try_parse(&self, line: &str) -> Option<ParsedFolder> {
        let (attributes, rest) = attribute_group(line)?;
        let (delimiter, rest) = quoted(rest)?;
        let name = rest.trim().trim_matches('"').to_string();
        ParsedFolder::new(name, delimiter, attributes)
    }
}

impl LineMatcher for BareDelim {
    fn name(&self) -> &'static str {
        "bare-delim"
    }

    fn try_parse(&self, line: &str) -> Option<ParsedFolder> {
        let (attributes, rest) = attribute_group(line)?;
        let (delimiter, rest) = bare_token(rest)?;
        // A hierarchy delimiter is a single character; anything longer is
        // the first word of an unquoted name.
        if delimiter.chars().count() != 1 {
            return None;
        }
        ParsedFolder::new(name_tail(rest)?, delimiter, attributes)
    }
}

impl LineMatcher for NilDelim {
    fn name(&self) -> &'static str {
        "nil-delim"
    }

    fn try_parse(&self, line: &str) -> Option<ParsedFolder> {
        let (attributes, rest) = attribute_group(line)?;
        let (token, rest) = bare_token(rest)?;
        if !token.eq_ignore_ascii_case("NIL") {
            return None;
        }
        ParsedFolder::new(name_tail(rest)?, DEFAULT_DELIMITER, attributes)
    }
}

impl LineMatcher for LastToken {
    fn name(&self) -> &'static str {
        "last-token"
    }

    fn try_parse(&self, line: &str) -> Option<ParsedFolder> {
        let (attributes, rest) = attribute_group(line).unwrap_or_else(|| (BTreeSet::new(), line));
        let name = rest
            .split_whitespace()
            .filter(|t| {
                !t.starts_with('\\')
                    && !t.starts_with('(')
                    && !t.ends_with(')')
                    && !t.eq_ignore_ascii_case("NIL")
            })
            .last()?
            .trim_matches('"')
            .to_string();
        ParsedFolder::new(name, DEFAULT_DELIMITER, attributes)
    }
}

/// Parse one `LIST` line, with or without its `* LIST ` prefix. `None`
/// means no matcher accepted the line and it should be skipped.
pub fn parse_folder_line(line: &str) -> Option<ParsedFolder> {
    let line = strip_list_prefix(line);
    if line.is_empty() {
        return None;
    }
    MATCHERS.iter().enumerate().find_map(|(tier, m)| {
        let parsed = m.try_parse(line)?;
        if tier > 0 {
            debug!(matcher = m.name(), line, "parsed LIST line with fallback matcher");
        }
        Some(parsed)
    })
}

/// Split a raw `LIST` response into one line per mailbox, folding IMAP
/// literals (`{N}` followed by the name on the next line) back into a
/// quoted name. Untagged lines other than `LIST`/`LSUB` are dropped.
pub fn split_list_response(raw: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(raw);
    let mut out = Vec::new();
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let Some(rest) = list_payload(line) else {
            continue;
        };
        match literal_head(rest) {
            Some(head) => {
                let name = lines.next().unwrap_or_default();
                out.push(format!("{head}\"{}\"", escape_quoted(name)));
            }
            None => out.push(rest.to_string()),
        }
    }
    out
}

pub fn parse_attributes(group: &str) -> BTreeSet<String> {
    group
        .split_whitespace()
        .map(|a| a.trim_start_matches('\\'))
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

fn list_payload(line: &str) -> Option<&str> {
    ["* LIST ", "* LSUB ", "* XLIST "]
        .iter()
        .find_map(|prefix| strip_prefix_ignore_case(line, prefix))
}

fn strip_list_prefix(line: &str) -> &str {
    let line = line.trim();
    list_payload(line).map(str::trim_start).unwrap_or(line)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

fn literal_head(rest: &str) -> Option<&str> {
    let trimmed = rest.trim_end();
    let inner = trimmed.strip_suffix('}')?;
    let open = inner.rfind('{')?;
    let digits = inner[open + 1..].trim_end_matches('+');
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(&inner[..open])
}

fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn attribute_group(line: &str) -> Option<(BTreeSet<String>, &str)> {
    let inner = line.trim_start().strip_prefix('(')?;
    let close = inner.find(')')?;
    Some((parse_attributes(&inner[..close]), inner[close + 1..].trim_start()))
}

fn quoted(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let mut out = String::new();
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if escaped {
            out.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return Some((out, &body[i + 1..])),
            _ => out.push(c),
        }
    }
    None
}

fn bare_token(s: &str) -> Option<(&str, &str)> {
    if s.is_empty() || s.starts_with('"') {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], s[end..].trim_start()))
}

fn name_tail(rest: &str) -> Option<String> {
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }
    if let Some((name, tail)) = quoted(rest) {
        if tail.trim().is_empty() {
            return Some(name);
        }
    }
    Some(rest.trim_matches('"').to_string())
}
