use std::collections::{BTreeSet, HashSet};

use nimbus_domain::{Folder, FolderAttributes, FolderCatalog, Parsed};
use tracing::{debug, info, warn};

use crate::classify::{classify, display_name, folder_type};
use crate::folder::{parse_folder_line, ParsedFolder};

/// Conventional names tried, read-only, when a server's `LIST` response
/// yields nothing usable.
pub const FALLBACK_FOLDERS: &[&str] = &["INBOX", "SENT", "DRAFTS", "SPAM", "TRASH"];

/// Turn raw `LIST` lines into a sorted catalog.
///
/// Bad lines, hidden folders (unless `include_hidden`), non-selectable
/// folders and repeated names are skipped. If nothing survives, each of
/// [`FALLBACK_FOLDERS`] is offered to `probe`, and the names it accepts are
/// listed instead.
pub fn build_catalog<I, P>(lines: I, include_hidden: bool, mut probe: P) -> FolderCatalog
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    P: FnMut(&str) -> bool,
{
    let mut seen = HashSet::new();
    let mut folders = Vec::new();
    let mut skipped = 0usize;

    for line in lines {
        match normalize_line(line.as_ref(), include_hidden, &mut seen) {
            Parsed::Value(folder) => folders.push(folder),
            Parsed::Skipped(reason) => {
                debug!(line = line.as_ref(), %reason, "skipped folder");
                skipped += 1;
            }
        }
    }

    if folders.is_empty() {
        warn!(skipped, "no usable folders in LIST response, probing defaults");
        folders = FALLBACK_FOLDERS
            .iter()
            .filter(|name| probe(name))
            .map(|name| probed_folder(name))
            .collect();
    }

    info!(count = folders.len(), skipped, include_hidden, "built folder catalog");
    FolderCatalog::sorted(folders)
}

/// One line through parse, classify and the visibility filters.
pub fn normalize_line(
    line: &str,
    include_hidden: bool,
    seen: &mut HashSet<String>,
) -> Parsed<Folder> {
    let Some(parsed) = parse_folder_line(line) else {
        return Parsed::skipped("unparseable LIST line");
    };
    let folder = to_folder(parsed);
    if folder.attributes.is_hidden && !include_hidden {
        return Parsed::skipped("hidden");
    }
    if !folder.attributes.is_selectable {
        return Parsed::skipped("not selectable");
    }
    if !seen.insert(folder.name.clone()) {
        return Parsed::skipped("duplicate name");
    }
    Parsed::Value(folder)
}

fn to_folder(parsed: ParsedFolder) -> Folder {
    let class = classify(&parsed.name, &parsed);
    let is_selectable = parsed.is_selectable();
    Folder {
        display_name: class.display_name,
        folder_type: class.folder_type,
        attributes: FolderAttributes {
            raw_attributes: parsed.attributes,
            is_hidden: class.is_hidden,
            is_selectable,
        },
        delimiter: parsed.delimiter,
        name: parsed.name,
    }
}

// A probe succeeded, so the folder is selectable and shown as-is.
fn probed_folder(name: &str) -> Folder {
    let delimiter = if name.contains('.') { "." } else { "/" };
    Folder {
        name: name.to_string(),
        display_name: display_name(name, delimiter),
        folder_type: folder_type(name),
        attributes: FolderAttributes {
            raw_attributes: BTreeSet::new(),
            is_hidden: false,
            is_selectable: true,
        },
        delimiter: delimiter.to_string(),
    }
}
