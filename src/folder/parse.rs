//! Parsers for browser bookmark exports.
//!
//! The folder store hands this core a folder forest; these parsers build
//! that forest from the formats browsers actually export:
//!
//! - Netscape bookmark HTML (Chrome, Firefox, Edge "export bookmarks")
//! - Chrome's `Bookmarks` JSON (`roots.bookmark_bar` / `other` / `synced`)
//! - the plain JSON folder schema used on the wire
//!
//! Bookmark entries themselves (`<A>` tags, urls) are ignored; only the
//! folder hierarchy matters for classification.

use std::path::Path;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::Folder;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Bookmark file not found: {0}")]
    NotFound(String),

    #[error("Failed to read bookmark file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in bookmark file: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("No folders found in HTML bookmark file")]
    NoFolders,

    #[error("Cannot detect bookmark format for file: {0}")]
    UnknownFormat(String),
}

/// Parse Netscape bookmark HTML and extract the folder structure.
///
/// `<H3>` names a folder, the following `<DL>` block holds its children.
/// Folder identifiers are freshly generated, since exports carry none.
pub fn parse_netscape_html(content: &str) -> Vec<Folder> {
    // One scan, three alternatives: a folder heading, a list open, a list close
    let tag_re = Regex::new(r"(?is)<h3[^>]*>(?P<name>.*?)</h3>|(?P<open><dl[^>]*>)|(?P<close></dl>)")
        .expect("static regex");

    // Open <DL> frames; `Some` frames belong to a named folder
    let mut stack: Vec<Option<Folder>> = Vec::new();
    // Folder named by the last <H3>, waiting for its <DL>
    let mut pending: Option<Folder> = None;
    let mut top_level: Vec<Folder> = Vec::new();

    for capture in tag_re.captures_iter(content) {
        if let Some(name) = capture.name("name") {
            // An <H3> directly after another one means the previous folder
            // never got a <DL>: an empty folder.
            if let Some(leaf) = pending.take() {
                attach(leaf, &mut stack, &mut top_level);
            }
            let name = unescape_entities(name.as_str()).trim().to_string();
            if !name.is_empty() {
                pending = Some(Folder::new(Uuid::new_v4().to_string(), name));
            }
        } else if capture.name("open").is_some() {
            stack.push(pending.take());
        } else if capture.name("close").is_some() {
            if let Some(leaf) = pending.take() {
                attach(leaf, &mut stack, &mut top_level);
            }
            if let Some(Some(folder)) = stack.pop() {
                attach(folder, &mut stack, &mut top_level);
            }
        }
    }

    // Tolerate truncated exports: close whatever is still open
    if let Some(leaf) = pending.take() {
        attach(leaf, &mut stack, &mut top_level);
    }
    while let Some(frame) = stack.pop() {
        if let Some(folder) = frame {
            attach(folder, &mut stack, &mut top_level);
        }
    }

    top_level
}

/// Append a finished folder to the nearest enclosing named frame, or to
/// the top level when none is open.
fn attach(folder: Folder, stack: &mut [Option<Folder>], top_level: &mut Vec<Folder>) {
    match stack.iter_mut().rev().find_map(|frame| frame.as_mut()) {
        Some(parent) => parent.children.push(folder),
        None => top_level.push(folder),
    }
}

fn unescape_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}

/// Parse Chrome's `Bookmarks` JSON (roots: bookmark_bar, other, synced).
pub fn parse_chrome_json(data: &Value) -> Vec<Folder> {
    fn convert_node(node: &Value) -> Option<Folder> {
        if node.get("type").and_then(Value::as_str) != Some("folder") {
            return None;
        }
        let mut children = Vec::new();
        if let Some(items) = node.get("children").and_then(Value::as_array) {
            for child in items {
                if let Some(folder) = convert_node(child) {
                    children.push(folder);
                }
            }
        }
        Some(Folder {
            id: node
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: node
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unnamed")
                .to_string(),
            children,
        })
    }

    let mut folders = Vec::new();

    if let Some(roots) = data.get("roots") {
        for root_name in ["bookmark_bar", "other", "synced"] {
            if let Some(root) = roots.get(root_name) {
                if let Some(folder) = convert_node(root) {
                    // Skip Chrome's empty built-in buckets
                    let is_builtin_bucket =
                        matches!(folder.name.as_str(), "Other Bookmarks" | "Mobile Bookmarks");
                    if !folder.children.is_empty() || !is_builtin_bucket {
                        folders.push(folder);
                    }
                }
            }
        }
    } else if let Some(children) = data.get("children").and_then(Value::as_array) {
        for child in children {
            if let Some(folder) = convert_node(child) {
                folders.push(folder);
            }
        }
    }

    folders
}

/// Parse the plain JSON folder schema: a folder object or a list of them.
/// Entries that fail to validate are skipped, not fatal.
pub fn parse_simple_json(data: &Value) -> Vec<Folder> {
    let items: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Folder>(item.clone()).ok())
        .collect()
}

/// Auto-detect and parse a bookmark file into a folder forest.
pub fn parse_bookmarks_file(path: impl AsRef<Path>) -> Result<Vec<Folder>, ParseError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ParseError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let suffix = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);

    match suffix.as_deref() {
        Some("html") | Some("htm") => {
            let folders = parse_netscape_html(&content);
            if folders.is_empty() {
                return Err(ParseError::NoFolders);
            }
            Ok(folders)
        }
        Some("json") => {
            let data: Value = serde_json::from_str(&content)?;
            if data.get("roots").is_some() {
                Ok(parse_chrome_json(&data))
            } else {
                Ok(parse_simple_json(&data))
            }
        }
        _ => {
            // No useful extension: sniff the content
            let netscape_re = Regex::new(r"(?i)<!DOCTYPE\s+NETSCAPE-Bookmark-file").expect("static regex");
            if netscape_re.is_match(&content) {
                return Ok(parse_netscape_html(&content));
            }
            if let Ok(data) = serde_json::from_str::<Value>(&content) {
                if data.get("roots").is_some() {
                    return Ok(parse_chrome_json(&data));
                }
                return Ok(parse_simple_json(&data));
            }
            Err(ParseError::UnknownFormat(path.display().to_string()))
        }
    }
}

/// All folder paths of a forest, depth-first:
/// `["Tech", "Tech/Python", "Tech/Python/Libraries"]`
pub fn extract_folder_paths(folders: &[Folder]) -> Vec<String> {
    fn walk(folders: &[Folder], prefix: &str, out: &mut Vec<String>) {
        for folder in folders {
            let path = if prefix.is_empty() {
                folder.name.clone()
            } else {
                format!("{}/{}", prefix, folder.name)
            };
            out.push(path.clone());
            walk(&folder.children, &path, out);
        }
    }

    let mut out = Vec::new();
    walk(folders, "", &mut out);
    out
}
