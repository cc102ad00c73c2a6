//! Prompt construction for both inference tasks.
//!
//! System prompts are fixed; user prompts are built per request from the
//! page content and, for classification, a serialized view of the folder
//! tree. The serialization is a flat path listing because the model is
//! asked to answer with a full folder path, the same shape it read.

use crate::folder::FolderTree;
use crate::schema::Summary;

/// Upper bound on page text included in a prompt, in characters.
/// Content is expected to arrive already bounded; this is the hard cap.
pub const MAX_PAGE_CHARS: usize = 15_000;

/// Upper bound on serialized folder paths included in a prompt
pub const MAX_TREE_CHARS: usize = 8_000;

/// Response budget for a summary
pub const SUMMARIZE_MAX_TOKENS: u32 = 500;

/// Response budget for a folder decision (reasoning included)
pub const CLASSIFY_MAX_TOKENS: u32 = 1_000;

/// Already-fetched, already-stripped page text for one bookmark
#[derive(Debug, Clone)]
pub struct PageContent {
    pub url: String,
    pub text: String,
}

impl PageContent {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }
}

/// System prompt for the Summarize task
pub const SUMMARIZE_SYSTEM_PROMPT: &str = r#"You are a web page analyst. Analyze the page and extract a title, a summary, and keywords.

Rules:
1. The title is the page's own title, cleaned of site-name suffixes and tracking noise.
2. The summary is 1-3 sentences describing what the page is about and who it is for.
3. Keywords are specific topical tags (technologies, product names, subjects), not generic words like "website" or "article".

Respond with ONLY valid JSON in this exact format:
{"title": "...", "summary": "...", "keywords": ["...", "..."]}

No markdown, no explanation, no code blocks."#;

/// System prompt for classifying into an existing folder
pub const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are a bookmark organization assistant. Based on the webpage analysis and the user's folder structure, recommend the best existing folder for this bookmark.

Rules:
1. Choose folders based on semantic relevance to the page content (title, summary, keywords).
2. Prefer more specific folders over general ones when the content clearly fits.
3. When multiple folders match a keyword (e.g., "Security"), prefer the one whose full path best reflects the page's PRIMARY topic. For example, a Django security tool belongs under a Django folder, not a generic Security folder.
4. Consider all levels of the folder hierarchy. A folder path like "Django/Admin/Security" matching multiple aspects of the content is better than "Articles/Security" matching only one.
5. Return the FULL path of the chosen folder exactly as it appears in the folder structure.

Respond with ONLY valid JSON in this exact format:
{"recommendedFolder": "Full/Path/To/Folder", "reasoning": "...", "confidence": 0.9}

No markdown, no explanation, no code blocks."#;

/// System prompt for classification that may propose a new child folder
pub const CLASSIFY_NEW_FOLDER_SYSTEM_PROMPT: &str = r#"You are a bookmark organization assistant. Based on the webpage analysis, pick where this bookmark belongs. If no existing folder fits well, propose a new one.

Rules:
1. If an existing folder fits, set `recommendedFolder` to its full path and `newFolderName` to null.
2. If no existing folder is a good fit, set `recommendedFolder` to the full path of the best PARENT folder from the existing structure and set `newFolderName` to a short name for the new child folder to create there.
3. Choose folders based on semantic relevance to the page content (title, summary, keywords).
4. Prefer more specific folders over general ones when the content clearly fits.
5. Return full paths exactly as they appear in the folder structure; never invent a path.

Respond with ONLY valid JSON in this exact format:
{"recommendedFolder": "Full/Path/To/Folder", "newFolderName": null, "reasoning": "...", "confidence": 0.9}

No markdown, no explanation, no code blocks."#;

/// Build the user prompt for the Summarize task
pub fn build_summarize_prompt(page: &PageContent) -> String {
    format!(
        "URL: {}\n\nContent:\n{}",
        page.url,
        truncate(&page.text, MAX_PAGE_CHARS)
    )
}

/// Build the user prompt for the ClassifyFolder task.
///
/// `summary` carries the analysis of an earlier Summarize pass when one
/// ran; otherwise the raw page text stands in. `retry_note` names a folder
/// reference that failed to resolve on a previous attempt, so the model
/// can correct itself instead of repeating the hallucination.
pub fn build_classify_prompt(
    page: &PageContent,
    summary: Option<&Summary>,
    tree: &FolderTree,
    retry_note: Option<&str>,
) -> String {
    let mut prompt = String::new();

    match summary {
        Some(s) => {
            prompt.push_str(&format!(
                "Webpage Analysis:\n- URL: {}\n- Title: {}\n- Summary: {}\n- Keywords: {}\n",
                page.url,
                s.title,
                s.summary,
                s.keywords.join(", ")
            ));
        }
        None => {
            prompt.push_str(&format!(
                "Webpage:\n- URL: {}\n\nContent:\n{}\n",
                page.url,
                truncate(&page.text, MAX_PAGE_CHARS)
            ));
        }
    }

    prompt.push_str(&format!(
        "\nUser's Folder Structure (full paths):\n{}\n",
        serialize_tree(tree, MAX_TREE_CHARS)
    ));

    if let Some(note) = retry_note {
        prompt.push_str(&format!("\nIMPORTANT: {}\n", note));
    }

    prompt.push_str("\nPlease recommend the best folder for this bookmark.");
    prompt
}

/// Corrective note appended after a failed resolution
pub fn build_retry_note(failed_reference: &str) -> String {
    format!(
        "Your previous answer \"{}\" did not match any folder in the structure above. \
         Answer with a full path copied exactly from the folder structure.",
        failed_reference
    )
}

/// Flat path listing of the tree, one folder per line, bounded in size.
///
/// Large hierarchies are cut off with an explicit marker rather than
/// silently dropped; the model should know the listing is partial.
pub fn serialize_tree(tree: &FolderTree, max_chars: usize) -> String {
    let nodes = tree.nodes_depth_first();
    let mut lines: Vec<&str> = Vec::with_capacity(nodes.len());
    for node in &nodes {
        if let Some(path) = tree.path(&node.id) {
            lines.push(path);
        }
    }

    let full = lines.join("\n");
    if full.len() <= max_chars {
        return full;
    }

    let mut taken = 0usize;
    let mut size = 0usize;
    for line in &lines {
        // +1 for the newline
        if size + line.len() + 1 > max_chars {
            break;
        }
        size += line.len() + 1;
        taken += 1;
    }

    format!(
        "{}\n... ({} more folders, showing first {})",
        lines[..taken].join("\n"),
        lines.len() - taken,
        taken
    )
}

/// Cut text at a character boundary, never mid-codepoint
fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
