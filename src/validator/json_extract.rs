//! JSON recovery from raw LLM responses.
//!
//! Models asked for pure JSON still wrap it in markdown fences or
//! conversational framing often enough that strict parsing alone would
//! waste attempts. Recovery runs in stages, strictest first; only when
//! every stage fails does the validator classify the response as
//! malformed.

use serde_json::Value;

/// Extract the outermost JSON object from a model response.
///
/// Stages: direct parse, markdown-fence removal, brace-counting on the
/// cleaned text, brace-counting on the original text.
pub fn extract_json_object(response: &str) -> Option<Value> {
    let trimmed = response.trim();

    // Stage 1: ideal case, the whole response is the object
    if let Some(value) = parse_object(trimmed) {
        return Some(value);
    }

    // Stage 2: strip ```json fences
    let cleaned = remove_markdown_blocks(trimmed);
    if let Some(value) = parse_object(&cleaned) {
        return Some(value);
    }

    // Stage 3: brace-count the cleaned text for a nested object
    if let Some(candidate) = find_json_object(&cleaned) {
        if let Some(value) = parse_object(candidate) {
            return Some(value);
        }
    }

    // Stage 4: brace-count the original, in case fence removal broke it
    if let Some(candidate) = find_json_object(trimmed) {
        if let Some(value) = parse_object(candidate) {
            return Some(value);
        }
    }

    None
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Remove markdown code fences (```json ... ``` or ``` ... ```)
fn remove_markdown_blocks(text: &str) -> String {
    let mut result = text.to_string();

    if result.starts_with("```json") {
        result = result.strip_prefix("```json").unwrap_or(&result).to_string();
    } else if result.starts_with("```") {
        result = result.strip_prefix("```").unwrap_or(&result).to_string();
    }

    result = result.trim().to_string();
    if result.ends_with("```") {
        result = result.strip_suffix("```").unwrap_or(&result).to_string();
    }

    result.trim().to_string()
}

/// Find the outermost `{ ... }` span using brace counting.
///
/// Braces inside string literals are skipped so reasoning text like
/// `"path {with} braces"` cannot truncate the span.
fn find_json_object(text: &str) -> Option<&str> {
    let mut brace_count = 0i32;
    let mut start_idx: Option<usize> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => {
                if brace_count == 0 {
                    start_idx = Some(i);
                }
                brace_count += 1;
            }
            '}' => {
                brace_count -= 1;
                if brace_count == 0 {
                    if let Some(start) = start_idx {
                        return Some(&text[start..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_json() {
        let value = extract_json_object(r#"{"title": "Rust"}"#).unwrap();
        assert_eq!(value["title"], "Rust");
    }

    #[test]
    fn test_markdown_code_block() {
        let input = "```json\n{\"title\": \"Rust\"}\n```";
        let value = extract_json_object(input).unwrap();
        assert_eq!(value["title"], "Rust");
    }

    #[test]
    fn test_conversational_wrapper() {
        let input = "Sure, here's the result:\n{\"title\": \"Rust\"}\nLet me know!";
        let value = extract_json_object(input).unwrap();
        assert_eq!(value["title"], "Rust");
    }

    #[test]
    fn test_braces_inside_strings() {
        let input = r#"{"reasoning": "matches {exactly} one node", "title": "x"}"#;
        let value = extract_json_object(input).unwrap();
        assert_eq!(value["title"], "x");
    }

    #[test]
    fn test_truncated_json_fails() {
        assert!(extract_json_object(r#"{"title": "Rust", "summ"#).is_none());
    }

    #[test]
    fn test_prose_fails() {
        assert!(extract_json_object("I could not analyze this page.").is_none());
    }

    #[test]
    fn test_array_recovers_inner_object() {
        // A top-level array is not a valid response shape, but the first
        // object inside it is still recoverable via brace counting.
        let value = extract_json_object(r#"[{"title": "Rust"}]"#).unwrap();
        assert_eq!(value["title"], "Rust");
    }
}
