//! Extraction of a JSON block from model output.
//!
//! Generation endpoints routinely wrap JSON in Markdown code fences or
//! surround it with prose. This module pulls out the first fenced block, or
//! failing that the first balanced bare JSON object/array, with a defined
//! answer (`None`) when no JSON is present: a parse failure for the
//! caller, never a crash.

/// Extract the first fenced or bare JSON block from `text`.
///
/// Resolution order:
/// 1. the body of the first ``` fence (any language tag),
/// 2. the first balanced `{...}` or `[...]` region,
/// 3. `None`.
///
/// The returned slice is trimmed but not validated; callers still parse it.
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(inner) = fenced_body(text) {
        let inner = inner.trim();
        if !inner.is_empty() {
            return Some(inner);
        }
    }
    bare_json_region(text)
}

/// Body of the first triple-backtick fence, language tag excluded.
fn fenced_body(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_ticks = &text[open + 3..];
    // Skip the language tag (rest of the opening line)
    let body_start = after_ticks.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_ticks[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// First balanced JSON object or array, string- and escape-aware.
fn bare_json_region(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let (open, close) = match bytes[start] {
        b'{' => (b'{', b'}'),
        _ => (b'[', b']'),
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=i].trim());
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
    fn extracts_json_fence() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nanything else";
        assert_eq!(extract_json_block(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn extracts_plain_fence() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_block(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn extracts_bare_object() {
        let text = "The record is {\"a\": {\"b\": 2}} as requested.";
        assert_eq!(extract_json_block(text), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn extracts_bare_array() {
        let text = "rows: [1, 2, [3]] done";
        assert_eq!(extract_json_block(text), Some("[1, 2, [3]]"));
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_balancing() {
        let text = r#"{"note": "brace } in \" string", "n": 1}"#;
        assert_eq!(extract_json_block(text), Some(text));
    }

    #[test]
    fn no_json_is_none() {
        assert_eq!(extract_json_block("no structured content here"), None);
        assert_eq!(extract_json_block(""), None);
    }

    #[test]
    fn unbalanced_json_is_none() {
        assert_eq!(extract_json_block("{\"a\": 1"), None);
    }

    #[test]
    fn empty_fence_falls_back_to_bare_search() {
        let text = "```\n\n```\nbut also {\"x\": 9}";
        assert_eq!(extract_json_block(text), Some("{\"x\": 9}"));
    }

    #[test]
    fn fence_without_newline_after_tag() {
        let text = "```{\"inline\": true}```";
        assert_eq!(extract_json_block(text), Some("{\"inline\": true}"));
    }

    #[test]
    fn extracted_block_parses() {
        let text = "```json\n{\"catalog_info\": {\"title\": \"T\"}}\n```";
        let block = extract_json_block(text).unwrap();
        let value: serde_json::Value = serde_json::from_str(block).unwrap();
        assert_eq!(value["catalog_info"]["title"], "T");
    }
}
