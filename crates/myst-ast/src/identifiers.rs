/*
 * identifiers.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Label normalization and anchor ids.
 */

/// Normalize an author-written label into a project identifier.
///
/// Lower-cases, trims, and collapses internal whitespace runs into a single
/// `-`. Returns `None` for labels that are empty after trimming.
pub fn normalize_label(label: &str) -> Option<String> {
    let words: Vec<&str> = label.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }
    Some(words.join("-").to_lowercase())
}

/// Derive an anchor id from an identifier or heading text.
///
/// Keeps ASCII alphanumerics, `-` and `_`, maps everything else to `-`,
/// collapses repeated dashes and trims them from both ends. Ids must not
/// start with a digit, so those get an `id-` prefix.
pub fn create_html_id(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut last_dash = true;
    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        return None;
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "id-");
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("fig:One").as_deref(), Some("fig:one"));
        assert_eq!(
            normalize_label("  A   Long\tLabel ").as_deref(),
            Some("a-long-label")
        );
        assert_eq!(normalize_label(" \n "), None);
    }

    #[test]
    fn test_create_html_id() {
        assert_eq!(create_html_id("fig:one").as_deref(), Some("fig-one"));
        assert_eq!(
            create_html_id("Hello, World!").as_deref(),
            Some("hello-world")
        );
        assert_eq!(create_html_id("1 intro").as_deref(), Some("id-1-intro"));
        assert_eq!(create_html_id("--__--").as_deref(), Some("__"));
        assert_eq!(create_html_id("!!!"), None);
    }
}
