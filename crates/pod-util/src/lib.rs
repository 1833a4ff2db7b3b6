//! Small utility functions shared across the pipeline crates.

/// Converts a name to a URL/path-safe slug.
///
/// # Examples
/// ```
/// assert_eq!(pod_util::slugify("The Daily"), "the-daily");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    slug::slugify(name)
}

/// Truncates a string to a maximum length, adding "..." if truncated.
///
/// # Examples
/// ```
/// assert_eq!(pod_util::truncate("hello", 10), "hello");
/// assert_eq!(pod_util::truncate("hello world", 8), "hello...");
/// ```
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_len.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

const FORBIDDEN_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const MAX_FILENAME_LEN: usize = 200;

/// Sanitizes an arbitrary string into a safe filename component.
///
/// Removes characters forbidden on common filesystems, collapses runs
/// of whitespace/underscore into a single underscore, trims leading and
/// trailing dots/whitespace, and caps the result at 200 characters.
/// Satisfies the sanitizer property: the result never contains a
/// forbidden character, never exceeds 200 chars, and never starts or
/// ends with '.' or whitespace.
///
/// # Examples
/// ```
/// assert_eq!(pod_util::sanitize_filename("Ep 1: What? / Why*"), "Ep_1_What_Why");
/// ```
#[must_use]
pub fn sanitize_filename(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut last_was_space = false;
    for c in input.chars() {
        if FORBIDDEN_FILENAME_CHARS.contains(&c) {
            continue;
        }
        if c.is_whitespace() || c == '_' {
            if !last_was_space {
                cleaned.push('_');
            }
            last_was_space = true;
        } else {
            cleaned.push(c);
            last_was_space = false;
        }
    }

    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());

    let truncated: String = trimmed.chars().take(MAX_FILENAME_LEN).collect();
    truncated
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("The Daily"), "the-daily");
        assert_eq!(slugify("What is Money?"), "what-is-money");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_sanitize_filename_strips_forbidden_chars() {
        let out = sanitize_filename("Ep 1: What? / Why*");
        for c in FORBIDDEN_FILENAME_CHARS {
            assert!(!out.contains(*c));
        }
    }

    #[test]
    fn test_sanitize_filename_caps_length() {
        let long = "a".repeat(500);
        assert!(sanitize_filename(&long).len() <= MAX_FILENAME_LEN);
    }

    #[test]
    fn test_sanitize_filename_no_leading_trailing_dot_or_space() {
        let out = sanitize_filename("  ...weird name...  ");
        assert!(!out.starts_with('.') && !out.ends_with('.'));
        assert!(!out.starts_with(' ') && !out.ends_with(' '));
    }

    #[test]
    fn test_sanitize_filename_empty_input() {
        assert_eq!(sanitize_filename(""), "");
    }
}
