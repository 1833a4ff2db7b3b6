//! HTML stripping, named-entity decoding, and whitespace collapsing for
//! feed description fields (§4.B). `html2text` handles general markup;
//! a small named-entity table covers the handful the spec calls out
//! explicitly, since `html2text` leaves unescaped entities alone when
//! description fields arrive as mixed plain-text/HTML.

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&nbsp;", " "),
];

/// Strips HTML tags, decodes the named entities in `NAMED_ENTITIES`, and
/// collapses runs of whitespace into single spaces.
#[must_use]
pub fn strip_html(input: &str) -> String {
    let looks_like_html = input.contains('<') && input.contains('>');
    let plain = if looks_like_html {
        html2text::from_read(input.as_bytes(), usize::MAX).unwrap_or_else(|_| input.to_string())
    } else {
        input.to_string()
    };

    let decoded = decode_entities(&plain);
    collapse_whitespace(&decoded)
}

#[must_use]
pub fn decode_entities(input: &str) -> String {
    let mut out = input.to_string();
    for (entity, replacement) in NAMED_ENTITIES {
        out = out.replace(entity, replacement);
    }
    out
}

#[must_use]
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes `{yes,true,explicit}` / `{no,false,clean}` to a bool;
/// anything else is `None` (§4.B).
#[must_use]
pub fn normalize_explicit(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "explicit" => Some(true),
        "no" | "false" | "clean" => Some(false),
        _ => None,
    }
}

/// Rewrites `feed://` to `https://`; leaves other schemes untouched.
#[must_use]
pub fn rewrite_feed_scheme(url: &str) -> String {
    url.strip_prefix("feed://")
        .map_or_else(|| url.to_string(), |rest| format!("https://{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_decodes_entities() {
        let out = strip_html("<p>Rock &amp; Roll &mdash; it&#39;s &quot;loud&quot;</p>");
        assert_eq!(out, "Rock & Roll — it's \"loud\"");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(collapse_whitespace("a   b\n\tc"), "a b c");
    }

    #[test]
    fn explicit_flag_normalization() {
        assert_eq!(normalize_explicit("Yes"), Some(true));
        assert_eq!(normalize_explicit("clean"), Some(false));
        assert_eq!(normalize_explicit("maybe"), None);
    }

    #[test]
    fn feed_scheme_rewrite() {
        assert_eq!(
            rewrite_feed_scheme("feed://example.com/rss"),
            "https://example.com/rss"
        );
        assert_eq!(
            rewrite_feed_scheme("https://example.com/rss"),
            "https://example.com/rss"
        );
    }
}
