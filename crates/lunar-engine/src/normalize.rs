//! Markup flattening for fetched calendar pages.
//!
//! The extractor only ever sees the output of [`normalize_markup`]: no tags, no
//! script or style bodies, and single spaces between words.

use std::sync::OnceLock;

use regex::Regex;

struct MarkupPatterns {
    script: Regex,
    style: Regex,
    tag: Regex,
    whitespace: Regex,
}

fn patterns() -> &'static MarkupPatterns {
    static PATTERNS: OnceLock<MarkupPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| MarkupPatterns {
        script: Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex"),
        style: Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex"),
        tag: Regex::new(r"<[^>]+>").expect("valid regex"),
        whitespace: Regex::new(r"\s+").expect("valid regex"),
    })
}

/// Flatten raw page markup into a single normalized line of text.
///
/// Script and style blocks are dropped together with their contents, every
/// remaining tag is replaced by a space, and whitespace runs collapse to one
/// space. Empty input yields an empty string.
///
/// # Examples
///
/// ```
/// use lunar_engine::normalize::normalize_markup;
///
/// let html = "<div><b>6-й</b>\n лунный день</div><script>var x = 1;</script>";
/// assert_eq!(normalize_markup(html), "6-й лунный день");
/// ```
pub fn normalize_markup(raw: &str) -> String {
    let p = patterns();
    let text = p.script.replace_all(raw, " ");
    let text = p.style.replace_all(&text, " ");
    let text = p.tag.replace_all(&text, " ");
    let text = p.whitespace.replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_markup(""), "");
        assert_eq!(normalize_markup("   \n\t "), "");
    }

    #[test]
    fn test_strips_tags_and_collapses_whitespace() {
        let html = "<p>До   11:42</p>\n\n<span>—</span>\t6-й лунный день";
        assert_eq!(normalize_markup(html), "До 11:42 — 6-й лунный день");
    }

    #[test]
    fn test_drops_script_and_style_bodies() {
        let html = r#"<head><style type="text/css">.moon { color: red; }</style>
<SCRIPT async src="x.js">window.day = "7-й лунный день";</SCRIPT></head>
<body>6-й лунный день</body>"#;
        assert_eq!(normalize_markup(html), "6-й лунный день");
    }

    #[test]
    fn test_multiline_script_removed() {
        let html = "a<script>\nline1\nline2\n</script>b";
        assert_eq!(normalize_markup(html), "a b");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(normalize_markup("6 лунный день"), "6 лунный день");
    }
}
