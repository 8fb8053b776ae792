//! Slugs derived from note titles

use unicode_normalization::UnicodeNormalization;

/// Derive a URL-safe slug from a title
///
/// Lowercases, drops everything that is not alphanumeric and collapses runs of whitespace and
/// dashes into a single dash, without leading or trailing dashes. Accented letters lose their
/// accent instead of disappearing.
///
/// ```rust
/// assert_eq!(title_to_slug("Hello World!!"), "hello-world".to_string())
/// ```
pub fn title_to_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for ch in title.nfkd() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;

            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' {
            pending_separator = true;
        }
    }

    slug
}
