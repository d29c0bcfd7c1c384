//! Download filename synthesis from the report title.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Slug used when the title has no usable characters.
pub const FALLBACK_SLUG: &str = "rapport";

/// Extension of every generated deck.
pub const DECK_EXTENSION: &str = "pptx";

/// Turn a free-form title into a lowercase ASCII slug.
///
/// Accents are folded (`é` → `e`), anything outside `[a-z0-9]`, whitespace
/// and `-` is dropped, and runs of whitespace or dashes become a single `-`.
/// The result never starts or ends with `-`, so the function is idempotent.
pub fn slugify(title: &str) -> String {
    let folded: String = title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let slug = folded
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect::<String>()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// `slugify(title)` plus the deck extension.
pub fn deck_filename(title: &str) -> String {
    format!("{}.{}", slugify(title), DECK_EXTENSION)
}
