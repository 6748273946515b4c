//! Human readable names derived from listing URL slugs.

use crate::url_path;

const BED_AND_BREAKFAST: &str = "B&B";
const BED_AND_BREAKFAST_ALIASES: &[&str] = &["bb", "b&b", "benb"];

/// Derives a display name from the last meaningful path segment of `url`.
///
/// A trailing numeric segment (listing id) is skipped when a slug precedes it.
///
/// ```
/// use lsc_extract::derive_name;
///
/// let url = "https://x/overnachten/hotels/detail/hotel-de-kroon/12345/";
/// assert_eq!(derive_name(url), "Hotel De Kroon");
/// ```
pub fn derive_name(url: &str) -> String {
    let path = url_path(url);
    let segments = path.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>();

    let slug = match segments.as_slice() {
        [] => return String::new(),
        [.., prev, last] if is_numeric(last) => prev,
        [.., last] => last,
    };

    let slug = urlencoding::decode(slug)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| slug.to_string());

    slug.replace('-', " ")
        .split_whitespace()
        .map(title_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
}

fn title_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if BED_AND_BREAKFAST_ALIASES.contains(&lower.as_str()) {
        return BED_AND_BREAKFAST.to_string();
    }

    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
