//! Header helpers shared by the compiler and the matcher.

use std::borrow::Cow;

/// Marker that opts a configured header out of the global prefix.
pub const RAW_HEADER_MARKER: &str = "__";

/// Combines a configured header with the global prefix.
///
/// `"__查询"` stays `"查询"`; anything else becomes `prefix + header`.
pub fn combine_header(raw: &str, prefix: &str) -> String {
    match raw.strip_prefix(RAW_HEADER_MARKER) {
        Some(rest) => rest.trim_start().to_string(),
        None => format!("{prefix}{raw}"),
    }
}

/// Returns the header with the first occurrence of the prefix removed.
pub fn bare_header<'a>(header: &'a str, prefix: &str) -> Cow<'a, str> {
    if prefix.is_empty() || !header.contains(prefix) {
        Cow::Borrowed(header)
    } else {
        Cow::Owned(header.replacen(prefix, "", 1))
    }
}

/// Returns true if the text contains a CJK unified ideograph.
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fa5}').contains(&c))
}
