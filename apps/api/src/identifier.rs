//! Resolves storage locations from the options document.
//!
//! A location is either a bare resource identifier or a share URL carrying the
//! identifier in a `/folders/<id>` or `/d/<id>` path segment.

/// Minimum length of a bare identifier. Shorter strings are treated as unresolvable.
const MIN_BARE_LEN: usize = 20;

/// Path markers that precede an identifier inside a URL, tried in order.
const PATH_MARKERS: &[&str] = &["/folders/", "/d/"];

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Extracts the resource identifier from a bare id or a share URL.
///
/// Returns `None` when nothing matches. Callers treat that as a configuration
/// error; this function never fails on its own.
pub fn extract_resource_id(url_or_id: &str) -> Option<String> {
    let input = url_or_id.trim();
    if input.is_empty() {
        return None;
    }

    if input.chars().count() >= MIN_BARE_LEN && input.chars().all(is_id_char) {
        return Some(input.to_string());
    }

    for marker in PATH_MARKERS {
        if let Some(pos) = input.find(marker) {
            let id: String = input[pos + marker.len()..]
                .chars()
                .take_while(|c| is_id_char(*c))
                .collect();
            if !id.is_empty() {
                return Some(id);
            }
        }
    }

    None
}
