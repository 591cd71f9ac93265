//! State cookie encoding.
//!
//! Values travel URL-encoded in a cookie scoped to the exact request path.
//! Reads decode opportunistically: only values that contain a `%XX`
//! sequence are decoded, and a failed decode yields the raw value. This lets
//! clients re-submit values they already decoded without double-decoding
//! errors.

use std::borrow::Cow;

/// One year.
pub const MAX_AGE_SECS: u64 = 365 * 24 * 3600;

/// Largest `name=value` pair browsers reliably store; larger cookies are
/// dropped silently.
pub const MAX_COOKIE_PAIR_BYTES: usize = 4096;

/// Whether the encoded `name=value` pair for `value` fits in one cookie.
pub fn fits_in_cookie(name: &str, value: &str) -> bool {
    name.len() + 1 + urlencoding::encode(value).len() <= MAX_COOKIE_PAIR_BYTES
}

/// Build the `Set-Cookie` value for a state write.
///
/// Always `Secure; SameSite=None` since the state is read cross-site.
pub fn make_state_cookie(name: &str, path: &str, value: &str) -> String {
    [
        format!("{}={}", name, urlencoding::encode(value)),
        format!("Path={}", path),
        format!("Max-Age={}", MAX_AGE_SECS),
        "Secure".into(),
        "SameSite=None".into(),
    ]
    .join("; ")
}

/// Whether `value` contains at least one `%XX` escape.
pub fn has_percent_escape(value: &str) -> bool {
    value
        .as_bytes()
        .windows(3)
        .any(|w| w[0] == b'%' && w[1].is_ascii_hexdigit() && w[2].is_ascii_hexdigit())
}

/// Decode `value` if it looks percent-encoded; otherwise return it untouched.
pub fn decode_opportunistic(value: &str) -> Cow<'_, str> {
    if !has_percent_escape(value) {
        return Cow::Borrowed(value);
    }
    match urlencoding::decode(value) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(value),
    }
}
