//! Visitor identity cookie.

use crate::types::random_url_safe_id;

/// Cookie carrying the visitor id.
pub const VISITOR_COOKIE_NAME: &str = "visitor_id";

/// Cookie lifetime in seconds (365 days).
pub const VISITOR_COOKIE_MAX_AGE: u64 = 31_536_000;

/// Length of generated visitor ids.
pub const VISITOR_ID_LENGTH: usize = 21;

/// An existing or freshly generated visitor id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorIdResult {
    /// The visitor id.
    pub visitor_id: String,
    /// Whether the id was generated for this request.
    pub is_new: bool,
}

/// Read the visitor id from a `Cookie` header, or generate one.
///
/// Does not set anything; when `is_new` is true the caller sends
/// [`visitor_set_cookie`].
pub fn visitor_from_cookie_header(header: Option<&str>) -> VisitorIdResult {
    let existing = header.and_then(|h| {
        h.split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == VISITOR_COOKIE_NAME)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    });

    match existing {
        Some(visitor_id) => VisitorIdResult {
            visitor_id: visitor_id.to_string(),
            is_new: false,
        },
        None => VisitorIdResult {
            visitor_id: random_url_safe_id(VISITOR_ID_LENGTH),
            is_new: true,
        },
    }
}

/// `Set-Cookie` value persisting a visitor id.
pub fn visitor_set_cookie(visitor_id: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        VISITOR_COOKIE_NAME, visitor_id, VISITOR_COOKIE_MAX_AGE
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
