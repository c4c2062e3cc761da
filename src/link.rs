//! Post link parsing.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::PostHandle;

static COMMENTS_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/comments/([^/?#]*)").expect("valid comments regex"));

/// Extract the post id from a Reddit link.
///
/// The id is the path token right after `/comments/`, cut at the next `/`,
/// `?` or `#`. Anything else (no segment, empty token) yields `None`.
pub fn extract_post_id(url: &str) -> Option<PostHandle> {
    let caps = COMMENTS_SEGMENT.captures(url.trim())?;
    let token = caps.get(1)?.as_str();
    if token.is_empty() {
        return None;
    }
    Some(PostHandle::new(token))
}
