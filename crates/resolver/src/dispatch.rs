//! Entry point selection for an upstream plugin dispatcher.
//!
//! A `resolve://` prefix asks the dispatcher to route a URL through this
//! resolver before any site specific extractor.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::repair::update_scheme;

pub const RESOLVE_PREFIX: &str = "resolve://";

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<prefix>resolve://)?(?P<url>.+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    NoPriority,
    High,
}

/// `High` for explicitly prefixed URLs, `NoPriority` for everything else so
/// site specific extractors win.
pub fn priority(url: &str) -> Priority {
    match URL_REGEX.captures(url) {
        Some(caps) if caps.name("prefix").is_some() => Priority::High,
        _ => Priority::NoPriority,
    }
}

/// Any non-empty URL can be tried.
pub fn can_handle_url(url: &str) -> bool {
    URL_REGEX.is_match(url)
}

pub fn strip_prefix(url: &str) -> &str {
    url.strip_prefix(RESOLVE_PREFIX).unwrap_or(url)
}

/// The URL the first hop fetches: prefix removed, `http://` added when no
/// scheme is present. Parseable URLs come back in the serialised form
/// repaired candidates use, so the visited list compares like with like.
pub fn entry_url(url: &str) -> String {
    let url = update_scheme("http", strip_prefix(url.trim()));
    match Url::parse(&url) {
        Ok(parsed) => parsed.into(),
        Err(_) => url,
    }
}
