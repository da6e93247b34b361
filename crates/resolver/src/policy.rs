//! Allow and deny rules applied to repaired candidate URLs.
//!
//! Rules are evaluated in a fixed order and the first one that matches
//! decides the reported [`RejectReason`]. Netloc and path rules are literal
//! suffix and prefix comparisons.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::options::ResolveOptions;
use crate::repair::{RepairedUrl, update_scheme};
use crate::scanner::CandidateKind;
use crate::session::ResolutionSession;
use crate::utils::ends_with_any;

/// Not allowed at the end of the netloc.
pub const STATIC_BLACKLIST_NETLOC: &[&str] = &[
    "127.0.0.1",
    "about:blank",
    "abv.bg",
    "adfox.ru",
    "googletagmanager.com",
    "javascript:false",
];

/// `(netloc suffix, path prefix)` pairs that are never followed.
pub const STATIC_BLACKLIST_PATH: &[(&str, &str)] = &[
    ("expressen.se", "/_livetvpreview/"),
    ("facebook.com", "/connect"),
    ("facebook.com", "/plugins"),
    ("haber7.com", "/radyohome/station-widget/"),
    ("static.tvr.by", "/upload/video/atn/promo"),
    ("twitter.com", "/widgets"),
    ("vesti.ru", "/native_widget.html"),
];

/// Not allowed at the end of the path: images, subtitles and chat rooms.
pub const BLACKLIST_ENDSWITH: &[&str] = &[
    ".gif",
    ".jpg",
    ".png",
    ".svg",
    ".vtt",
    "/chat.html",
    "/chat",
];

/// Hosts whose players refuse a carried over Referer.
pub const REFERER_EXCEPTIONS: &[&str] = &["dailymotion.com"];

static ADS_PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:/(?:static|\d+))?/ads?/?(?:\w+)?(?:\d+x\d+)?(?:_\w+)?\.(?:html?|php)")
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    SameUrl,
    Scheme,
    WhitelistNetloc,
    WhitelistPath,
    BlacklistStatic,
    BlacklistNetloc,
    BlacklistPath,
    BlacklistEndswith,
    AdsPath,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::SameUrl => "SAME-URL",
            RejectReason::Scheme => "SCHEME",
            RejectReason::WhitelistNetloc => "WL-netloc",
            RejectReason::WhitelistPath => "WL-path",
            RejectReason::BlacklistStatic => "BL-static",
            RejectReason::BlacklistNetloc => "BL-netloc",
            RejectReason::BlacklistPath => "BL-path",
            RejectReason::BlacklistEndswith => "BL-ew",
            RejectReason::AdsPath => "ADS",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Keep,
    Reject(RejectReason),
}

/// `urlparse`-style split of a URL string. Never fails: missing parts are
/// empty, so URLs the `url` crate refuses (`http://about:blank`) can still
/// be matched against the deny lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub scheme: &'a str,
    pub netloc: &'a str,
    pub path: &'a str,
}

impl<'a> UrlParts<'a> {
    pub fn split(url: &'a str) -> Self {
        let (scheme, rest) = match url.split_once(':') {
            Some((scheme, rest)) if is_scheme(scheme) => (scheme, rest),
            _ => ("", url),
        };

        let (netloc, rest) = match rest.strip_prefix("//") {
            Some(authority) => {
                let end = authority
                    .find(|c: char| matches!(c, '/' | '?' | '#'))
                    .unwrap_or(authority.len());
                (&authority[..end], &authority[end..])
            }
            None => ("", rest),
        };

        let path_end = rest
            .find(|c: char| matches!(c, '?' | '#'))
            .unwrap_or(rest.len());

        Self {
            scheme,
            netloc,
            path: &rest[..path_end],
        }
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Merged allow/deny configuration, computed once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    pub blacklist_netloc: Vec<String>,
    /// Static pairs followed by the user supplied ones.
    pub blacklist_path: Vec<(String, String)>,
    pub whitelist_netloc: Vec<String>,
    pub whitelist_path: Vec<(String, String)>,
}

impl Policy {
    pub fn from_options(options: &ResolveOptions) -> Self {
        let static_paths = STATIC_BLACKLIST_PATH
            .iter()
            .map(|(netloc, path)| (netloc.to_string(), path.to_string()))
            .collect();

        Self {
            blacklist_netloc: clean_list(&options.blacklist_netloc),
            blacklist_path: merge_path_list(static_paths, &options.blacklist_path),
            whitelist_netloc: clean_list(&options.whitelist_netloc),
            whitelist_path: merge_path_list(Vec::new(), &options.whitelist_path),
        }
    }
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Appends user `host/path` entries to `base` as `(netloc, path)` pairs.
///
/// Entries without a scheme are read as `http://`; entries missing either
/// the host or the path are dropped.
pub fn merge_path_list(mut base: Vec<(String, String)>, user: &[String]) -> Vec<(String, String)> {
    for entry in user.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        let entry = if entry.starts_with("http") || entry.starts_with("//") {
            entry.to_owned()
        } else {
            update_scheme("http", entry)
        };
        let parts = UrlParts::split(&entry);
        if parts.netloc.is_empty() || parts.path.is_empty() {
            debug!(entry = %entry, "Ignoring path list entry without host or path");
            continue;
        }
        base.push((parts.netloc.to_owned(), parts.path.to_owned()));
    }
    base
}

/// Whether the URL's netloc ends with and its path starts with one of the pairs.
pub fn compare_url_path(parts: &UrlParts<'_>, pairs: &[(String, String)]) -> bool {
    pairs
        .iter()
        .any(|(netloc, path)| parts.netloc.ends_with(netloc.as_str()) && parts.path.starts_with(path.as_str()))
}

pub fn is_referer_exception(url: &str) -> bool {
    ends_with_any(UrlParts::split(url).netloc, REFERER_EXCEPTIONS)
}

struct RuleInput<'a> {
    url: &'a str,
    parts: UrlParts<'a>,
    kind: CandidateKind,
    visited: &'a [String],
    policy: &'a Policy,
}

type Rule = (RejectReason, fn(&RuleInput<'_>) -> bool);

fn same_url(i: &RuleInput<'_>) -> bool {
    i.visited.iter().any(|v| v == i.url)
}

fn bad_scheme(i: &RuleInput<'_>) -> bool {
    !matches!(i.parts.scheme.to_ascii_lowercase().as_str(), "http" | "https")
}

fn outside_whitelist_netloc(i: &RuleInput<'_>) -> bool {
    i.kind == CandidateKind::Iframe
        && !i.policy.whitelist_netloc.is_empty()
        && !ends_with_any(i.parts.netloc, &i.policy.whitelist_netloc)
}

fn outside_whitelist_path(i: &RuleInput<'_>) -> bool {
    i.kind == CandidateKind::Iframe
        && !i.policy.whitelist_path.is_empty()
        && !compare_url_path(&i.parts, &i.policy.whitelist_path)
}

fn static_netloc(i: &RuleInput<'_>) -> bool {
    ends_with_any(i.parts.netloc, STATIC_BLACKLIST_NETLOC)
}

fn user_netloc(i: &RuleInput<'_>) -> bool {
    ends_with_any(i.parts.netloc, &i.policy.blacklist_netloc)
}

fn denied_path(i: &RuleInput<'_>) -> bool {
    compare_url_path(&i.parts, &i.policy.blacklist_path)
}

fn denied_suffix(i: &RuleInput<'_>) -> bool {
    ends_with_any(i.parts.path, BLACKLIST_ENDSWITH)
}

fn ads_path(i: &RuleInput<'_>) -> bool {
    ADS_PATH_REGEX.is_match(i.parts.path)
}

// Order matters: the first matching rule is the reported reason.
const RULES: [Rule; 9] = [
    (RejectReason::SameUrl, same_url),
    (RejectReason::Scheme, bad_scheme),
    (RejectReason::WhitelistNetloc, outside_whitelist_netloc),
    (RejectReason::WhitelistPath, outside_whitelist_path),
    (RejectReason::BlacklistStatic, static_netloc),
    (RejectReason::BlacklistNetloc, user_netloc),
    (RejectReason::BlacklistPath, denied_path),
    (RejectReason::BlacklistEndswith, denied_suffix),
    (RejectReason::AdsPath, ads_path),
];

/// Runs the rules in order and reports the first one that matches.
pub fn evaluate(url: &str, kind: CandidateKind, visited: &[String], policy: &Policy) -> FilterVerdict {
    let input = RuleInput {
        url,
        parts: UrlParts::split(url),
        kind,
        visited,
        policy,
    };

    RULES
        .iter()
        .find(|(_, rule)| rule(&input))
        .map_or(FilterVerdict::Keep, |(reason, _)| FilterVerdict::Reject(*reason))
}

/// Drops rejected URLs and returns the rest deduplicated and sorted.
pub fn filter_urls(urls: &[RepairedUrl], session: &ResolutionSession) -> Vec<String> {
    let mut kept = Vec::with_capacity(urls.len());
    for repaired in urls {
        match evaluate(&repaired.url, repaired.kind, session.visited(), session.policy()) {
            FilterVerdict::Keep => kept.push(repaired.url.as_str()),
            FilterVerdict::Reject(reason) => {
                debug!(reason = %reason, url = %repaired.url, "Removed");
            }
        }
    }

    debug!("List length: {} (with duplicates)", kept.len());
    kept.into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(ToOwned::to_owned)
        .collect()
}
