//! Turns candidate strings scraped from page text into absolute URLs.

use tracing::trace;
use url::Url;

use crate::scanner::{Candidate, CandidateKind};

/// An absolute URL derived from a [`Candidate`], keeping the candidate's kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepairedUrl {
    pub url: String,
    pub kind: CandidateKind,
}

impl RepairedUrl {
    pub fn from_candidate(candidate: &Candidate, base_url: &str, stream_base: Option<&str>) -> Self {
        Self {
            url: repair_url(&candidate.raw, base_url, stream_base),
            kind: candidate.kind,
        }
    }
}

/// Repairs a broken or partial URL.
///
/// - drops every `\` (JSON escaped slashes)
/// - fixes the `http&#58;//` and `https&#58;//` entity escaped schemes
/// - resolves against `stream_base` when one is given and the URL is not
///   scheme relative, otherwise against `base_url`
///
/// URLs that cannot be joined are returned cleaned but otherwise untouched,
/// the policy filter rejects them later.
pub fn repair_url(raw: &str, base_url: &str, stream_base: Option<&str>) -> String {
    let mut new_url = raw.replace('\\', "");

    if let Some(rest) = new_url.strip_prefix("http&#58;//") {
        new_url = format!("http://{rest}");
    } else if let Some(rest) = new_url.strip_prefix("https&#58;//") {
        new_url = format!("https://{rest}");
    }

    match stream_base.filter(|b| !b.is_empty()) {
        Some(stream_base) if !new_url.starts_with("//") => {
            let relative = new_url.strip_prefix('/').unwrap_or(&new_url);
            join(stream_base, relative)
        }
        _ => join(base_url, &new_url),
    }
}

fn join(base: &str, url: &str) -> String {
    match Url::parse(base).and_then(|base| base.join(url)) {
        Ok(joined) => joined.into(),
        Err(e) => {
            trace!(error = %e, url, base, "Could not join url");
            url.to_owned()
        }
    }
}

/// Prepends `scheme` to URLs that carry none.
///
/// `//host/path` becomes `scheme://host/path`, `host/path` becomes
/// `scheme://host/path`, anything with a scheme is returned as is.
pub fn update_scheme(scheme: &str, url: &str) -> String {
    let scheme = scheme.trim_end_matches("://").trim_end_matches(':');
    if url.starts_with("//") {
        format!("{scheme}:{url}")
    } else if url.contains("://") {
        url.to_owned()
    } else {
        format!("{scheme}://{url}")
    }
}
