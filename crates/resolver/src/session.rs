//! State shared by every hop of one top-level resolution.

use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use tracing::debug;

use crate::error::ResolveError;
use crate::options::ResolveOptions;
use crate::policy::{Policy, UrlParts};
use crate::utils::ends_with_any;

pub const FIREFOX_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0";
pub const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1";

/// Hosts served the mobile player only.
const IPHONE_HOSTS: &[&str] = &["bigo.tv"];

/// Visited URLs, the derived referer chain, the merged policy and the
/// request headers of one resolution.
///
/// A session is built once per top-level call and passed by `&mut` into every
/// hop. Sharing one across sequential resolutions suppresses cycles between
/// them, sharing one across concurrent resolutions is not supported.
#[derive(Debug, Clone)]
pub struct ResolutionSession {
    visited: Vec<String>,
    policy: Policy,
    headers: HeaderMap,
    playlist_max: usize,
    playlist_referer: Option<String>,
}

impl ResolutionSession {
    pub fn new(entry_url: &str, options: &ResolveOptions) -> Result<Self, ResolveError> {
        options.validate()?;

        let user_agent = match options.user_agent.as_deref() {
            Some(ua) => ua,
            None => default_user_agent(entry_url),
        };
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| ResolveError::InvalidOption(format!("user_agent: {e}")))?,
        );
        debug!("User-Agent: {}", user_agent);

        Ok(Self {
            visited: Vec::new(),
            policy: Policy::from_options(options),
            headers,
            playlist_max: options.effective_playlist_max(),
            playlist_referer: options.playlist_referer.clone(),
        })
    }

    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    pub fn has_visited(&self, url: &str) -> bool {
        self.visited.iter().any(|v| v == url)
    }

    /// Number of pages fetched so far.
    pub fn depth(&self) -> usize {
        self.visited.len()
    }

    /// Referer for the next request: the last visited URL.
    pub fn referer(&self) -> Option<&str> {
        self.visited.last().map(String::as_str)
    }

    /// Records `url` as fetched and returns the referer to send with it,
    /// which is the previously visited URL or `url` itself on the first hop.
    pub fn visit(&mut self, url: &str) -> String {
        let referer = self.referer().unwrap_or(url).to_owned();
        self.visited.push(url.to_owned());
        self.set_referer(Some(&referer));
        referer
    }

    /// Sets or removes the `Referer` header. Values that are not valid
    /// header values are dropped.
    pub fn set_referer(&mut self, referer: Option<&str>) {
        match referer.and_then(|r| HeaderValue::from_str(r).ok()) {
            Some(value) => {
                self.headers.insert(REFERER, value);
            }
            None => {
                self.headers.remove(REFERER);
            }
        }
    }

    /// Referer sent while building streams found on `page_url`.
    pub fn playlist_referer<'a>(&'a self, page_url: &'a str) -> &'a str {
        self.playlist_referer.as_deref().unwrap_or(page_url)
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn playlist_max(&self) -> usize {
        self.playlist_max
    }
}

fn default_user_agent(url: &str) -> &'static str {
    if ends_with_any(UrlParts::split(url).netloc, IPHONE_HOSTS) {
        IPHONE_UA
    } else {
        FIREFOX_UA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ua(session: &ResolutionSession) -> &str {
        session
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[test]
    fn test_user_agent_by_host() {
        let options = ResolveOptions::default();

        let session = ResolutionSession::new("https://www.bigo.tv/123", &options).unwrap();
        assert_eq!(ua(&session), IPHONE_UA);

        let session = ResolutionSession::new("https://example.com/", &options).unwrap();
        assert_eq!(ua(&session), FIREFOX_UA);

        let options = ResolveOptions {
            user_agent: Some("custom/1.0".into()),
            ..Default::default()
        };
        let session = ResolutionSession::new("https://www.bigo.tv/123", &options).unwrap();
        assert_eq!(ua(&session), "custom/1.0");
    }

    #[test]
    fn test_referer_chain() {
        let mut session =
            ResolutionSession::new("http://a/", &ResolveOptions::default()).unwrap();
        assert_eq!(session.referer(), None);

        assert_eq!(session.visit("http://a/"), "http://a/");
        assert_eq!(session.visit("http://b/"), "http://a/");
        assert_eq!(session.visit("http://c/"), "http://b/");

        assert_eq!(session.visited(), ["http://a/", "http://b/", "http://c/"]);
        assert_eq!(session.depth(), 3);
        assert!(session.has_visited("http://b/"));
        assert_eq!(
            session.headers().get(REFERER).and_then(|v| v.to_str().ok()),
            Some("http://b/")
        );

        session.set_referer(None);
        assert!(session.headers().get(REFERER).is_none());
    }

    #[test]
    fn test_playlist_referer() {
        let session = ResolutionSession::new("http://a/", &ResolveOptions::default()).unwrap();
        assert_eq!(session.playlist_referer("http://a/page"), "http://a/page");

        let options = ResolveOptions {
            playlist_referer: Some("http://ref/".into()),
            ..Default::default()
        };
        let session = ResolutionSession::new("http://a/", &options).unwrap();
        assert_eq!(session.playlist_referer("http://a/page"), "http://ref/");
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = ResolveOptions {
            playlist_max: Some(100),
            ..Default::default()
        };
        assert!(ResolutionSession::new("http://a/", &options).is_err());
    }
}
