//! The resolution loop: fetch, scan, then build streams or follow the next URL.

use std::sync::Arc;

use reqwest::Client;
use reqwest::header::HeaderMap;
use tracing::{debug, error, info, warn};

use crate::builder::StreamBuilder;
use crate::dispatch::entry_url;
use crate::error::{FetchError, ResolveError};
use crate::fetch::{FetchRequest, FetchResponse, HttpFetcher, PageFetcher, RequestProfile};
use crate::media::StreamMap;
use crate::options::ResolveOptions;
use crate::parser::{ManifestParser, PlaylistParser};
use crate::policy::{filter_urls, is_referer_exception};
use crate::repair::{RepairedUrl, repair_url};
use crate::scanner::{ScanResult, scan};
use crate::session::ResolutionSession;

/// Outcome of one hop.
#[derive(Debug)]
enum Step {
    Streams(StreamMap),
    Follow(String),
}

/// Follows iframes and redirects from a page until playable streams are found.
#[derive(Clone)]
pub struct Resolver {
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn PlaylistParser>,
}

impl Resolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: Arc<dyn PlaylistParser>) -> Self {
        Self { fetcher, parser }
    }

    /// Uses `fetcher` for pages and manifests alike.
    pub fn with_fetcher(fetcher: Arc<dyn PageFetcher>) -> Self {
        let parser = Arc::new(ManifestParser::new(fetcher.clone()));
        Self::new(fetcher, parser)
    }

    pub fn with_client(client: Client) -> Self {
        Self::with_fetcher(Arc::new(HttpFetcher::new(client)))
    }

    pub fn with_default_client() -> Result<Self, ResolveError> {
        Ok(Self::with_fetcher(Arc::new(HttpFetcher::with_default_client()?)))
    }

    /// Resolves `url` with a fresh session.
    pub async fn resolve(
        &self,
        url: &str,
        options: &ResolveOptions,
    ) -> Result<StreamMap, ResolveError> {
        let url = entry_url(url);
        let mut session = ResolutionSession::new(&url, options)?;
        self.resolve_in(&url, &mut session).await
    }

    /// Resolves `url` inside an existing session. URLs the session already
    /// visited are not fetched again.
    pub async fn resolve_in(
        &self,
        url: &str,
        session: &mut ResolutionSession,
    ) -> Result<StreamMap, ResolveError> {
        let mut next = entry_url(url);
        loop {
            match self.step(&next, session).await? {
                Step::Streams(streams) => return Ok(streams),
                Step::Follow(url) => next = url,
            }
        }
    }

    async fn step(&self, url: &str, session: &mut ResolutionSession) -> Result<Step, ResolveError> {
        if session.has_visited(url) {
            debug!(url, "Already visited");
            return Err(ResolveError::Cycle(url.to_string()));
        }

        let referer = session.visit(url);
        if is_referer_exception(url) {
            session.set_referer(None);
        }
        info!("  {}. URL={}", session.depth(), url);
        debug!(referer = %referer, "Referer");

        let response = self.fetch_page(url, session.headers()).await?;
        let page_url = response.final_url.as_str();
        let found = scan(&response.text);

        for rtmp in &found.rtmp_urls {
            info!(url = %rtmp, "Found RTMP url, RTMP streams are not resolved");
        }

        if let Some(streams) = self.playlists(url, page_url, &found, session).await? {
            return Ok(Step::Streams(streams));
        }

        if let Some(iframe) = first_iframe(page_url, &found, session) {
            return Ok(Step::Follow(iframe));
        }

        if let Some(redirect) = &found.redirect {
            let target = repair_url(&redirect.raw, page_url, None);
            debug!(url = %target, "Following window.location");
            return Ok(Step::Follow(target));
        }

        Err(ResolveError::NoStreamsFound(url.to_string()))
    }

    async fn fetch_page(&self, url: &str, headers: &HeaderMap) -> Result<FetchResponse, ResolveError> {
        let request = FetchRequest::new(url, headers);
        let response = match self.fetcher.fetch(request).await {
            Ok(response) => response,
            Err(FetchError::Encoding(e)) => {
                warn!(url, error = %e, "Could not decode response, retrying with alternate headers");
                self.fetcher
                    .fetch(request.with_profile(RequestProfile::Alternate))
                    .await?
            }
            Err(e) => return Err(e.into()),
        };

        match response.status {
            403 => {
                error!("Website Access Denied/Forbidden, you might be geo-blocked or other params are missing.");
                return Err(ResolveError::Forbidden(url.to_string()));
            }
            404 => {
                error!("Website was not found, the link is broken or dead.");
                return Err(ResolveError::NotFound(url.to_string()));
            }
            status if status >= 400 => {
                return Err(ResolveError::HttpStatus {
                    status,
                    url: url.to_string(),
                });
            }
            _ => {}
        }

        if !response.history.is_empty() {
            for hop in &response.history {
                debug!("Redirect: {}", hop);
            }
            debug!("URL: {}", response.final_url);
        }
        Ok(response)
    }

    /// Builds streams from the playlists on the page. `None` when no playlist
    /// candidate survives filtering.
    async fn playlists(
        &self,
        url: &str,
        page_url: &str,
        found: &ScanResult,
        session: &mut ResolutionSession,
    ) -> Result<Option<StreamMap>, ResolveError> {
        if found.playlists.is_empty() {
            debug!("No Playlists");
            return Ok(None);
        }
        debug!("Found Playlists: {}", found.playlists.len());

        let stream_base = found.stream_base.as_deref();
        let repaired: Vec<RepairedUrl> = found
            .playlists
            .iter()
            .map(|candidate| {
                let base = stream_base.filter(|_| candidate.is_hds_manifest());
                RepairedUrl::from_candidate(candidate, page_url, base)
            })
            .collect();

        let playlists = filter_urls(&repaired, session);
        if playlists.is_empty() {
            return Ok(None);
        }
        info!("Found Playlists: {} (valid)", playlists.len());

        let referer = session.playlist_referer(url).to_owned();
        session.set_referer(Some(&referer));

        let streams = StreamBuilder::new(self.parser.as_ref(), session.headers(), session.playlist_max())
            .build(&playlists)
            .await;
        if streams.is_empty() {
            return Err(ResolveError::NoStreamsFound(url.to_string()));
        }
        Ok(Some(streams))
    }
}

/// The first surviving iframe in sorted order. The others are logged and
/// dropped.
fn first_iframe(page_url: &str, found: &ScanResult, session: &ResolutionSession) -> Option<String> {
    if found.iframes.is_empty() {
        debug!("No Iframes");
        return None;
    }
    debug!("Found Iframes: {}", found.iframes.len());

    let repaired: Vec<RepairedUrl> = found
        .iframes
        .iter()
        .map(|candidate| RepairedUrl::from_candidate(candidate, page_url, None))
        .collect();
    let iframes = filter_urls(&repaired, session);
    let (first, rest) = iframes.split_first()?;

    info!("Found Iframes: {} (valid)", iframes.len());
    info!("IFRAME URL - {}", first);
    for skipped in rest {
        info!("Skip - {}", skipped);
    }
    Some(first.clone())
}
