//! Playlist collaborators: turn a playlist URL into named streams.

mod dash;
mod hds;
mod hls;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::debug;

use crate::error::ResolveError;
use crate::fetch::{FetchRequest, PageFetcher};
use crate::media::{Stream, StreamFormat, StreamMap};

pub use dash::parse_mpd;
pub use hds::parse_f4m;
pub use hls::parse_m3u8;

#[async_trait]
pub trait PlaylistParser: Send + Sync {
    /// Variants of an HLS master playlist. A media playlist yields an empty
    /// map, the caller decides how to name it.
    async fn parse_hls_variants(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<StreamMap, ResolveError>;

    async fn parse_hds_manifest(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<StreamMap, ResolveError>;

    async fn parse_dash_manifest(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<StreamMap, ResolveError>;

    /// A direct `.mp3`/`.mp4` stream. Nothing is fetched.
    fn progressive_stream(&self, url: &str, headers: &HeaderMap) -> Result<Stream, ResolveError> {
        url::Url::parse(url).map_err(|e| ResolveError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Stream::new(url, StreamFormat::Http).headers(header_pairs(headers)))
    }
}

/// Default [`PlaylistParser`], fetching manifests through a [`PageFetcher`].
#[derive(Clone)]
pub struct ManifestParser {
    fetcher: Arc<dyn PageFetcher>,
}

impl ManifestParser {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    async fn fetch_manifest(&self, url: &str, headers: &HeaderMap) -> Result<String, ResolveError> {
        let response = self.fetcher.fetch(FetchRequest::new(url, headers)).await?;
        if response.status >= 400 {
            return Err(ResolveError::HttpStatus {
                status: response.status,
                url: url.to_string(),
            });
        }
        debug!(url, len = response.text.len(), "Fetched manifest");
        Ok(response.text)
    }
}

#[async_trait]
impl PlaylistParser for ManifestParser {
    async fn parse_hls_variants(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<StreamMap, ResolveError> {
        let text = self.fetch_manifest(url, headers).await?;
        let streams = parse_m3u8(url, &text)?;
        Ok(with_headers(streams, headers))
    }

    async fn parse_hds_manifest(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<StreamMap, ResolveError> {
        let text = self.fetch_manifest(url, headers).await?;
        let streams = parse_f4m(url, &text)?;
        Ok(with_headers(streams, headers))
    }

    async fn parse_dash_manifest(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<StreamMap, ResolveError> {
        let text = self.fetch_manifest(url, headers).await?;
        let streams = parse_mpd(url, &text)?;
        Ok(with_headers(streams, headers))
    }
}

fn with_headers(mut streams: StreamMap, headers: &HeaderMap) -> StreamMap {
    let pairs = header_pairs(headers);
    for stream in streams.values_mut() {
        stream.headers = pairs.clone();
    }
    streams
}

/// Headers a player needs to replay the request, as plain strings.
pub fn header_pairs(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn playlist_error(url: &str, reason: impl std::fmt::Display) -> ResolveError {
    ResolveError::Playlist(format!("{url}: {reason}"))
}
