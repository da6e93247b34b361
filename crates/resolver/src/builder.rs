//! Turns surviving playlist URLs into named streams.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::HeaderMap;
use rustc_hash::FxHashMap;
use tracing::{debug, error};

use crate::error::ResolveError;
use crate::media::{PlaylistDescriptor, Stream, StreamFormat, StreamMap};
use crate::parser::{PlaylistParser, header_pairs};
use crate::utils::capture_named;

static HTTP_BITRATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(?P<bitrate>\d{1,4})\.mp(?:3|4)").unwrap());

/// Dispatches playlist URLs to a [`PlaylistParser`] by file extension.
///
/// At most `playlist_max` URLs are built per format. A URL that fails is
/// logged and skipped and does not count towards the limit.
pub struct StreamBuilder<'a> {
    parser: &'a dyn PlaylistParser,
    headers: &'a HeaderMap,
    playlist_max: usize,
}

impl<'a> StreamBuilder<'a> {
    pub fn new(parser: &'a dyn PlaylistParser, headers: &'a HeaderMap, playlist_max: usize) -> Self {
        Self {
            parser,
            headers,
            playlist_max,
        }
    }

    pub async fn build(&self, urls: &[String]) -> StreamMap {
        let mut streams = StreamMap::new();
        let mut built: FxHashMap<StreamFormat, usize> = FxHashMap::default();

        for url in urls {
            let Some(descriptor) = PlaylistDescriptor::parse(url) else {
                debug!(url = %url, "Skip - unknown playlist type");
                continue;
            };
            let format = descriptor.format;
            let count = built.entry(format).or_default();
            if *count >= self.playlist_max {
                debug!("Skip - {}", url);
                continue;
            }

            match self.build_one(url, format).await {
                Ok(found) => {
                    debug!("{} URL - {}", format.as_str().to_uppercase(), url);
                    *count += 1;
                    streams.extend(found);
                }
                Err(e) => {
                    error!(url = %url, "Skip {} with error {}", format.as_str().to_uppercase(), e);
                }
            }
        }
        streams
    }

    async fn build_one(
        &self,
        url: &str,
        format: StreamFormat,
    ) -> Result<Vec<(String, Stream)>, ResolveError> {
        let streams = match format {
            StreamFormat::Hls => {
                let variants = self.parser.parse_hls_variants(url, self.headers).await?;
                if variants.is_empty() {
                    let stream =
                        Stream::new(url, StreamFormat::Hls).headers(header_pairs(self.headers));
                    vec![("live".to_string(), stream)]
                } else {
                    variants.into_iter().collect()
                }
            }
            StreamFormat::Hds => self
                .parser
                .parse_hds_manifest(url, self.headers)
                .await?
                .into_iter()
                .collect(),
            StreamFormat::Dash => self
                .parser
                .parse_dash_manifest(url, self.headers)
                .await?
                .into_iter()
                .collect(),
            StreamFormat::Http => {
                let stream = self.parser.progressive_stream(url, self.headers)?;
                vec![(http_stream_name(url), stream)]
            }
        };
        Ok(streams)
    }
}

/// `<bitrate>k` when the URL carries a `_<digits>.mp3|mp4` token, `live` otherwise.
pub fn http_stream_name(url: &str) -> String {
    match capture_named(&HTTP_BITRATE_REGEX, url, "bitrate") {
        Some(bitrate) => format!("{bitrate}k"),
        None => "live".to_string(),
    }
}
