use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::StreamFormat;

/// Streams keyed by their name ("live", "720p", "3283k", ...).
///
/// Inserting a name twice keeps the later stream.
pub type StreamMap = BTreeMap<String, Stream>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Stream {
    // Url of the stream (variant playlist, media url or manifest)
    pub url: String,
    pub format: StreamFormat,
    // Bitrate in kbit/s, 0 when unknown
    pub bitrate: u64,
    // e.g. "1280x720"
    pub resolution: Option<String>,
    pub codec: String,
    // Headers a player must send to fetch the stream (Referer, User-Agent)
    pub headers: BTreeMap<String, String>,
    pub extras: Option<BTreeMap<String, String>>,
}

impl Stream {
    pub fn new(url: impl Into<String>, format: StreamFormat) -> Self {
        Self {
            url: url.into(),
            format,
            bitrate: 0,
            resolution: None,
            codec: String::new(),
            headers: BTreeMap::new(),
            extras: None,
        }
    }

    pub fn bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn resolution_opt(mut self, resolution: Option<String>) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.resolution, self.bitrate) {
            (Some(res), 0) => write!(f, "{} - {} ({})", self.format, res, self.url),
            (Some(res), kbps) => write!(f, "{} - {} {}k ({})", self.format, res, kbps, self.url),
            (None, 0) => write!(f, "{} ({})", self.format, self.url),
            (None, kbps) => write!(f, "{} - {}k ({})", self.format, kbps, self.url),
        }
    }
}
