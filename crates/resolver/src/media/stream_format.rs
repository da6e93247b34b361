use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Hls,
    Hds,
    Dash,
    Http,
}

impl StreamFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamFormat::Hls => "hls",
            StreamFormat::Hds => "hds",
            StreamFormat::Dash => "dash",
            StreamFormat::Http => "http",
        }
    }

    /// Picks the format from the file extension at the end of a URL path.
    pub fn from_path(path: &str) -> Option<Self> {
        if path.ends_with(".m3u8") {
            Some(StreamFormat::Hls)
        } else if path.ends_with(".f4m") {
            Some(StreamFormat::Hds)
        } else if path.ends_with(".mpd") {
            Some(StreamFormat::Dash)
        } else if path.ends_with(".mp3") || path.ends_with(".mp4") {
            Some(StreamFormat::Http)
        } else {
            None
        }
    }
}

impl std::fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A playlist URL together with the parser it dispatches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistDescriptor {
    pub format: StreamFormat,
    pub url: Url,
}

impl PlaylistDescriptor {
    /// Returns `None` for URLs that do not parse or whose path carries none of
    /// the known playlist extensions.
    pub fn parse(url: &str) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        let format = StreamFormat::from_path(url.path())?;
        Some(Self { format, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(StreamFormat::from_path("/a/index.m3u8"), Some(StreamFormat::Hls));
        assert_eq!(StreamFormat::from_path("/manifest.f4m"), Some(StreamFormat::Hds));
        assert_eq!(StreamFormat::from_path("/manifest.mpd"), Some(StreamFormat::Dash));
        assert_eq!(StreamFormat::from_path("/music.mp3"), Some(StreamFormat::Http));
        assert_eq!(StreamFormat::from_path("/video_2000.mp4"), Some(StreamFormat::Http));
        assert_eq!(StreamFormat::from_path("/index.html"), None);
    }

    #[test]
    fn test_descriptor_ignores_query() {
        let d = PlaylistDescriptor::parse("http://example.com/live/playlist.m3u8?token=abc.mp4")
            .unwrap();
        assert_eq!(d.format, StreamFormat::Hls);
        assert_eq!(d.url.query(), Some("token=abc.mp4"));
    }

    #[test]
    fn test_descriptor_rejects_relative() {
        assert!(PlaylistDescriptor::parse("/live/playlist.m3u8").is_none());
    }
}
