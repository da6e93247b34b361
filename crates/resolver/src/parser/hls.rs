use m3u8_rs::Playlist;
use url::Url;

use super::playlist_error;
use crate::error::ResolveError;
use crate::media::{Stream, StreamFormat, StreamMap};

/// Parses an HLS playlist fetched from `url`.
///
/// Master playlist variants are named by height (`720p`), or by bandwidth in
/// kbit (`640k`) when no resolution is declared. I-frame only variants are
/// skipped. A media playlist yields an empty map.
pub fn parse_m3u8(url: &str, text: &str) -> Result<StreamMap, ResolveError> {
    let base_url = Url::parse(url).map_err(|e| playlist_error(url, e))?;
    let playlist =
        m3u8_rs::parse_playlist_res(text.as_bytes()).map_err(|e| playlist_error(url, e))?;

    let master = match playlist {
        Playlist::MasterPlaylist(pl) => pl,
        Playlist::MediaPlaylist(_) => return Ok(StreamMap::new()),
    };

    let mut streams = StreamMap::new();
    for variant in master.variants.into_iter().filter(|v| !v.is_i_frame) {
        let Ok(stream_url) = base_url.join(&variant.uri) else {
            continue;
        };
        let bitrate = variant.bandwidth / 1000;
        let name = match &variant.resolution {
            Some(res) => format!("{}p", res.height),
            None => format!("{bitrate}k"),
        };

        let stream = Stream::new(stream_url, StreamFormat::Hls)
            .bitrate(bitrate)
            .resolution_opt(
                variant
                    .resolution
                    .map(|r| format!("{}x{}", r.width, r.height)),
            )
            .codec(variant.codecs.unwrap_or_default());
        streams.insert(name, stream);
    }
    Ok(streams)
}
