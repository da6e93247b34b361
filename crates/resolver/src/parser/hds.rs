use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use url::Url;

use super::playlist_error;
use crate::error::ResolveError;
use crate::media::{Stream, StreamFormat, StreamMap};

#[derive(Debug, Default)]
struct MediaEntry {
    url: String,
    bitrate: Option<u64>,
    width: Option<u64>,
    height: Option<u64>,
}

/// Parses an Adobe HDS (`.f4m`) manifest fetched from `url`.
///
/// One stream per `<media>` entry, named by its `bitrate` attribute
/// (`3283k`). Entries without a bitrate are named `live`. Media URLs are
/// resolved against `<baseURL>` when the manifest declares one.
pub fn parse_f4m(url: &str, text: &str) -> Result<StreamMap, ResolveError> {
    let manifest_url = Url::parse(url).map_err(|e| playlist_error(url, e))?;

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut base_url: Option<String> = None;
    let mut media = Vec::new();
    let mut in_base_url = false;
    let mut saw_manifest = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"manifest" => saw_manifest = true,
                b"baseURL" => in_base_url = true,
                b"media" => media.push(media_entry(&e)),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"media" {
                    media.push(media_entry(&e));
                }
            }
            Ok(Event::Text(t)) if in_base_url => {
                let value = t.unescape().map_err(|e| playlist_error(url, e))?;
                base_url = Some(value.trim().to_string());
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"baseURL" {
                    in_base_url = false;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(playlist_error(url, e)),
        }
    }

    if !saw_manifest {
        return Err(playlist_error(url, "missing <manifest> element"));
    }

    let base = match base_url.as_deref().map(Url::parse) {
        Some(Ok(base)) => base,
        _ => manifest_url,
    };

    let mut streams = StreamMap::new();
    for entry in media.into_iter().filter(|m| !m.url.is_empty()) {
        let Ok(media_url) = base.join(&entry.url) else {
            continue;
        };
        let name = match entry.bitrate {
            Some(bitrate) => format!("{bitrate}k"),
            None => "live".to_string(),
        };
        let resolution = entry.width.zip(entry.height).map(|(w, h)| format!("{w}x{h}"));

        let stream = Stream::new(media_url, StreamFormat::Hds)
            .bitrate(entry.bitrate.unwrap_or(0))
            .resolution_opt(resolution)
            .extra("manifest", url);
        streams.insert(name, stream);
    }

    if streams.is_empty() {
        return Err(playlist_error(url, "manifest lists no media"));
    }
    Ok(streams)
}

fn media_entry(e: &BytesStart<'_>) -> MediaEntry {
    let mut entry = MediaEntry::default();
    for attr in e.attributes().flatten() {
        let Ok(value) = attr.unescape_value() else {
            continue;
        };
        match attr.key.local_name().as_ref() {
            b"url" => entry.url = value.into_owned(),
            b"bitrate" => entry.bitrate = value.trim().parse().ok(),
            b"width" => entry.width = value.trim().parse().ok(),
            b"height" => entry.height = value.trim().parse().ok(),
            _ => {}
        }
    }
    entry
}
