use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use url::Url;

use super::playlist_error;
use crate::error::ResolveError;
use crate::media::{Stream, StreamFormat, StreamMap};

#[derive(Debug, Default, Clone)]
struct AdaptationSet {
    mime_type: Option<String>,
    content_type: Option<String>,
    codecs: Option<String>,
}

#[derive(Debug, Default)]
struct Representation {
    id: Option<String>,
    bandwidth: u64,
    width: Option<u64>,
    height: Option<u64>,
    mime_type: Option<String>,
    codecs: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Video,
    Audio,
    Other,
}

/// Parses a DASH (`.mpd`) manifest fetched from `url`.
///
/// Video representations are named by height (`720p`), audio only ones by
/// bandwidth (`a128k`). The stream URL is the manifest itself, the chosen
/// representation is kept in the `representation` extra.
pub fn parse_mpd(url: &str, text: &str) -> Result<StreamMap, ResolveError> {
    let manifest_url = Url::parse(url).map_err(|e| playlist_error(url, e))?;

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut saw_mpd = false;
    let mut adaptation: Option<AdaptationSet> = None;
    let mut representations = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"MPD" => saw_mpd = true,
                b"AdaptationSet" => adaptation = Some(adaptation_set(&e)),
                b"Representation" => {
                    representations.push((adaptation.clone().unwrap_or_default(), representation(&e)))
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"MPD" => saw_mpd = true,
                b"Representation" => {
                    representations.push((adaptation.clone().unwrap_or_default(), representation(&e)))
                }
                _ => {}
            },
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"AdaptationSet" {
                    adaptation = None;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(playlist_error(url, e)),
        }
    }

    if !saw_mpd {
        return Err(playlist_error(url, "missing <MPD> element"));
    }

    let mut streams = StreamMap::new();
    for (set, rep) in representations {
        let bitrate = rep.bandwidth / 1000;
        let name = match (kind_of(&set, &rep), rep.height) {
            (Kind::Video, Some(height)) => format!("{height}p"),
            (Kind::Audio, _) => format!("a{bitrate}k"),
            _ => format!("{bitrate}k"),
        };
        let resolution = rep.width.zip(rep.height).map(|(w, h)| format!("{w}x{h}"));
        let codec = rep.codecs.or(set.codecs).unwrap_or_default();

        let mut stream = Stream::new(manifest_url.as_str(), StreamFormat::Dash)
            .bitrate(bitrate)
            .resolution_opt(resolution)
            .codec(codec);
        if let Some(id) = rep.id {
            stream = stream.extra("representation", id);
        }
        streams.insert(name, stream);
    }

    if streams.is_empty() {
        return Err(playlist_error(url, "manifest lists no representations"));
    }
    Ok(streams)
}

fn kind_of(set: &AdaptationSet, rep: &Representation) -> Kind {
    let declared = rep
        .mime_type
        .as_deref()
        .or(set.mime_type.as_deref())
        .or(set.content_type.as_deref())
        .unwrap_or_default();

    if declared.starts_with("video") {
        Kind::Video
    } else if declared.starts_with("audio") {
        Kind::Audio
    } else if rep.height.is_some() {
        Kind::Video
    } else {
        Kind::Other
    }
}

fn adaptation_set(e: &BytesStart<'_>) -> AdaptationSet {
    let mut set = AdaptationSet::default();
    for (key, value) in attributes(e) {
        match key.as_str() {
            "mimeType" => set.mime_type = Some(value),
            "contentType" => set.content_type = Some(value),
            "codecs" => set.codecs = Some(value),
            _ => {}
        }
    }
    set
}

fn representation(e: &BytesStart<'_>) -> Representation {
    let mut rep = Representation::default();
    for (key, value) in attributes(e) {
        match key.as_str() {
            "id" => rep.id = Some(value),
            "bandwidth" => rep.bandwidth = value.trim().parse().unwrap_or(0),
            "width" => rep.width = value.trim().parse().ok(),
            "height" => rep.height = value.trim().parse().ok(),
            "mimeType" => rep.mime_type = Some(value),
            "codecs" => rep.codecs = Some(value),
            _ => {}
        }
    }
    rep
}

fn attributes(e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .filter_map(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            attr.unescape_value().ok().map(|v| (key, v.into_owned()))
        })
        .collect()
}
