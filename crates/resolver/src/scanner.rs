//! Textual extractors for candidate URLs.
//!
//! Every extractor is a pure function over the page text. None of them parse
//! HTML, so broken or partial markup is fine.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::utils::{capture_named_all, capture_named_owned};

/// `'<ifr' + 'ame'` style concatenation used to hide iframe tags in scripts.
static SCRIPT_CONCAT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(</?ifr)["']\s?\+\s?["'](ame)"#).unwrap()
});

static IFRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?is)<iframe(?P<gframe>\sname=["']g_iFrame)?"#,
        r#".*?src=["'](?P<url>[^"'\s<>]+)["']"#,
        r#".*?(?:/>|>(?:[^<>]+)?</iframe\s*>)"#,
    ))
    .unwrap()
});

static UNESCAPE_IFRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)unescape\(["'](?P<data>%3C(?:iframe|%69%66%72%61%6d%65)%20[^"']+)["']"#)
        .unwrap()
});

static PLAYLIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?:["']|=|&quot;)"#,
        r#"(?P<url>[^"'<>\s;{}]+\.(?:m3u8|f4m|mp3|mp4|mpd)(?:\?[^"'<>\s\\{}]+)?)"#,
        r#"(?P<end>["']|\s|>|\\&quot;)"#,
    ))
    .unwrap()
});

static STREAM_BASE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"streamBasePath\s*[:=]\s*["'](?P<url>[^"']+)["']"#).unwrap()
});

static WINDOW_LOCATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<script[^<]+window\.location\.href\s?=\s?["'](?P<url>[^"']+)["'];[^<>]+"#)
        .unwrap()
});

static RTMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?:["']|=|&quot;)"#,
        r#"(?P<url>rtmp(?:e|s|t|te)?://[^"'<>\s;{}]+)"#,
        r#"(?:["']|\s|>|\\&quot;)"#,
    ))
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Iframe,
    Playlist,
    Redirect,
}

impl CandidateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateKind::Iframe => "iframe",
            CandidateKind::Playlist => "playlist",
            CandidateKind::Redirect => "redirect",
        }
    }
}

/// A raw string pulled from page text, not yet validated or absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub raw: String,
    pub kind: CandidateKind,
}

impl Candidate {
    pub fn new(raw: impl Into<String>, kind: CandidateKind) -> Self {
        Self {
            raw: raw.into(),
            kind,
        }
    }

    /// Whether the candidate points at an HDS manifest, ignoring any query.
    pub fn is_hds_manifest(&self) -> bool {
        let path = self.raw.split(['?', '#']).next().unwrap_or_default();
        path.ends_with(".f4m")
    }
}

/// Everything one pass over a page produced.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub playlists: Vec<Candidate>,
    /// Direct iframe matches first, then the ones found in `unescape(...)`.
    pub iframes: Vec<Candidate>,
    pub redirect: Option<Candidate>,
    pub stream_base: Option<String>,
    pub rtmp_urls: Vec<String>,
}

pub fn scan(page_text: &str) -> ScanResult {
    let wrap = |urls: Vec<String>, kind| {
        urls.into_iter()
            .map(|raw| Candidate::new(raw, kind))
            .collect::<Vec<_>>()
    };

    let mut iframes = wrap(scan_iframes(page_text), CandidateKind::Iframe);
    iframes.extend(wrap(scan_escaped_iframes(page_text), CandidateKind::Iframe));

    ScanResult {
        playlists: wrap(scan_playlists(page_text), CandidateKind::Playlist),
        iframes,
        redirect: scan_redirect(page_text).map(|raw| Candidate::new(raw, CandidateKind::Redirect)),
        stream_base: scan_stream_base(page_text),
        rtmp_urls: scan_rtmp(page_text),
    }
}

/// Removes the `'<ifr' + 'ame'` concatenation so the tag reads `<iframe`.
pub fn normalize_script_concat(text: &str) -> Cow<'_, str> {
    SCRIPT_CONCAT_REGEX.replace_all(text, "$1$2")
}

/// `src` values of `<iframe>` tags, skipping the `g_iFrame*` helper frames.
pub fn scan_iframes(text: &str) -> Vec<String> {
    let text = normalize_script_concat(text);
    let text = text.as_ref();

    let mut urls = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let Some(caps) = IFRAME_REGEX.captures_at(text, pos) else {
            break;
        };
        let (Some(whole), Some(url)) = (caps.get(0), caps.name("url")) else {
            break;
        };
        if caps.name("gframe").is_some() {
            // `<` is one byte, so this stays on a char boundary.
            pos = whole.start() + 1;
            continue;
        }
        urls.push(url.as_str().to_owned());
        pos = whole.end();
    }
    urls
}

/// Iframes hidden in `unescape('%3Ciframe%20...')` calls.
pub fn scan_escaped_iframes(text: &str) -> Vec<String> {
    let payloads = capture_named_all(&UNESCAPE_IFRAME_REGEX, text, "data");
    if payloads.is_empty() {
        debug!("No unescape_iframe");
        return Vec::new();
    }

    let decoded = payloads
        .iter()
        .map(|data| String::from_utf8_lossy(&urlencoding::decode_binary(data.as_bytes())).into_owned())
        .collect::<Vec<_>>()
        .join(",");

    let urls = scan_iframes(&decoded);
    if urls.is_empty() {
        debug!("No unescape_iframe");
    } else {
        debug!("Found unescape_iframe: {}", urls.len());
    }
    urls
}

/// Quoted or `&quot;` escaped strings ending in a playlist extension.
///
/// Values of a `title=` attribute are skipped.
pub fn scan_playlists(text: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let Some(caps) = PLAYLIST_REGEX.captures_at(text, pos) else {
            break;
        };
        let (Some(whole), Some(url), Some(end)) = (caps.get(0), caps.name("url"), caps.name("end"))
        else {
            break;
        };

        let before = &text[..url.start()];
        let after_title = before.ends_with("title=\"") || before.ends_with("title='");
        let semicolon_space =
            url.as_str().ends_with(';') && end.as_str().starts_with(char::is_whitespace);
        if after_title || semicolon_space {
            // Every opening delimiter is ASCII.
            pos = whole.start() + 1;
            continue;
        }

        urls.push(url.as_str().to_owned());
        pos = whole.end();
    }
    urls
}

/// The `streamBasePath` declared for base relative HDS manifests.
pub fn scan_stream_base(text: &str) -> Option<String> {
    capture_named_owned(&STREAM_BASE_REGEX, text, "url")
}

/// The target of a `window.location.href = "...";` script.
pub fn scan_redirect(text: &str) -> Option<String> {
    let url = capture_named_owned(&WINDOW_LOCATION_REGEX, text, "url");
    match &url {
        Some(url) => debug!("Found window_location: {}", url),
        None => debug!("No window_location"),
    }
    url
}

/// RTMP URLs. They are only reported, never resolved.
pub fn scan_rtmp(text: &str) -> Vec<String> {
    capture_named_all(&RTMP_REGEX, text, "url")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn test_scan_iframes() {
        let cases: &[(&str, &[&str])] = &[
            (
                r#"
                <iframe src="http://local2.local">    </iframe>
                <iframe frameborder="0" src="http://local.local" width="650">iframe</iframe>"#,
                &["http://local.local", "http://local2.local"],
            ),
            (
                r#"<iframe src="http://local3.local" width="800px"></iframe>"#,
                &["http://local3.local"],
            ),
            (
                r#"<iframe height='600px' src='http://local5.local'></iframe>"#,
                &["http://local5.local"],
            ),
            (
                r#"</div>
                <script type="text/javascript">_satellite.pageBottom();</script>
                <iframe style="height:0px;width:0px;visibility:hidden" src="https://example.com/">
                    this frame prevents back forward cache
                    </iframe>
                </body>"#,
                &["https://example.com/"],
            ),
            (
                r#"<iframe src="https://example.com/123.php" width="720" height="500" allowtransparency="true"/>"#,
                &["https://example.com/123.php"],
            ),
            (
                r#"<script>
                    document.write('<ifr' + 'ame id="video" src="https://example.com/123.php" height="500" ></ifr' + 'ame>');
                </script>"#,
                &["https://example.com/123.php"],
            ),
            (
                r#"<script>
                    document.write('<ifr'+'ame id="video" src="https://example.com/123.php" height="500" ></ifr'+'ame>');
                </script>"#,
                &["https://example.com/123.php"],
            ),
            (
                r#"<iframe frameborder="0" width="480" height="270" src="//www.dailymotion.com/embed/video/xigbvx" allowfullscreen></iframe>"#,
                &["//www.dailymotion.com/embed/video/xigbvx"],
            ),
            (
                r#"<iframe SRC="/web/playeriframe.jsp"  frameborder="0" WIDTH=500 HEIGHT=400></iframe>"#,
                &["/web/playeriframe.jsp"],
            ),
            (
                r#"<iframe width="470" height="270" src="http&#58;//example.example/live/ABC123ABC" frameborder="0"></iframe>"#,
                &["http&#58;//example.example/live/ABC123ABC"],
            ),
            (
                r#"
                <iframe     id="random"
                    name="iframe"
                    src="https://example.com/dotall/iframe"
                    width="100%"
                    height="500"
                    class="wrapper">
                    </iframe>
                </div></div></div>"#,
                &["https://example.com/dotall/iframe"],
            ),
        ];

        for (data, expected) in cases {
            let expected = sorted(expected.iter().map(|s| s.to_string()).collect());
            assert_eq!(sorted(scan_iframes(data)), expected, "data: {data}");
        }
    }

    #[test]
    fn test_scan_iframes_rejects() {
        let cases = [
            r#"<iframe id="iframe" title="" frameborder="0" width="0" height="0" src=""></iframe>"#,
            r#"<iframe name="g_iFrame1" width="70" src="logo"></iframe>"#,
            r#"<iframe id="<%- uploadIframe %>" name="" style="display:none;"></iframe>
               <img src="<%- val.thumbUrl %>" alt=""/>"#,
            r#"<iframe src="invalid url" />"#,
        ];
        for data in cases {
            assert!(scan_iframes(data).is_empty(), "data: {data}");
        }
    }

    #[test]
    fn test_g_iframe_does_not_hide_next_iframe() {
        let data = r#"<iframe name="g_iFrame1" src="logo"></iframe>
            <iframe src="http://example.com/player"></iframe>"#;
        assert_eq!(scan_iframes(data), vec!["http://example.com/player"]);
    }

    #[test]
    fn test_scan_escaped_iframes() {
        let cases = [
            r#"<script language='javascript'> document.write(unescape('%3Ciframe%20width%3D%22730%22%20height%3D%22440%22%20src%3D%22https%3A%2F%2Fwww.youtube.com%2Fembed%2Faqz-KE-bpKQ%3Fautoplay%3D1%22%20frameborder%3D%220%22%20allowfullscreen%3E%3C%2Fiframe%3E'));</script>"#,
            r#"<script language='javascript'> document.write(unescape('%3C%69%66%72%61%6d%65%20width%3D%22730%22%20height%3D%22440%22%20src%3D%22https%3A%2F%2Fwww.youtube.com%2Fembed%2Faqz-KE-bpKQ%3Fautoplay%3D1%22%20frameborder%3D%220%22%20allowfullscreen%3E%3C%2Fiframe%3E'));</script>"#,
        ];
        for data in cases {
            assert_eq!(
                scan_escaped_iframes(data),
                vec!["https://www.youtube.com/embed/aqz-KE-bpKQ?autoplay=1"]
            );
        }

        assert!(scan_escaped_iframes("<html><body><h1>ABC</h1><p>123</p></body></html>").is_empty());
    }

    #[test]
    fn test_scan_escaped_iframe_short_payload() {
        let data = "unescape('%3Ciframe%20src%3D%22http%3A%2F%2Fy%2Fz%22%3E%3C%2Fiframe%3E')";
        assert_eq!(scan_escaped_iframes(data), vec!["http://y/z"]);
    }

    #[test]
    fn test_scan_playlists() {
        let cases: &[(&str, &str)] = &[
            (r#"<player frameborder="0" src="http://local.m3u8">"#, "http://local.m3u8"),
            (
                r#"<player frameborder="0" src="http://local.m3u8?local">"#,
                "http://local.m3u8?local",
            ),
            (r#"<player frameborder="0" src="//local.m3u8?local">"#, "//local.m3u8?local"),
            (
                r#"file: "http://example.com:8081/edge/playlist.m3u8?wmsAuthSign=c9JnZbWludXR4","#,
                "http://example.com:8081/edge/playlist.m3u8?wmsAuthSign=c9JnZbWludXR4",
            ),
            (
                r#""hlsLivestreamURL": "https:\/\/live-http.example.com\/live\/_definst_\/mp4:123\/playlist.m3u8","#,
                r"https:\/\/live-http.example.com\/live\/_definst_\/mp4:123\/playlist.m3u8",
            ),
            (
                "var player = new Clappr.Player({source: '/tv/tv.m3u8', mimeType: 'application/x-mpegURL'",
                "/tv/tv.m3u8",
            ),
            (r#"<player frameborder="0" src="http://local.f4m?local">"#, "http://local.f4m?local"),
            (r#"<video src="http://local.mp3">"#, "http://local.mp3"),
            (
                "<video id='player_el' src='//example.com/video.mp4' width='100%' height='100%'",
                "//example.com/video.mp4",
            ),
            (
                r#"document.write( "<video src=http://999.999.999.999/live/playlist.m3u8?at=123 autoplay png> </video>");"#,
                "http://999.999.999.999/live/playlist.m3u8?at=123",
            ),
            (
                r#"document.write( "<video src=http://999.999.999.999/live/playlist.m3u8?at=123> </video>");"#,
                "http://999.999.999.999/live/playlist.m3u8?at=123",
            ),
            (
                r#"\&quot;hlsMasterPlaylistUrl\&quot;:\&quot;https://example.com/hls/video.m3u8?p\&quot;,"#,
                "https://example.com/hls/video.m3u8?p",
            ),
            (r#"<player src="http://mocked/playlist/manifest.mpd">"#, "http://mocked/playlist/manifest.mpd"),
        ];

        for (data, expected) in cases {
            let found = scan_playlists(data);
            assert_eq!(found.first().map(String::as_str), Some(*expected), "data: {data}");
        }
    }

    #[test]
    fn test_scan_playlists_rejects() {
        let cases = [
            r#"<player frameborder="0" src="local.apk?local">"#,
            r#"<player frameborder="0" src="http://local.mpk">"#,
            r#"meta title="broken_title_url.mp4">"#,
            r#"video">broken_title_url22.mp4</span></div><div style="float"#,
            r#"video">broken_title_url22.mp4"float"#,
            "if(options.livestream==true){\n PlayerSetup.source.hls=options.m3u8;\n}",
            "getCurrentVideoSrc: function(){\n return $(\"#player\").data(\"player\").mp4;\n},",
            r#"data-u="{upload_url=https://example.com/mobile.mp4,poster=https://example.com/mobile.jpg,id=123,flow=full}""#,
            "src=http://example.com/live.m3u8?a=1; next",
        ];
        for data in cases {
            assert!(scan_playlists(data).is_empty(), "data: {data}");
        }
    }

    #[test]
    fn test_scan_stream_base() {
        assert_eq!(
            scan_stream_base("streamBasePath: 'http://cdn.example/base/'").as_deref(),
            Some("http://cdn.example/base/")
        );
        assert_eq!(
            scan_stream_base(r#"var streamBasePath = "/hds/""#).as_deref(),
            Some("/hds/")
        );
        assert!(scan_stream_base("basePath: 'x'").is_none());
    }

    #[test]
    fn test_scan_redirect() {
        let single = r#"
            <script type="text/javascript">
            window.location.href = 'https://www.youtube.com/embed/aqz-KE-bpKQ';
            </script>"#;
        assert_eq!(
            scan_redirect(single).as_deref(),
            Some("https://www.youtube.com/embed/aqz-KE-bpKQ")
        );

        let double = r#"
            <script type="text/javascript">
            window.location.href = "https://www.youtube.com/watch?v=aqz-KE-bpKQ";
            </script>"#;
        assert_eq!(
            scan_redirect(double).as_deref(),
            Some("https://www.youtube.com/watch?v=aqz-KE-bpKQ")
        );

        assert!(scan_redirect("<html><body><h1>ABC</h1><p>123</p></body></html>").is_none());
    }

    #[test]
    fn test_scan_rtmp() {
        let cases = [
            (r#"<player frameborder="0" src="rtmp://local">"#, "rtmp://local"),
            (r#"<player frameborder="0" src="rtmpe://local?local">"#, "rtmpe://local?local"),
            (r#"<player frameborder="0" src="rtmps://local?local">"#, "rtmps://local?local"),
            (r#"<video src="rtmpte://local:1935">"#, "rtmpte://local:1935"),
        ];
        for (data, expected) in cases {
            assert_eq!(scan_rtmp(data), vec![expected]);
        }
    }

    #[test]
    fn test_scan_collects_everything() {
        let page = r#"
            <iframe src="http://x/iframe"></iframe>
            <script>document.write(unescape('%3Ciframe%20src%3D%22http%3A%2F%2Fy%2Fz%22%3E%3C%2Fiframe%3E'));</script>
            <video src="http://x/video_720.mp4">
            "#;
        let result = scan(page);
        assert_eq!(
            result.iframes,
            vec![
                Candidate::new("http://x/iframe", CandidateKind::Iframe),
                Candidate::new("http://y/z", CandidateKind::Iframe),
            ]
        );
        assert_eq!(
            result.playlists,
            vec![Candidate::new("http://x/video_720.mp4", CandidateKind::Playlist)]
        );
        assert!(result.redirect.is_none());
        assert!(result.stream_base.is_none());
    }

    #[test]
    fn test_candidate_is_hds_manifest() {
        assert!(Candidate::new("rel/manifest.f4m?x=1", CandidateKind::Playlist).is_hds_manifest());
        assert!(!Candidate::new("rel/index.m3u8", CandidateKind::Playlist).is_hds_manifest());
    }
}
