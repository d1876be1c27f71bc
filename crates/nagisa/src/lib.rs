//! # nagisa
//!
//! Parses MPEG-DASH MPD manifests (and, at the boundary, HLS master
//! playlists) into a normalized, queryable track model for downloaders and
//! players. The parser resolves DASH attribute inheritance, walks the
//! `BaseURL` chain, expands all segment-addressing schemes into concrete
//! segment URLs, and classifies codec, DRM and dynamic-range metadata.
//!
//! ```no_run
//! # async fn run() -> nagisa::NagisaResult<()> {
//! # let body = String::new();
//! let manifest = nagisa::parse(&body, "https://example.com/vod/manifest.mpd").await?;
//! for video in manifest.tracks.with_video_quality("1080") {
//!     println!("{video}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Parsing is a pure computation except for one optional step: the
//! `SegmentBase` byte-range probe, which needs an HTTP client (see
//! [`Parser::with_client`]). Without a client that step degrades to segments
//! with no byte range.

pub mod codec;
pub mod dash;
pub mod error;
pub mod fetch;
mod hls;
pub mod track;
pub mod util;
pub mod xml;

use serde::Serialize;

pub use codec::{AudioCodec, DynamicRange, SubtitleCodec, VideoCodec};
pub use dash::{ContentProtection, Protection};
pub use error::{NagisaError, NagisaResult};
pub use fetch::{HttpClient, RangeFetch, RangeResponse};
pub use track::{AudioTrack, Segment, SubtitleTrack, Track, Tracks, VideoTrack};

/// A parsed manifest: the presentation duration, when the document declares
/// one, and the normalized track set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub duration: Option<f64>,
    pub tracks: Tracks,
}

/// Manifest parser. [`parse`] covers the common case; build a `Parser` to
/// enable the byte-range probe or to supply a fallback language.
#[derive(Default)]
pub struct Parser {
    client: Option<HttpClient>,
    fallback_language: Option<String>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the `SegmentBase` byte-range probe. Everything else stays
    /// offline.
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Language assumed for tracks whose manifest declares none.
    pub fn with_fallback_language(mut self, language: impl Into<String>) -> Self {
        self.fallback_language = Some(language.into());
        self
    }

    /// Parses a manifest body, dispatching on the manifest family marker.
    pub async fn parse(&self, body: &str, manifest_url: &str) -> NagisaResult<Manifest> {
        if body.contains("<MPD") {
            dash::parse_mpd(
                body,
                manifest_url,
                self.fallback_language.as_deref(),
                self.client.as_ref(),
            )
            .await
        } else if body.contains("#EXTM3U") {
            hls::parse_hls(body, manifest_url)
        } else {
            Err(NagisaError::InvalidManifest)
        }
    }
}

/// Parses a manifest with default options (no byte-range probe).
pub async fn parse(body: &str, manifest_url: &str) -> NagisaResult<Manifest> {
    Parser::new().parse(body, manifest_url).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MINIMAL_MPD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static" mediaPresentationDuration="PT30S">
  <Period>
    <AdaptationSet contentType="video" mimeType="video/mp4" frameRate="30000/1001">
      <SegmentTemplate media="video/$RepresentationID$/seg-$Number$.m4s" startNumber="1" timescale="1000">
        <SegmentTimeline>
          <S t="0" d="15000" r="1"/>
        </SegmentTimeline>
      </SegmentTemplate>
      <Representation id="v1" codecs="avc1.640028" bandwidth="4800000" width="1920" height="1080"/>
    </AdaptationSet>
    <AdaptationSet contentType="audio" mimeType="audio/mp4" lang="en">
      <SegmentList duration="30">
        <Initialization sourceURL="audio/init.mp4"/>
        <SegmentURL media="audio/seg-1.m4a"/>
      </SegmentList>
      <Representation id="a1" codecs="mp4a.40.2" bandwidth="128000"/>
    </AdaptationSet>
  </Period>
</MPD>"#;

    #[tokio::test]
    async fn test_end_to_end() {
        let manifest = parse(MINIMAL_MPD, "https://example.com/vod/manifest.mpd")
            .await
            .unwrap();

        assert_eq!(manifest.duration, Some(30.0));
        assert_eq!(manifest.tracks.all().len(), 2);

        let video = &manifest.tracks.videos[0];
        assert_eq!(video.segments.len(), 2);
        assert_eq!(
            video.segments[0].url.as_str(),
            "https://example.com/vod/video/v1/seg-1.m4s"
        );
        assert_eq!(video.quality, "1080p");
        assert_eq!(video.codec, VideoCodec::H264);
        assert!((video.fps.unwrap() - 29.97).abs() < 0.01);
        // 4.8 Mb/s over 30 seconds
        assert_eq!(video.size, Some(18_000_000));

        let audio = &manifest.tracks.audios[0];
        assert!(audio.segments[0].init);
        assert_eq!(audio.segments.len(), 2);
        assert_eq!(audio.language.as_deref(), Some("en"));
        assert_eq!(audio.codec, AudioCodec::Aac);
    }

    #[tokio::test]
    async fn test_parse_is_idempotent() {
        let url = "https://example.com/vod/manifest.mpd";
        let first = parse(MINIMAL_MPD, url).await.unwrap();
        let second = parse(MINIMAL_MPD, url).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_manifest() {
        assert!(matches!(
            parse("{\"not\": \"a manifest\"}", "https://example.com/x").await,
            Err(NagisaError::InvalidManifest)
        ));
    }

    #[tokio::test]
    async fn test_hls_dispatch() {
        let master = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720,CODECS=\"avc1.64001f,mp4a.40.2\"\n\
video/720p.m3u8\n";
        let manifest = parse(master, "https://example.com/hls/master.m3u8")
            .await
            .unwrap();
        assert_eq!(manifest.tracks.videos.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_language() {
        let manifest = Parser::new()
            .with_fallback_language("ja")
            .parse(
                &MINIMAL_MPD.replace(" lang=\"en\"", ""),
                "https://example.com/vod/manifest.mpd",
            )
            .await
            .unwrap();
        assert_eq!(manifest.tracks.audios[0].language.as_deref(), Some("ja"));
    }

    #[tokio::test]
    async fn test_segment_base_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vod/audio.mp4"))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("Content-Range", "bytes 0-741/84231")
                    .set_body_bytes(vec![0u8; 742]),
            )
            .mount(&server)
            .await;

        let body = r#"<MPD mediaPresentationDuration="PT30S">
            <Period>
              <AdaptationSet contentType="audio" mimeType="audio/mp4">
                <Representation id="a1" codecs="mp4a.40.2" bandwidth="128000">
                  <BaseURL>audio.mp4</BaseURL>
                  <SegmentBase indexRange="742-1500">
                    <Initialization range="0-741"/>
                  </SegmentBase>
                </Representation>
              </AdaptationSet>
            </Period>
          </MPD>"#;
        let manifest_url = format!("{}/vod/manifest.mpd", server.uri());

        let manifest = Parser::new()
            .with_client(HttpClient::default())
            .parse(body, &manifest_url)
            .await
            .unwrap();

        let segments = &manifest.tracks.audios[0].segments;
        assert!(segments[0].init);
        assert_eq!(segments[0].range.as_deref(), Some("0-741"));
        assert_eq!(segments[1].range.as_deref(), Some("742-84230"));

        // without a client the probe is skipped and the range stays empty
        let degraded = parse(body, &manifest_url).await.unwrap();
        assert_eq!(degraded.tracks.audios[0].segments[1].range, None);
    }

    #[tokio::test]
    async fn test_serialized_shape() {
        let manifest = parse(MINIMAL_MPD, "https://example.com/vod/manifest.mpd")
            .await
            .unwrap();
        let value = serde_json::to_value(&manifest).unwrap();

        assert_eq!(value["duration"], serde_json::json!(30.0));
        assert_eq!(value["tracks"]["videos"][0]["codec"], "H264");
        assert_eq!(value["tracks"]["audios"][0]["segments"][0]["init"], true);
        assert!(value["tracks"]["videos"][0]["segments"][0]["url"]
            .as_str()
            .unwrap()
            .starts_with("https://example.com/vod/"));
    }

    #[tokio::test]
    async fn test_track_display() {
        let manifest = parse(MINIMAL_MPD, "https://example.com/vod/manifest.mpd")
            .await
            .unwrap();
        let listing = manifest.tracks.videos[0].to_string();
        assert!(listing.starts_with("VIDEO | [H.264, SDR]"));
        assert!(listing.contains("1920x1080"));
    }
}
