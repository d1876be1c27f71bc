//! # MPEG-DASH manifest support
//!
//! Turns an MPD document into the normalized track model. The pipeline works
//! per `AdaptationSet` x `Representation` pair of the primary period:
//!
//! * attribute/element inheritance is resolved through [`Scope`]
//!   (representation first, adaptation set as fallback),
//! * the effective base URL is composed from the `BaseURL` chain
//!   (MPD, Period, Representation) starting at the manifest's own URL,
//! * segments are expanded from whichever addressing scheme applies
//!   (`SegmentTemplate`, `SegmentList`, `SegmentBase`, plain `BaseURL`),
//! * codec, DRM, dynamic-range and accessibility metadata are classified,
//! * the result is dispatched into a video, audio or subtitle track.
//!
//! Only static manifests are handled here; there is no dynamic-MPD refresh.

mod protection;
mod scope;
mod segment;
mod template;
mod url;

pub use protection::{ContentProtection, Protection};
pub use scope::Scope;

pub(crate) use self::url::{is_absolute_url, merge_baseurls};

use std::sync::LazyLock;

use ::url::Url;
use regex::Regex;

use crate::codec::{
    parse_audio_codec, parse_dynamic_range, parse_subtitle_codec, parse_video_codec, SubtitleCodec,
};
use crate::error::{NagisaError, NagisaResult};
use crate::fetch::RangeFetch;
use crate::track::{quality_label, AudioTrack, SubtitleTrack, Tracks, VideoTrack};
use crate::util::duration::parse_duration;
use crate::util::lang::is_language_usable;
use crate::xml::{self, Element};
use crate::Manifest;

const ROLE_SCHEME: &str = "urn:mpeg:dash:role:2011";
const AUDIO_PURPOSE_SCHEME: &str = "urn:tva:metadata:cs:AudioPurposeCS:2007";
const DOLBY_JOC_SCHEME: &str = "tag:dolby.com,2018:dash:EC3_ExtensionComplexityIndex:2018";

// Language hidden in a representation id, e.g. "audio_fra=128000".
static LANGUAGE_IN_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+_(\w+)=\d+").unwrap());

pub(crate) async fn parse_mpd<C: RangeFetch>(
    body: &str,
    manifest_url: &str,
    fallback_language: Option<&str>,
    probe: Option<&C>,
) -> NagisaResult<Manifest> {
    let root = xml::parse(body)?;
    let mpd = if root.name == "MPD" {
        &root
    } else {
        root.find("MPD").ok_or(NagisaError::InvalidManifest)?
    };
    let manifest_url = Url::parse(manifest_url).ok();

    // multi-period concatenation is out of scope: only the primary period's
    // adaptation sets become tracks
    let period = mpd.find("Period");
    let duration = mpd
        .attr("mediaPresentationDuration")
        .and_then(parse_duration)
        .or_else(|| {
            period
                .and_then(|period| period.attr("duration"))
                .and_then(parse_duration)
        });

    let mut tracks = Tracks::default();
    if let Some(period) = period {
        for adaptation_set in period.find_all("AdaptationSet") {
            for representation in adaptation_set.find_all("Representation") {
                let scope = Scope::new(adaptation_set, representation);
                let built = build_track(
                    mpd,
                    period,
                    &scope,
                    manifest_url.as_ref(),
                    duration,
                    fallback_language,
                    probe,
                )
                .await;
                match built {
                    Ok(Some(Built::Video(track))) => tracks.videos.push(track),
                    Ok(Some(Built::Audio(track))) => tracks.audios.push(track),
                    Ok(Some(Built::Subtitle(track))) => tracks.subtitles.push(track),
                    Ok(None) => {}
                    Err(NagisaError::UnsupportedCodec(details)) => {
                        // one exotic rendition should not sink the manifest
                        tracing::warn!("skipping representation: {details}");
                    }
                    Err(error) => return Err(error),
                }
            }
        }
    }
    tracks.videos.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));

    Ok(Manifest { duration, tracks })
}

enum Built {
    Video(VideoTrack),
    Audio(AudioTrack),
    Subtitle(SubtitleTrack),
}

async fn build_track<C: RangeFetch>(
    mpd: &Element,
    period: &Element,
    scope: &Scope<'_>,
    manifest_url: Option<&Url>,
    duration: Option<f64>,
    fallback_language: Option<&str>,
    probe: Option<&C>,
) -> NagisaResult<Option<Built>> {
    let content_type = determine_content_type(scope)?;
    if content_type == ContentType::Image {
        // thumbnail tracks have no place in the model
        return Ok(None);
    }

    let rid = scope.representation.attr("id").unwrap_or_default();
    let bitrate: u64 = scope
        .attr("bandwidth")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);
    let language = resolve_language(scope, fallback_language);
    let label = scope
        .attr("label")
        .map(str::to_string)
        .or_else(|| {
            scope
                .child("Label")
                .map(|element| element.text())
                .filter(|text| !text.is_empty())
        });

    let base_url = url::resolve_base_url(manifest_url, mpd, period, scope).ok();
    let segments =
        segment::generate(scope, base_url.as_ref(), manifest_url, duration, probe).await?;
    let protection = protection::extract(scope);
    let size = duration.map(|duration| (bitrate as f64 * duration / 8.0).round() as u64);
    let codecs_attr = scope.attr("codecs");
    let id = synthesize_id(
        base_url.as_ref(),
        content_type,
        codecs_attr,
        bitrate,
        language.as_deref(),
        mpd,
        period,
        scope,
    );

    let built = match content_type {
        ContentType::Video => {
            let codecs = codecs_attr.ok_or_else(|| {
                NagisaError::UnsupportedCodec(format!("representation {rid:?} has no codecs"))
            })?;
            let codec = parse_video_codec(codecs)?;
            let mut properties = scope.children("EssentialProperty");
            properties.extend(scope.children("SupplementalProperty"));
            let width = scope
                .attr("width")
                .and_then(|value| value.parse().ok())
                .unwrap_or(0);
            let height = scope
                .attr("height")
                .and_then(|value| value.parse().ok())
                .unwrap_or(0);
            Built::Video(VideoTrack {
                id,
                label,
                language,
                bitrate,
                size,
                codec,
                dynamic_range: parse_dynamic_range(codecs, &properties),
                width,
                height,
                fps: scope.attr("frameRate").and_then(parse_frame_rate),
                quality: quality_label(width, height),
                protection,
                segments,
            })
        }
        ContentType::Audio => {
            let codecs = codecs_attr.ok_or_else(|| {
                NagisaError::UnsupportedCodec(format!("representation {rid:?} has no codecs"))
            })?;
            Built::Audio(AudioTrack {
                id,
                label,
                language,
                bitrate,
                size,
                codec: parse_audio_codec(codecs)?,
                channels: scope
                    .child("AudioChannelConfiguration")
                    .and_then(|element| element.attr("value"))
                    .and_then(|value| value.parse().ok()),
                sampling_rate: scope
                    .attr("audioSamplingRate")
                    .and_then(|value| value.parse().ok()),
                joint_object_coding: dolby_joc(&scope.children("SupplementalProperty")),
                is_descriptive: is_descriptive(&scope.children("Accessibility")),
                protection,
                segments,
            })
        }
        ContentType::Text => {
            let mime_type = scope.attr("mimeType");
            // subtitle tracks are often signalled only via MIME (text/vtt);
            // only mp4-boxed containers rely on the codecs attribute
            let codec = match mime_type {
                Some(mime) if !mime.contains("mp4") => match mime.split('/').nth(1) {
                    Some(subtype) => parse_subtitle_codec(subtype)?,
                    None => SubtitleCodec::Vtt,
                },
                _ => match codecs_attr {
                    Some(codecs) => parse_subtitle_codec(codecs)?,
                    None => SubtitleCodec::Vtt,
                },
            };
            let roles = scope.children("Role");
            let accessibilities = scope.children("Accessibility");
            Built::Subtitle(SubtitleTrack {
                id,
                label,
                language,
                bitrate,
                size,
                codec,
                is_closed_caption: is_closed_caption(&roles),
                is_sdh: is_sdh(&accessibilities),
                is_forced: is_forced(&roles),
                protection,
                segments,
            })
        }
        ContentType::Image => unreachable!("image adaptation sets are skipped"),
    };
    Ok(Some(built))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentType {
    Video,
    Audio,
    Text,
    Image,
}

impl ContentType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

/// `contentType` wins, then the MIME type's primary part; an unknown or
/// missing value falls back to a classifier-table guess over the codec
/// string.
fn determine_content_type(scope: &Scope<'_>) -> NagisaResult<ContentType> {
    let explicit = scope
        .attr("contentType")
        .or_else(|| scope.attr("mimeType").and_then(|mime| mime.split('/').next()));
    match explicit {
        Some("video") => Ok(ContentType::Video),
        Some("audio") => Ok(ContentType::Audio),
        Some("text") => Ok(ContentType::Text),
        Some("image") => Ok(ContentType::Image),
        other => {
            if let Some(codecs) = scope.attr("codecs") {
                if parse_video_codec(codecs).is_ok() {
                    return Ok(ContentType::Video);
                }
                if parse_audio_codec(codecs).is_ok() {
                    return Ok(ContentType::Audio);
                }
                if parse_subtitle_codec(codecs).is_ok() {
                    return Ok(ContentType::Text);
                }
            }
            Err(NagisaError::UnknownContentType(format!(
                "representation {:?} has contentType {:?}",
                scope.representation.attr("id").unwrap_or_default(),
                other.unwrap_or_default(),
            )))
        }
    }
}

/// Language cascade: representation `lang`, a language captured from the
/// representation id, adaptation-set `lang`, then the caller's fallback. The
/// first well-formed candidate wins; `und` and malformed tags are skipped.
fn resolve_language(scope: &Scope<'_>, fallback: Option<&str>) -> Option<String> {
    let from_id = scope
        .representation
        .attr("id")
        .and_then(|id| LANGUAGE_IN_ID.captures(id))
        .map(|captures| captures[1].to_string());
    let candidates = [
        scope.representation.attr("lang").map(str::to_string),
        from_id,
        scope.adaptation_set.attr("lang").map(str::to_string),
        fallback.map(str::to_string),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(|candidate| candidate.trim().to_string())
        .find(|candidate| is_language_usable(candidate))
}

fn parse_frame_rate(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator = numerator.parse::<f64>().ok()?;
            let denominator = denominator.parse::<f64>().ok()?;
            (denominator != 0.0).then(|| numerator / denominator)
        }
        None => value.parse().ok(),
    }
}

fn has_descriptor(elements: &[&Element], scheme: &str, values: &[&str]) -> bool {
    elements.iter().any(|element| {
        element.attr("schemeIdUri") == Some(scheme)
            && element
                .attr("value")
                .is_some_and(|value| values.contains(&value))
    })
}

fn is_descriptive(accessibilities: &[&Element]) -> bool {
    has_descriptor(accessibilities, ROLE_SCHEME, &["descriptive"])
        || has_descriptor(accessibilities, AUDIO_PURPOSE_SCHEME, &["1"])
}

fn is_closed_caption(roles: &[&Element]) -> bool {
    has_descriptor(roles, ROLE_SCHEME, &["caption"])
}

fn is_sdh(accessibilities: &[&Element]) -> bool {
    has_descriptor(accessibilities, AUDIO_PURPOSE_SCHEME, &["2"])
}

fn is_forced(roles: &[&Element]) -> bool {
    has_descriptor(roles, ROLE_SCHEME, &["forced-subtitle", "forced_subtitle"])
}

fn dolby_joc(supplementals: &[&Element]) -> u32 {
    supplementals
        .iter()
        .find(|element| element.attr("schemeIdUri") == Some(DOLBY_JOC_SCHEME))
        .and_then(|element| element.attr("value")?.parse().ok())
        .unwrap_or(0)
}

/// A stable id built from everything that distinguishes the track. Empty
/// parts are dropped; slashes are normalized so the id stays path-safe.
#[allow(clippy::too_many_arguments)]
fn synthesize_id(
    base_url: Option<&Url>,
    content_type: ContentType,
    codecs: Option<&str>,
    bitrate: u64,
    language: Option<&str>,
    mpd: &Element,
    period: &Element,
    scope: &Scope<'_>,
) -> String {
    let bitrate = bitrate.to_string();
    let parts = [
        base_url.and_then(Url::host_str),
        Some(content_type.as_str()),
        codecs,
        Some(bitrate.as_str()),
        language,
        mpd.attr("id"),
        period.attr("id"),
        scope.representation.attr("id"),
        scope.attr("audioTrackId"),
    ];
    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .replace('/', "-")
}
