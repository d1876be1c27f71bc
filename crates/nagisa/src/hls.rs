//! HLS boundary: maps an `#EXTM3U` master playlist onto the same track model
//! that the DASH pipeline produces. Playlist parsing itself is delegated to
//! `m3u8-rs`; this module only reshapes the result. Variant playlists are not
//! fetched, so each track carries a single segment pointing at its playlist.

use m3u8_rs::{AlternativeMediaType, MasterPlaylist, Playlist};
use url::Url;

use crate::codec::{parse_audio_codec, parse_video_codec, AudioCodec, DynamicRange, SubtitleCodec};
use crate::dash::Protection;
use crate::error::{NagisaError, NagisaResult};
use crate::track::{quality_label, AudioTrack, Segment, SubtitleTrack, Tracks, VideoTrack};
use crate::Manifest;

pub(crate) fn parse_hls(body: &str, manifest_url: &str) -> NagisaResult<Manifest> {
    let playlist = m3u8_rs::parse_playlist_res(body.as_bytes())
        .map_err(|_| NagisaError::M3u8Parse("not a valid playlist".to_string()))?;
    let manifest_url = Url::parse(manifest_url).ok();
    match playlist {
        Playlist::MasterPlaylist(playlist) => from_master(&playlist, manifest_url.as_ref()),
        Playlist::MediaPlaylist(_) => Err(NagisaError::M3u8Parse(
            "a bare media playlist carries no track information".to_string(),
        )),
    }
}

fn from_master(playlist: &MasterPlaylist, manifest_url: Option<&Url>) -> NagisaResult<Manifest> {
    let mut tracks = Tracks::default();

    for variant in &playlist.variants {
        if variant.is_i_frame {
            continue;
        }
        let Some(codecs) = variant.codecs.as_deref() else {
            tracing::warn!("skipping variant without codecs: {}", variant.uri);
            continue;
        };
        let codec = match parse_video_codec(codecs) {
            Ok(codec) => codec,
            Err(error) => {
                tracing::warn!("skipping variant {}: {error}", variant.uri);
                continue;
            }
        };
        let url = resolve(manifest_url, &variant.uri)?;
        let (width, height) = variant
            .resolution
            .as_ref()
            .map(|resolution| (resolution.width as u32, resolution.height as u32))
            .unwrap_or((0, 0));
        tracks.videos.push(VideoTrack {
            id: track_id(&url, "video", Some(codecs), Some(variant.bandwidth), None),
            label: None,
            language: None,
            bitrate: variant.bandwidth,
            size: None,
            codec,
            dynamic_range: DynamicRange::Sdr,
            width,
            height,
            fps: variant.frame_rate,
            quality: quality_label(width, height),
            protection: Protection::default(),
            segments: vec![Segment::new(url)],
        });
    }

    for alternative in &playlist.alternatives {
        let Some(uri) = alternative.uri.as_deref() else {
            continue;
        };
        let url = resolve(manifest_url, uri)?;
        match alternative.media_type {
            AlternativeMediaType::Audio => {
                // the audio codec lives in the codec list of the variants
                // that reference this rendition group
                let codec = playlist
                    .variants
                    .iter()
                    .filter(|variant| variant.audio.as_deref() == Some(alternative.group_id.as_str()))
                    .filter_map(|variant| variant.codecs.as_deref())
                    .find_map(|codecs| parse_audio_codec(codecs).ok())
                    .unwrap_or(AudioCodec::Aac);
                tracks.audios.push(AudioTrack {
                    id: track_id(&url, "audio", None, None, Some(&alternative.name)),
                    label: Some(alternative.name.clone()),
                    language: alternative.language.clone(),
                    bitrate: 0,
                    size: None,
                    codec,
                    channels: alternative
                        .channels
                        .as_deref()
                        .and_then(|channels| channels.parse().ok()),
                    sampling_rate: None,
                    joint_object_coding: 0,
                    is_descriptive: false,
                    protection: Protection::default(),
                    segments: vec![Segment::new(url)],
                });
            }
            AlternativeMediaType::Subtitles => {
                tracks.subtitles.push(SubtitleTrack {
                    id: track_id(&url, "text", None, None, Some(&alternative.name)),
                    label: Some(alternative.name.clone()),
                    language: alternative.language.clone(),
                    bitrate: 0,
                    size: None,
                    codec: SubtitleCodec::Vtt,
                    is_closed_caption: false,
                    is_sdh: false,
                    is_forced: alternative.forced,
                    protection: Protection::default(),
                    segments: vec![Segment::new(url)],
                });
            }
            _ => {}
        }
    }

    tracks.videos.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));
    Ok(Manifest {
        duration: None,
        tracks,
    })
}

fn resolve(manifest_url: Option<&Url>, value: &str) -> NagisaResult<Url> {
    if crate::dash::is_absolute_url(value) {
        Ok(Url::parse(value)?)
    } else {
        let base = manifest_url
            .ok_or_else(|| NagisaError::UnresolvableBaseUrl(value.to_string()))?;
        crate::dash::merge_baseurls(base, value)
    }
}

fn track_id(
    url: &Url,
    content_type: &str,
    codecs: Option<&str>,
    bitrate: Option<u64>,
    name: Option<&str>,
) -> String {
    let bitrate = bitrate.map(|bitrate| bitrate.to_string());
    let parts = [
        url.host_str(),
        Some(content_type),
        codecs,
        bitrate.as_deref(),
        name,
    ];
    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .replace('/', "-")
}
