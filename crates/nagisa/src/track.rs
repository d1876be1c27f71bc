//! The normalized track model produced by a parse, plus the filter surface
//! used to pick tracks for downloading.

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::codec::{AudioCodec, DynamicRange, SubtitleCodec, VideoCodec};
use crate::dash::Protection;

/// One downloadable media segment. The initialization segment, when present,
/// is always the first entry of a track's segment list and the only one with
/// `init == true`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub url: Url,
    /// Byte range in `first-last` form, when the segment is a slice of a
    /// larger resource.
    pub range: Option<String>,
    pub init: bool,
    pub duration: Option<f64>,
    pub number: Option<u64>,
    pub presentation_time: Option<f64>,
}

impl Segment {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            range: None,
            init: false,
            duration: None,
            number: None,
            presentation_time: None,
        }
    }

    pub(crate) fn initialization(url: Url) -> Self {
        Self {
            init: true,
            ..Self::new(url)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoTrack {
    pub id: String,
    pub label: Option<String>,
    pub language: Option<String>,
    /// Bits per second.
    pub bitrate: u64,
    /// Estimated size in bytes, when the presentation duration is known.
    pub size: Option<u64>,
    pub codec: VideoCodec,
    pub dynamic_range: DynamicRange,
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
    /// Quality label such as `1080p`.
    pub quality: String,
    pub protection: Protection,
    pub segments: Vec<Segment>,
}

impl fmt::Display for VideoTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VIDEO | [{}, {}] | {} | {}x{} @ {} kb/s",
            self.codec,
            self.dynamic_range,
            self.language.as_deref().unwrap_or("und"),
            self.width,
            self.height,
            self.bitrate / 1000,
        )?;
        if let Some(fps) = self.fps {
            write!(f, ", {fps} FPS")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioTrack {
    pub id: String,
    pub label: Option<String>,
    pub language: Option<String>,
    pub bitrate: u64,
    pub size: Option<u64>,
    pub codec: AudioCodec,
    pub channels: Option<f64>,
    /// Sampling rate in Hz.
    pub sampling_rate: Option<u32>,
    /// Dolby Digital Plus JOC complexity index, 0 when absent.
    pub joint_object_coding: u32,
    pub is_descriptive: bool,
    pub protection: Protection,
    pub segments: Vec<Segment>,
}

impl fmt::Display for AudioTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AUDIO | [{}] | ", self.codec)?;
        match self.channels {
            Some(channels) => write!(f, "{channels}")?,
            None => f.write_str("?")?,
        }
        if self.joint_object_coding > 0 {
            write!(f, " (JOC {})", self.joint_object_coding)?;
        }
        write!(
            f,
            " | {} kb/s | {}",
            self.bitrate / 1000,
            self.language.as_deref().unwrap_or("und")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleTrack {
    pub id: String,
    pub label: Option<String>,
    pub language: Option<String>,
    pub bitrate: u64,
    pub size: Option<u64>,
    pub codec: SubtitleCodec,
    pub is_closed_caption: bool,
    pub is_sdh: bool,
    pub is_forced: bool,
    pub protection: Protection,
    pub segments: Vec<Segment>,
}

impl fmt::Display for SubtitleTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SUBTITLE | [{}] | {}",
            self.codec,
            self.language.as_deref().unwrap_or("und")
        )
    }
}

/// A reference to any track variant, for callers that iterate the whole set.
#[derive(Debug, Clone, Copy, Serialize)]
pub enum Track<'a> {
    Video(&'a VideoTrack),
    Audio(&'a AudioTrack),
    Subtitle(&'a SubtitleTrack),
}

impl<'a> Track<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            Self::Video(track) => &track.id,
            Self::Audio(track) => &track.id,
            Self::Subtitle(track) => &track.id,
        }
    }

    pub fn language(&self) -> Option<&'a str> {
        match self {
            Self::Video(track) => track.language.as_deref(),
            Self::Audio(track) => track.language.as_deref(),
            Self::Subtitle(track) => track.language.as_deref(),
        }
    }

    pub fn bitrate(&self) -> u64 {
        match self {
            Self::Video(track) => track.bitrate,
            Self::Audio(track) => track.bitrate,
            Self::Subtitle(track) => track.bitrate,
        }
    }

    pub fn segments(&self) -> &'a [Segment] {
        match self {
            Self::Video(track) => &track.segments,
            Self::Audio(track) => &track.segments,
            Self::Subtitle(track) => &track.segments,
        }
    }
}

/// All tracks of a parsed manifest, grouped by kind, with filter operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tracks {
    pub videos: Vec<VideoTrack>,
    pub audios: Vec<AudioTrack>,
    pub subtitles: Vec<SubtitleTrack>,
}

impl Tracks {
    pub fn all(&self) -> Vec<Track<'_>> {
        let mut all = Vec::with_capacity(self.len());
        all.extend(self.videos.iter().map(Track::Video));
        all.extend(self.audios.iter().map(Track::Audio));
        all.extend(self.subtitles.iter().map(Track::Subtitle));
        all
    }

    pub fn len(&self) -> usize {
        self.videos.len() + self.audios.len() + self.subtitles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn best_video(&self) -> Option<&VideoTrack> {
        self.videos.iter().max_by_key(|track| track.bitrate)
    }

    /// Exact match on either or both dimensions; an omitted dimension is a
    /// wildcard.
    pub fn with_resolution(&self, width: Option<u32>, height: Option<u32>) -> Vec<&VideoTrack> {
        self.videos
            .iter()
            .filter(|track| width.map_or(true, |w| track.width == w))
            .filter(|track| height.map_or(true, |h| track.height == h))
            .collect()
    }

    /// Videos whose quality label matches, best bitrate first. When nothing
    /// matches, falls back to the single best video so the result is never
    /// empty while video tracks exist.
    pub fn with_video_quality(&self, quality: &str) -> Vec<&VideoTrack> {
        let quality = quality.trim();
        if quality.is_empty() {
            return self.best_video().into_iter().collect();
        }
        let label = if quality.ends_with('p') {
            quality.to_string()
        } else {
            format!("{quality}p")
        };
        let mut matches: Vec<&VideoTrack> = self
            .videos
            .iter()
            .filter(|track| track.quality == label)
            .collect();
        matches.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));
        if matches.is_empty() {
            self.best_video().into_iter().collect()
        } else {
            matches
        }
    }

    pub fn with_video_codecs(&self, codecs: &[VideoCodec]) -> Vec<&VideoTrack> {
        if codecs.is_empty() {
            return self.videos.iter().collect();
        }
        let mut matches: Vec<&VideoTrack> = self
            .videos
            .iter()
            .filter(|track| codecs.contains(&track.codec))
            .collect();
        matches.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));
        matches
    }

    pub fn with_audio_codecs(&self, codecs: &[AudioCodec]) -> Vec<&AudioTrack> {
        if codecs.is_empty() {
            return self.audios.iter().collect();
        }
        let mut matches: Vec<&AudioTrack> = self
            .audios
            .iter()
            .filter(|track| codecs.contains(&track.codec))
            .collect();
        matches.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));
        matches
    }

    /// Audio tracks whose language starts with one of the requested tags. An
    /// empty request selects every language present, deduplicated. When
    /// `max_per_language` is given, at most that many tracks are kept per
    /// distinct language.
    pub fn with_audio_languages(
        &self,
        languages: &[&str],
        max_per_language: Option<usize>,
    ) -> Vec<&AudioTrack> {
        let requested: Vec<String> = if languages.is_empty() {
            let mut distinct = Vec::new();
            for track in &self.audios {
                if let Some(language) = &track.language {
                    if !distinct.contains(language) {
                        distinct.push(language.clone());
                    }
                }
            }
            distinct
        } else {
            languages.iter().map(|language| language.to_string()).collect()
        };

        let mut filtered: Vec<&AudioTrack> = Vec::new();
        for language in &requested {
            filtered.extend(self.audios.iter().filter(|track| {
                track
                    .language
                    .as_deref()
                    .is_some_and(|l| l.starts_with(language.as_str()))
            }));
        }

        let cap = max_per_language.unwrap_or(usize::MAX);
        let mut matched_languages: Vec<&str> = Vec::new();
        for track in &filtered {
            if let Some(language) = track.language.as_deref() {
                if !matched_languages.contains(&language) {
                    matched_languages.push(language);
                }
            }
        }

        let mut results = Vec::new();
        for language in matched_languages {
            results.extend(
                filtered
                    .iter()
                    .copied()
                    .filter(|track| track.language.as_deref() == Some(language))
                    .take(cap),
            );
        }
        results
    }

    pub fn with_audio_channels(&self, channels: Option<f64>) -> Vec<&AudioTrack> {
        match channels {
            None => self.audios.iter().collect(),
            Some(channels) => self
                .audios
                .iter()
                .filter(|track| track.channels == Some(channels))
                .collect(),
        }
    }

    /// Subtitle tracks matched by language-tag prefix or by label prefix;
    /// subtitle tracks frequently carry only a label.
    pub fn with_subtitle_languages(&self, languages: &[&str]) -> Vec<&SubtitleTrack> {
        if languages.is_empty() {
            return self.subtitles.iter().collect();
        }
        self.subtitles
            .iter()
            .filter(|track| {
                languages.iter().any(|language| {
                    track
                        .language
                        .as_deref()
                        .is_some_and(|l| l.starts_with(language))
                        || track
                            .label
                            .as_deref()
                            .is_some_and(|l| l.starts_with(language))
                })
            })
            .collect()
    }
}

/// Standard resolutions, 8K down to 144p.
pub(crate) const QUALITIES: [(u32, u32); 9] = [
    (7680, 4320),
    (3840, 2160),
    (2560, 1440),
    (1920, 1080),
    (1280, 720),
    (854, 480),
    (640, 360),
    (426, 240),
    (256, 144),
];

/// Quality label for a resolution; the width match wins over the raw height
/// so that anamorphic encodes land on their canonical label.
pub(crate) fn quality_label(width: u32, height: u32) -> String {
    let canonical = QUALITIES
        .iter()
        .find(|(w, _)| *w == width)
        .map(|(_, h)| *h)
        .unwrap_or(height);
    format!("{canonical}p")
}
