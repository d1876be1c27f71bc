//! Codec and dynamic-range classification tables.
//!
//! Codec strings are matched by the first `.`-delimited part of each
//! comma-separated token, case-insensitively, first match wins.

use std::fmt;

use serde::Serialize;

use crate::error::{NagisaError, NagisaResult};
use crate::xml::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VideoCodec {
    H264,
    H265,
    VC1,
    VP8,
    VP9,
    AV1,
}

impl VideoCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H264 => "H.264",
            Self::H265 => "H.265",
            Self::VC1 => "VC-1",
            Self::VP8 => "VP8",
            Self::VP9 => "VP9",
            Self::AV1 => "AV1",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AudioCodec {
    /// AAC, including its HE/LC profiles signalled as `mp4a.40.*`.
    Aac,
    /// Dolby Digital (AC-3).
    Dd,
    /// Dolby Digital Plus (E-AC-3).
    DdPlus,
    Opus,
    Dts,
    Alac,
    Flac,
}

impl AudioCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aac => "AAC",
            Self::Dd => "DD",
            Self::DdPlus => "DD+",
            Self::Opus => "OPUS",
            Self::Dts => "DTS",
            Self::Alac => "ALAC",
            Self::Flac => "FLAC",
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SubtitleCodec {
    Srt,
    Ssa,
    Ass,
    Ttml,
    Vtt,
    /// TTML in an ISOBMFF box (IMSC1).
    Stpp,
    /// WebVTT in an ISOBMFF box.
    Wvtt,
}

impl SubtitleCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Srt => "SRT",
            Self::Ssa => "SSA",
            Self::Ass => "ASS",
            Self::Ttml => "TTML",
            Self::Vtt => "VTT",
            Self::Stpp => "STPP",
            Self::Wvtt => "WVTT",
        }
    }
}

impl fmt::Display for SubtitleCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DynamicRange {
    Sdr,
    Hdr10,
    Hlg,
    /// Dolby Vision.
    Dv,
}

impl DynamicRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sdr => "SDR",
            Self::Hdr10 => "HDR10",
            Self::Hlg => "HLG",
            Self::Dv => "DV",
        }
    }
}

impl fmt::Display for DynamicRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const AVC: &[&str] = &["avc1", "avc2", "avc3", "dva1", "dvav"];
const HEVC: &[&str] = &[
    "hev1", "hev2", "hev3", "hvc1", "hvc2", "hvc3", "dvh1", "dvhe", "lhv1", "lhe1",
];
const DOLBY_VISION: &[&str] = &["dva1", "dvav", "dvhe", "dvh1"];

/// Yields the first `.`-delimited part of every comma-separated codec token.
fn codec_tags(codecs: &str) -> impl Iterator<Item = String> + '_ {
    codecs.split(',').filter_map(|codec| {
        let tag = codec.trim().split('.').next()?.to_lowercase();
        (!tag.is_empty()).then_some(tag)
    })
}

pub fn parse_video_codec(codecs: &str) -> NagisaResult<VideoCodec> {
    for tag in codec_tags(codecs) {
        let matched = match tag.as_str() {
            _ if AVC.contains(&tag.as_str()) => Some(VideoCodec::H264),
            _ if HEVC.contains(&tag.as_str()) => Some(VideoCodec::H265),
            "vc-1" => Some(VideoCodec::VC1),
            "vp08" | "vp8" => Some(VideoCodec::VP8),
            "vp09" | "vp9" => Some(VideoCodec::VP9),
            "av01" => Some(VideoCodec::AV1),
            _ => None,
        };
        if let Some(codec) = matched {
            return Ok(codec);
        }
    }
    Err(NagisaError::UnsupportedCodec(codecs.to_string()))
}

pub fn parse_audio_codec(codecs: &str) -> NagisaResult<AudioCodec> {
    for tag in codec_tags(codecs) {
        let matched = match tag.as_str() {
            "mp4a" => Some(AudioCodec::Aac),
            "ac-3" => Some(AudioCodec::Dd),
            "ec-3" => Some(AudioCodec::DdPlus),
            "opus" => Some(AudioCodec::Opus),
            "dtsc" => Some(AudioCodec::Dts),
            "alac" => Some(AudioCodec::Alac),
            "flac" => Some(AudioCodec::Flac),
            _ => None,
        };
        if let Some(codec) = matched {
            return Ok(codec);
        }
    }
    Err(NagisaError::UnsupportedCodec(codecs.to_string()))
}

pub fn parse_subtitle_codec(codecs: &str) -> NagisaResult<SubtitleCodec> {
    for tag in codec_tags(codecs) {
        let matched = match tag.as_str() {
            "srt" => Some(SubtitleCodec::Srt),
            "ssa" => Some(SubtitleCodec::Ssa),
            "ass" => Some(SubtitleCodec::Ass),
            "ttml" => Some(SubtitleCodec::Ttml),
            "vtt" => Some(SubtitleCodec::Vtt),
            "stpp" => Some(SubtitleCodec::Stpp),
            "wvtt" => Some(SubtitleCodec::Wvtt),
            _ => None,
        };
        if let Some(codec) = matched {
            return Ok(codec);
        }
    }
    Err(NagisaError::UnsupportedCodec(codecs.to_string()))
}

pub(crate) const CICP_PRIMARIES: &str = "urn:mpeg:mpegB:cicp:ColourPrimaries";
pub(crate) const CICP_TRANSFER: &str = "urn:mpeg:mpegB:cicp:TransferCharacteristics";
pub(crate) const CICP_MATRIX: &str = "urn:mpeg:mpegB:cicp:MatrixCoefficients";

const PRIMARIES_BT_601_625: i64 = 5;
const PRIMARIES_BT_601_525: i64 = 6;
const TRANSFER_BT_601: i64 = 6;
const TRANSFER_BT_2100_PQ: i64 = 16;
const TRANSFER_BT_2100_HLG: i64 = 18;

/// Classifies the dynamic range from the codec string and the CICP colour
/// code points carried in `SupplementalProperty` / `EssentialProperty`
/// descriptors. A Dolby Vision codec wins over any CICP signalling.
pub fn parse_dynamic_range(codecs: &str, properties: &[&Element]) -> DynamicRange {
    let codecs = codecs.trim().to_lowercase();
    if DOLBY_VISION.iter().any(|tag| codecs.starts_with(tag)) {
        return DynamicRange::Dv;
    }

    let value_of = |scheme: &str| -> i64 {
        properties
            .iter()
            .filter(|property| property.attr("schemeIdUri") == Some(scheme))
            .filter_map(|property| property.attr("value")?.trim().parse::<i64>().ok())
            .sum()
    };
    let primaries = value_of(CICP_PRIMARIES);
    let mut transfer = value_of(CICP_TRANSFER);
    let matrix = value_of(CICP_MATRIX);

    // Transfer 5 is the PAL variant of BT.601; fold it into 6.
    if transfer == 5 {
        transfer = TRANSFER_BT_601;
    }

    if primaries == 0 && transfer == 0 && matrix == 0 {
        DynamicRange::Sdr
    } else if primaries == PRIMARIES_BT_601_625 || primaries == PRIMARIES_BT_601_525 {
        DynamicRange::Sdr
    } else if transfer == TRANSFER_BT_2100_PQ {
        DynamicRange::Hdr10
    } else if transfer == TRANSFER_BT_2100_HLG {
        DynamicRange::Hlg
    } else {
        DynamicRange::Sdr
    }
}
