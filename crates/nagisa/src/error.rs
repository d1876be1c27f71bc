use thiserror::Error;

#[derive(Error, Debug)]
pub enum NagisaError {
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    #[error("input does not look like a DASH or HLS manifest")]
    InvalidManifest,

    #[error("cannot determine content type of representation {0:?}")]
    UnknownContentType(String),

    #[error("no supported codec matched {0:?}")]
    UnsupportedCodec(String),

    #[error("cannot resolve an absolute base URL for {0:?}")]
    UnresolvableBaseUrl(String),

    #[error("no usable segment addressing strategy for representation {0:?}")]
    NoSegmentStrategy(String),

    #[error("a duration is required to expand segments of representation {0:?}")]
    DurationRequired(String),

    #[error("invalid M3U8 playlist: {0}")]
    M3u8Parse(String),

    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),
}

pub type NagisaResult<T> = Result<T, NagisaError>;
