use std::future::Future;
use std::ops::Deref;

use bytes::Bytes;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::Client;
use url::Url;

use crate::error::{NagisaError, NagisaResult};

/// Response of a byte-range request. `content_range` is the raw
/// `Content-Range` header value, when the server sent one.
#[derive(Debug, Clone)]
pub struct RangeResponse {
    pub body: Bytes,
    pub content_range: Option<String>,
}

/// The one network operation the parser may perform: a single range request
/// used by the `SegmentBase` path to discover a resource's total size. The
/// parser treats it as best-effort and degrades when it is absent or fails.
pub trait RangeFetch {
    fn fetch_range(
        &self,
        url: &Url,
        range: Option<&str>,
    ) -> impl Future<Output = NagisaResult<RangeResponse>> + Send;
}

#[derive(Clone, Default)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl RangeFetch for HttpClient {
    fn fetch_range(
        &self,
        url: &Url,
        range: Option<&str>,
    ) -> impl Future<Output = NagisaResult<RangeResponse>> + Send {
        let mut request = self.client.get(url.clone());
        if let Some(range) = range {
            request = request.header(RANGE, format!("bytes={range}"));
        }
        async move {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(NagisaError::HttpError(response.status()));
            }
            let content_range = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await?;
            Ok(RangeResponse { body, content_range })
        }
    }
}

/// Extracts the complete length from a `Content-Range` value such as
/// `bytes 0-741/84231`. An unknown length (`*`) yields `None`.
pub(crate) fn content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_range_total() {
        assert_eq!(content_range_total("bytes 0-741/84231"), Some(84231));
        assert_eq!(content_range_total("bytes 0-741/*"), None);
        assert_eq!(content_range_total("84231"), None);
    }
}
