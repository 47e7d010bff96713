//! Stream Probing Service
//!
//! Defines the [`Prober`] capability the verifier dispatches to, and the
//! production implementation that checks a stream over HTTP by requesting the
//! first few kilobytes of it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, RANGE, REFERER, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProberConfig;
use crate::errors::{AppResult, ProbeError, ProbeOutcome};
use crate::models::StreamEntry;
use crate::utils::UrlUtils;

/// Per-stream HTTP header overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeHeaders {
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl ProbeHeaders {
    pub fn from_entry(entry: &StreamEntry) -> Self {
        Self {
            referrer: entry.http_referrer.clone().filter(|v| !v.is_empty()),
            user_agent: entry.http_user_agent.clone().filter(|v| !v.is_empty()),
        }
    }
}

/// Answer from a prober that reached the remote end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub ok: bool,
    pub status_detail: String,
}

impl ProbeResult {
    pub fn ok<S: Into<String>>(status_detail: S) -> Self {
        Self {
            ok: true,
            status_detail: status_detail.into(),
        }
    }

    pub fn failed<S: Into<String>>(status_detail: S) -> Self {
        Self {
            ok: false,
            status_detail: status_detail.into(),
        }
    }
}

/// Capability to check a single stream URL
///
/// Implementations report transport problems as [`ProbeError`] and a reached
/// but unusable stream as `ProbeResult { ok: false, .. }`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(
        &self,
        url: &str,
        headers: &ProbeHeaders,
        timeout: Duration,
    ) -> ProbeOutcome<ProbeResult>;
}

/// Prober that issues a ranged `GET` and inspects the first body chunk
pub struct HttpProber {
    client: Client,
    config: ProberConfig,
}

impl HttpProber {
    pub fn new(config: ProberConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    fn range_header(&self) -> String {
        format!("bytes=0-{}", self.config.range_bytes.saturating_sub(1))
    }
}

/// Render an error followed by each of its sources
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Map a reqwest failure onto the three-way probe classification
///
/// Only a failure to establish the connection counts as `ConnectFailed`;
/// anything that goes wrong once the remote end accepted is a protocol
/// error.
fn classify_request_error(err: reqwest::Error) -> ProbeError {
    let message = UrlUtils::obfuscate_credentials(&error_chain(&err));

    if err.is_timeout() {
        ProbeError::timeout(message)
    } else if err.is_connect() {
        ProbeError::connect_failed(message)
    } else {
        ProbeError::protocol(message)
    }
}

fn looks_like_playlist(body: &[u8]) -> bool {
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    body.trim_ascii_start().starts_with(b"#EXTM3U")
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(
        &self,
        url: &str,
        headers: &ProbeHeaders,
        timeout: Duration,
    ) -> ProbeOutcome<ProbeResult> {
        debug!("Probing stream: {}", UrlUtils::obfuscate_credentials(url));

        let user_agent = headers
            .user_agent
            .as_deref()
            .unwrap_or(self.config.user_agent.as_str());

        let mut request = self
            .client
            .get(url)
            .timeout(timeout)
            .header(USER_AGENT, user_agent)
            .header(RANGE, self.range_header());

        if let Some(referrer) = &headers.referrer {
            request = request.header(REFERER, referrer);
        }

        let mut response = request.send().await.map_err(classify_request_error)?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("Unknown");
        if !status.is_success() {
            return Ok(ProbeResult::failed(format!(
                "HTTP {} {}",
                status.as_u16(),
                reason
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let expects_playlist =
            content_type.contains("mpegurl") || UrlUtils::is_hls_path(response.url().as_str());

        let first_chunk = response.chunk().await.map_err(classify_request_error)?;

        let Some(chunk) = first_chunk else {
            return Ok(ProbeResult::failed(format!(
                "HTTP {} {} with empty body",
                status.as_u16(),
                reason
            )));
        };

        if expects_playlist && !looks_like_playlist(&chunk) {
            return Ok(ProbeResult::failed("response is not an HLS playlist"));
        }

        let detail = if content_type.is_empty() {
            format!("HTTP {} {}", status.as_u16(), reason)
        } else {
            format!("HTTP {} {} ({})", status.as_u16(), reason, content_type)
        };

        debug!(
            "Stream responded: {} - {} ({} bytes read)",
            UrlUtils::obfuscate_credentials(url),
            detail,
            chunk.len()
        );

        Ok(ProbeResult::ok(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_from_entry_drop_empty_values() {
        let mut entry = StreamEntry::new("BBC", "http://example.com/bbc.m3u8").with_referrer("http://x");
        entry.http_user_agent = Some(String::new());

        let headers = ProbeHeaders::from_entry(&entry);
        assert_eq!(headers.referrer.as_deref(), Some("http://x"));
        assert_eq!(headers.user_agent, None);
    }

    #[test]
    fn test_range_header() {
        let prober = HttpProber::new(ProberConfig {
            range_bytes: 2048,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(prober.range_header(), "bytes=0-2047");
    }

    #[test]
    fn test_looks_like_playlist() {
        assert!(looks_like_playlist(b"#EXTM3U\n#EXT-X-VERSION:3\n"));
        assert!(looks_like_playlist(b"\xEF\xBB\xBF#EXTM3U\n"));
        assert!(looks_like_playlist(b"\r\n  #EXTM3U"));
        assert!(!looks_like_playlist(b"<html><body>blocked</body></html>"));
        assert!(!looks_like_playlist(b""));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("error sending request")]
    struct Outer(#[source] Middle);

    #[derive(Debug, thiserror::Error)]
    #[error("client error")]
    struct Middle(#[source] std::io::Error);

    #[test]
    fn test_error_chain_includes_sources() {
        let err = Outer(Middle(std::io::Error::other("invalid HTTP version parsed")));
        assert_eq!(
            error_chain(&err),
            "error sending request: client error: invalid HTTP version parsed"
        );
    }

    #[tokio::test]
    async fn test_malformed_url_is_protocol_error() {
        let prober = HttpProber::new(ProberConfig::default()).unwrap();
        let err = prober
            .probe("not a url", &ProbeHeaders::default(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::errors::ProbeErrorKind::ProtocolError);
    }
}
