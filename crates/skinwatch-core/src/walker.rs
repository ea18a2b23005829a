//! Manual redirect walking.
//!
//! The storefront signals product state purely through where a browser ends
//! up, so redirects are followed one hop at a time with automatic following
//! turned off. Every hop carries the same browser-like headers and the session
//! cookie.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, LOCATION};
use reqwest::Url;

use crate::error::{Result, TransportError, WatchError};

pub const MAX_REDIRECTS: usize = 10;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    ),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9,fr;q=0.8"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
];

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// What a single hop tells us: the status and, for redirects, where to go next.
#[derive(Debug, Clone, PartialEq)]
pub struct HopResponse {
    pub status: u16,
    pub location: Option<String>,
}

/// A GET capability that never follows redirects on its own.
pub trait HttpTransport: Send + Sync {
    fn get(
        &self,
        url: &Url,
        headers: &HeaderMap,
    ) -> impl Future<Output = std::result::Result<HopResponse, TransportError>> + Send;
}

/// `reqwest` client with redirects disabled and a per-request timeout.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| WatchError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &Url,
        headers: &HeaderMap,
    ) -> std::result::Result<HopResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .headers(headers.clone())
            .send()
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    TransportError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    TransportError::Request {
                        url: url.to_string(),
                        source,
                    }
                }
            })?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Ok(HopResponse {
            status: response.status().as_u16(),
            location,
        })
    }
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// Where the walk stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkResult {
    pub final_url: String,
    /// `0` means the redirect budget was exhausted.
    pub final_status: u16,
}

pub fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Build the per-hop header set: fixed browser headers plus the cookie.
///
/// Fails when the credential contains bytes that cannot appear in a header,
/// which makes it unusable for the whole cycle.
pub fn session_headers(credential: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(BROWSER_HEADERS.len() + 1);
    for &(name, value) in BROWSER_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    let mut cookie = HeaderValue::from_str(credential).map_err(|_| {
        WatchError::InvalidConfig("session credential is not a valid header value".into())
    })?;
    cookie.set_sensitive(true);
    headers.insert(COOKIE, cookie);
    Ok(headers)
}

pub struct RedirectWalker<T> {
    transport: T,
    max_redirects: usize,
}

impl<T: HttpTransport> RedirectWalker<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_redirects: MAX_REDIRECTS,
        }
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Walk `url` with `credential` attached as the cookie.
    pub async fn walk(&self, url: &str, credential: &str) -> Result<WalkResult> {
        let headers = session_headers(credential)?;
        Ok(self.walk_with_headers(url, &headers).await?)
    }

    /// Walk `url` reusing a prepared header set (see [`session_headers`]).
    pub async fn walk_with_headers(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> std::result::Result<WalkResult, TransportError> {
        let mut current = Url::parse(url).map_err(|e| TransportError::BadUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        for hop in 0..self.max_redirects {
            let response = self.transport.get(&current, headers).await?;

            if !is_redirect(response.status) {
                return Ok(WalkResult {
                    final_url: current.into(),
                    final_status: response.status,
                });
            }

            let Some(location) = response.location else {
                tracing::debug!(url = %current, status = response.status, "redirect without location");
                return Ok(WalkResult {
                    final_url: current.into(),
                    final_status: response.status,
                });
            };

            // join() replaces the URL outright for absolute locations and
            // resolves root-relative ones against the current origin.
            let next = current
                .join(&location)
                .map_err(|_| TransportError::BadLocation {
                    base: current.to_string(),
                    location: location.clone(),
                })?;
            tracing::trace!(hop, from = %current, to = %next, "following redirect");
            current = next;
        }

        Ok(WalkResult {
            final_url: current.into(),
            final_status: 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
