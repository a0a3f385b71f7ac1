use std::time::Duration;

use isahc::HttpClient;
use isahc::prelude::*;

use crate::config::REMOTE_TIMEOUT_SECS;
use crate::error::TransportError;

/// Anything that can hold the light state token. Implemented by
/// [`RemoteStateClient`]; shared with the mirror worker behind an `Arc`.
pub trait StateStore: Send + Sync + 'static {
    fn read(&self) -> Result<String, TransportError>;
    fn write(&self, value: &str) -> Result<String, TransportError>;
}

/// Plain-text HTTP store: `GET /simple/read`, `PUT /simple/write/<token>`.
/// Never retries; the mirror worker does that.
pub struct RemoteStateClient {
    endpoint: String,
    timeout: Duration,
    client: HttpClient,
}

impl RemoteStateClient {
    pub fn new(endpoint: &str) -> Result<Self, TransportError> {
        Self::with_timeout(endpoint, Duration::from_secs(REMOTE_TIMEOUT_SECS))
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = HttpClient::builder()
            .timeout(timeout)
            .default_headers(&[("User-Agent", "SmartLight/1.0")])
            .build()?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn read_url(&self) -> String {
        format!("{}/simple/read", self.endpoint)
    }

    pub fn write_url(&self, value: &str) -> String {
        format!("{}/simple/write/{}", self.endpoint, encode_path_segment(value))
    }

    /// GET the current token. Blocks up to the configured timeout.
    pub fn read(&self) -> Result<String, TransportError> {
        let url = self.read_url();
        let response = self.client.get(url.as_str())?;
        finish("GET", &url, response)
    }

    /// PUT `value` into the store, embedded in the URL path (the request body
    /// is empty). Blocks up to the configured timeout.
    pub fn write(&self, value: &str) -> Result<String, TransportError> {
        let url = self.write_url(value);
        let response = self.client.put(url.as_str(), ())?;
        finish("PUT", &url, response)
    }
}

impl StateStore for RemoteStateClient {
    fn read(&self) -> Result<String, TransportError> {
        RemoteStateClient::read(self)
    }

    fn write(&self, value: &str) -> Result<String, TransportError> {
        RemoteStateClient::write(self, value)
    }
}

fn finish(
    method: &str,
    url: &str,
    mut response: isahc::Response<isahc::Body>,
) -> Result<String, TransportError> {
    let status = response.status();
    log::info!("{} {} -> {}", method, url, status);

    let body = response
        .text()
        .map_err(|e| TransportError::Body(e.to_string()))?;
    log::debug!("{} {} body: {:?}", method, url, body);

    if !status.is_success() {
        return Err(TransportError::Status {
            code: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Percent-encode everything outside the RFC 3986 unreserved set so a token
/// always stays a single path segment. `.` and `..` are encoded in full, or
/// the client would collapse them as dot segments.
fn encode_path_segment(value: &str) -> String {
    if value == "." || value == ".." {
        return "%2E".repeat(value.len());
    }

    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
