//! Shared helpers for upstream HTTP calls.

use docqa_core::{Error, Result};
use reqwest::Response;

/// Pass through a successful response, or turn a non-2xx status into
/// `Error::Upstream` carrying the response body.
pub async fn ensure_success(service: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Upstream {
        service: service.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Map a transport failure (connect, timeout, decode) into `Error::Http`.
pub fn request_error(service: &str, err: reqwest::Error) -> Error {
    Error::Http(format!("{} request failed: {}", service, err))
}
