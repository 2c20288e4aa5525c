//! Shared HTTP plumbing: client construction, auth, status checks.

use crate::config::{RemoteConfig, RemoteTimeouts};
use crate::error::RemoteError;
use std::time::Duration;

/// Longest error body kept in [`RemoteError::Status`].
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn build_client(timeouts: RemoteTimeouts) -> Result<reqwest::Client, RemoteError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| RemoteError::HttpClientBuild(e.to_string()))
}

pub(crate) fn authorize(request: reqwest::RequestBuilder, config: &RemoteConfig) -> reqwest::RequestBuilder {
    match &config.token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Send a request and return the body of a 2xx response.
pub(crate) async fn send(request: reqwest::RequestBuilder) -> Result<Vec<u8>, RemoteError> {
    let response = request.send().await.map_err(|e| RemoteError::from_reqwest(&e))?;
    let status = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .map_err(|e| RemoteError::from_reqwest(&e))?
        .to_vec();
    check_status(status, body)
}

pub(crate) fn check_status(status: u16, body: Vec<u8>) -> Result<Vec<u8>, RemoteError> {
    if (200..300).contains(&status) {
        return Ok(body);
    }
    let mut text = String::from_utf8_lossy(&body).into_owned();
    if text.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
        text.truncate(cut);
    }
    Err(RemoteError::Status { status, body: text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_passes_body_through() {
        assert_eq!(check_status(200, b"ok".to_vec()).unwrap(), b"ok".to_vec());
        assert_eq!(check_status(204, Vec::new()).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn failure_keeps_truncated_body() {
        let err = check_status(502, vec![b'x'; 2000]).unwrap_err();
        match err {
            RemoteError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.len(), MAX_ERROR_BODY);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
