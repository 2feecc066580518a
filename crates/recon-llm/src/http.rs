//! Shared HTTP client construction and response checks.

use std::time::Duration;

use crate::error::LlmError;

/// Timeout for dependency health probes.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest error body kept in `LlmError::Status`.
const MAX_ERROR_BODY: usize = 512;

/// Create an HTTP client with the given request timeout.
///
/// Config: 10s connect timeout, rustls TLS, `recon/{version}` user-agent,
/// redirect limit 10.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized (should never happen with rustls).
#[must_use]
pub fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .user_agent(concat!("recon/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("HTTP client construction must not fail")
}

/// Parse the `Retry-After` header value as whole seconds.
pub(crate) fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    let secs = response
        .headers()
        .get("retry-after")?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    Some(Duration::from_secs(secs))
}

/// Map non-success statuses to `LlmError`, passing successful responses through.
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimited {
            service,
            retry_after: retry_after(&response),
        });
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(LlmError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn client_builds_successfully() {
        let _client = client_with_timeout(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn check_status_passes_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let resp = reqwest::get(server.uri()).await.unwrap();
        assert!(check_status("test", resp).await.is_ok());
    }

    #[tokio::test]
    async fn check_status_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let resp = reqwest::get(server.uri()).await.unwrap();
        let err = check_status("test", resp).await.unwrap_err();
        assert!(matches!(
            err,
            LlmError::RateLimited {
                retry_after: Some(d),
                ..
            } if d == Duration::from_secs(3)
        ));
    }

    #[tokio::test]
    async fn check_status_truncates_long_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(4096)))
            .mount(&server)
            .await;

        let resp = reqwest::get(server.uri()).await.unwrap();
        let err = check_status("test", resp).await.unwrap_err();
        match err {
            LlmError::Status { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), MAX_ERROR_BODY);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
