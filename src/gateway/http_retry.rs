//! Retry wrapper for idempotent reads.
//!
//! Listing, search and lookup requests are retried on 429/5xx with
//! exponential backoff and `Retry-After` support. Mutations go through
//! `RequestBuilder::send` directly and are never retried; the user
//! re-triggers a failed action.

use reqwest::{RequestBuilder, Response};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpRetryConfig {
    /// Maximum number of retry attempts (default: 2)
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff (default: 500)
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds (default: 10000)
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl HttpRetryConfig {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Parse Retry-After header value (seconds only)
fn parse_retry_after(response: &Response) -> Option<Duration> {
    let value = response.headers().get("retry-after")?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(|secs| Duration::from_secs(secs.min(60)))
}

/// Calculate delay for a given retry attempt with 10-30% jitter
fn calculate_delay(attempt: u32, config: &HttpRetryConfig) -> Duration {
    let base = config.base_delay_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(config.max_delay_ms as f64);
    let jitter = capped * (0.1 + rand::random::<f64>() * 0.2);
    Duration::from_millis((capped + jitter) as u64)
}

/// Send a request, retrying on 429/5xx.
///
/// The builder must be cloneable (no streaming body); if it is not, the
/// request is sent once.
pub async fn send_with_retry(
    request: RequestBuilder,
    config: &HttpRetryConfig,
) -> Result<Response, reqwest::Error> {
    let Some(first) = request.try_clone() else {
        return request.send().await;
    };
    let mut last_response = first.send().await?;

    for attempt in 0..config.max_retries {
        let status = last_response.status().as_u16();
        if !is_retryable_status(status) {
            return Ok(last_response);
        }
        let Some(retry) = request.try_clone() else {
            return Ok(last_response);
        };

        let delay = parse_retry_after(&last_response)
            .unwrap_or_else(|| calculate_delay(attempt, config));

        tracing::debug!(
            "HTTP {} returned {}. Retry {}/{} after {:?}",
            last_response.url().path(), status, attempt + 1, config.max_retries, delay
        );

        tokio::time::sleep(delay).await;
        last_response = retry.send().await?;
    }

    Ok(last_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(200));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn test_calculate_delay_bounded() {
        let config = HttpRetryConfig::default();
        for attempt in 0..10 {
            let delay = calculate_delay(attempt, &config);
            assert!(delay.as_millis() <= (config.max_delay_ms as u128 * 2));
        }
    }

    #[tokio::test]
    async fn test_retries_server_errors_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/folder/list")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        let config = HttpRetryConfig {
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 1.0,
        };
        let client = reqwest::Client::new();
        let url = format!("{}/folder/list", server.url());
        let resp = send_with_retry(client.get(&url), &config).await.unwrap();
        assert_eq!(resp.status().as_u16(), 503);
        failing.assert_async().await;
    }
}
