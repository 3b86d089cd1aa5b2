//! The retry loop for one logical API call.
//!
//! A logical call makes up to [`RetryPolicy::max_attempts`] physical
//! attempts. Each attempt is rebuilt from scratch by the caller (fresh
//! timestamp, fresh nonce, fresh signature) so that the server never sees
//! a replayed `Authorize` header.
//!
//! | Outcome of one attempt      | Action                                |
//! |-----------------------------|---------------------------------------|
//! | `Maintenance: 1` header     | fail with `Maintenance`               |
//! | status 200                  | return the response                   |
//! | status 5xx or 204           | retry                                 |
//! | any other status            | fail with `Status(code)`              |
//! | timeout                     | retry                                 |
//! | any other network error     | fail with that error                  |

use crate::{HttpExchange, HttpRequest, HttpResponse, TransportError, check_maintenance};

/// How many physical attempts one logical call may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 10 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Returns `true` for statuses that are retried: any 5xx, and 204
    /// (the server's "busy, try again" answer).
    pub fn should_retry_status(status: u16) -> bool {
        (500..600).contains(&status) || status == 204
    }

    /// Runs attempts until one succeeds or the budget is spent.
    ///
    /// `build` is called once per attempt with the 1-based attempt number
    /// and must return a freshly signed request. Building can fail with the
    /// caller's own error type, which is why the loop is generic over `E`.
    ///
    /// # Errors
    /// - `build`'s error, unchanged
    /// - [`TransportError::Maintenance`] as soon as it's seen
    /// - [`TransportError::Status`] for a non-retryable status
    /// - any non-timeout network error from the exchange
    /// - [`TransportError::RetriesExhausted`] when every attempt failed
    ///   transiently
    pub async fn run<X, F, E>(&self, exchange: &X, mut build: F) -> Result<HttpResponse, E>
    where
        X: HttpExchange + ?Sized,
        F: FnMut(u32) -> Result<HttpRequest, E>,
        E: From<TransportError>,
    {
        for attempt in 1..=self.max_attempts {
            let request = build(attempt)?;
            let method = request.method;
            let path = request.path.clone();

            match exchange.exchange(request).await {
                Ok(response) => {
                    check_maintenance(&response)?;
                    match response.status {
                        200 => {
                            tracing::debug!(%method, %path, attempt, "request succeeded");
                            return Ok(response);
                        }
                        status if Self::should_retry_status(status) => {
                            tracing::warn!(%method, %path, attempt, status, "retrying after server status");
                        }
                        status => {
                            tracing::error!(%method, %path, attempt, status, "request rejected");
                            return Err(TransportError::Status(status).into());
                        }
                    }
                }
                Err(error) if error.is_transient() => {
                    tracing::warn!(%method, %path, attempt, %error, "retrying after transient error");
                }
                Err(error) => {
                    tracing::error!(%method, %path, attempt, %error, "request failed");
                    return Err(error.into());
                }
            }
        }

        tracing::error!(attempts = self.max_attempts, "retry budget exhausted");
        Err(TransportError::RetriesExhausted {
            attempts: self.max_attempts,
        }
        .into())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use sifemu_protocol::HeaderSet;

    use super::*;

    /// Replays a fixed script of outcomes and records every request.
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(outcomes: impl IntoIterator<Item = Result<HttpResponse, TransportError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn attempts(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl HttpExchange for Scripted {
        async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(200)))
        }
    }

    fn request(attempt: u32) -> Result<HttpRequest, TransportError> {
        let mut headers = HeaderSet::new();
        headers.push("Attempt", attempt.to_string());
        Ok(HttpRequest::post("/main.php/api", headers, Vec::new(), Duration::from_secs(1)))
    }

    fn status(code: u16) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(code))
    }

    #[test]
    fn test_should_retry_status() {
        assert!(RetryPolicy::should_retry_status(500));
        assert!(RetryPolicy::should_retry_status(503));
        assert!(RetryPolicy::should_retry_status(599));
        assert!(RetryPolicy::should_retry_status(204));
        assert!(!RetryPolicy::should_retry_status(200));
        assert!(!RetryPolicy::should_retry_status(403));
        assert!(!RetryPolicy::should_retry_status(404));
    }

    #[tokio::test]
    async fn test_run_succeeds_on_last_attempt() {
        let exchange = Scripted::new((0..9).map(|_| status(503)).chain([status(200)]));

        let response = RetryPolicy::default()
            .run(&exchange, request)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(exchange.attempts(), 10);
    }

    #[tokio::test]
    async fn test_run_exhausts_budget() {
        let exchange = Scripted::new((0..10).map(|_| status(503)));

        let result = RetryPolicy::default().run(&exchange, request).await;

        assert!(matches!(
            result,
            Err(TransportError::RetriesExhausted { attempts: 10 })
        ));
        assert_eq!(exchange.attempts(), 10);
    }

    #[tokio::test]
    async fn test_run_non_retryable_status_fails_after_one_attempt() {
        let exchange = Scripted::new([status(404)]);

        let result = RetryPolicy::default().run(&exchange, request).await;

        assert!(matches!(result, Err(TransportError::Status(404))));
        assert_eq!(exchange.attempts(), 1);
    }

    #[tokio::test]
    async fn test_run_retries_timeouts_and_204() {
        let exchange = Scripted::new([
            Err(TransportError::Timeout),
            status(204),
            status(200),
        ]);

        let response = RetryPolicy::default()
            .run(&exchange, request)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(exchange.attempts(), 3);
    }

    #[tokio::test]
    async fn test_run_connection_error_is_fatal() {
        let exchange = Scripted::new([Err(TransportError::Connection("refused".into()))]);

        let result = RetryPolicy::default().run(&exchange, request).await;

        assert!(matches!(result, Err(TransportError::Connection(_))));
        assert_eq!(exchange.attempts(), 1);
    }

    #[tokio::test]
    async fn test_run_maintenance_stops_immediately() {
        let exchange = Scripted::new([Ok(HttpResponse::new(503).with_header("Maintenance", "1"))]);

        let result = RetryPolicy::default().run(&exchange, request).await;

        assert!(matches!(result, Err(TransportError::Maintenance)));
        assert_eq!(exchange.attempts(), 1);
    }

    #[tokio::test]
    async fn test_run_rebuilds_each_attempt() {
        let exchange = Scripted::new([status(500), status(500), status(200)]);

        RetryPolicy::new(3).run(&exchange, request).await.unwrap();

        let seen = exchange.seen.lock().unwrap();
        let attempts: Vec<_> = seen
            .iter()
            .map(|r| r.headers.get("Attempt").unwrap().to_string())
            .collect();
        assert_eq!(attempts, ["1", "2", "3"]);
    }
}
