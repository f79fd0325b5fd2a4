//! Change-token retry wrapper for WAF Classic mutations

use std::future::Future;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

use super::{RETRYABLE_CODES, WafApi};
use crate::config::RetryConfig;
use crate::error::{ApiError, ApiResult};

/// Runs token-bearing WAF calls one at a time, retrying stale tokens
pub struct Retryer<'a> {
    api: &'a dyn WafApi,
    lock: &'a Mutex<()>,
    config: &'a RetryConfig,
}

impl<'a> Retryer<'a> {
    pub fn new(api: &'a dyn WafApi, lock: &'a Mutex<()>, config: &'a RetryConfig) -> Self {
        Self { api, lock, config }
    }

    /// Call `f` with a fresh change token until it succeeds.
    ///
    /// The lock is held across all attempts. Failing to obtain a token ends
    /// the call immediately; so does any error whose code is not retryable.
    /// Retryable errors are retried with backoff until `timeout` would be
    /// exceeded, then returned wrapped in [`ApiError::Timeout`].
    pub async fn retry_with_token<T, F, Fut>(&self, mut f: F) -> ApiResult<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let _guard = self.lock.lock().await;
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let token = self.api.get_change_token().await?;

            let err = match f(token).await {
                Ok(output) => return Ok(output),
                Err(err) if err.is_code(RETRYABLE_CODES) => err,
                Err(err) => return Err(err),
            };

            let delay = self.config.delay_for(attempt);
            if started.elapsed() + delay > self.config.timeout {
                return Err(ApiError::Timeout(Box::new(err)));
            }

            log::debug!(
                "WAF call failed with {} (attempt {}), retrying in {:?}",
                err,
                attempt + 1,
                delay
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::waf::{ERR_STALE_DATA, SizeConstraintSet, SizeConstraintSetUpdate};

    /// Hands out numbered tokens; everything else is unused here
    #[derive(Default)]
    struct TokenApi {
        issued: AtomicUsize,
        fail_tokens: bool,
    }

    #[async_trait]
    impl WafApi for TokenApi {
        async fn get_change_token(&self) -> ApiResult<String> {
            if self.fail_tokens {
                return Err(ApiError::service("AccessDeniedException", "denied"));
            }
            let n = self.issued.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-{}", n))
        }

        async fn create_size_constraint_set(&self, _: &str, _: &str) -> ApiResult<SizeConstraintSet> {
            unimplemented!()
        }

        async fn get_size_constraint_set(&self, _: &str) -> ApiResult<Option<SizeConstraintSet>> {
            unimplemented!()
        }

        async fn update_size_constraint_set(
            &self,
            _: &str,
            _: &str,
            _: &[SizeConstraintSetUpdate],
        ) -> ApiResult<()> {
            unimplemented!()
        }

        async fn delete_size_constraint_set(&self, _: &str, _: &str) -> ApiResult<()> {
            unimplemented!()
        }
    }

    fn stale() -> ApiError {
        ApiError::service(ERR_STALE_DATA, "stale")
    }

    #[tokio::test(start_paused = true)]
    async fn retries_stale_token_with_new_token() {
        let api = TokenApi::default();
        let lock = Mutex::new(());
        let config = RetryConfig::default();
        let mut seen = Vec::new();

        let result = Retryer::new(&api, &lock, &config)
            .retry_with_token(|token| {
                seen.push(token.clone());
                let fail = seen.len() < 3;
                async move { if fail { Err(stale()) } else { Ok(token) } }
            })
            .await;

        assert_eq!(result, Ok("token-2".to_string()));
        assert_eq!(seen, vec!["token-0", "token-1", "token-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_not_retried() {
        let api = TokenApi::default();
        let lock = Mutex::new(());
        let config = RetryConfig::default();
        let mut calls = 0;

        let result: ApiResult<()> = Retryer::new(&api, &lock, &config)
            .retry_with_token(|_| {
                calls += 1;
                async { Err(ApiError::service("WAFInvalidParameterException", "bad")) }
            })
            .await;

        assert_eq!(result.unwrap_err().code(), Some("WAFInvalidParameterException"));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn token_failure_is_not_retried() {
        let api = TokenApi {
            fail_tokens: true,
            ..Default::default()
        };
        let lock = Mutex::new(());
        let config = RetryConfig::default();
        let mut calls = 0;

        let result: ApiResult<()> = Retryer::new(&api, &lock, &config)
            .retry_with_token(|_| {
                calls += 1;
                async { Ok(()) }
            })
            .await;

        assert_eq!(result.unwrap_err().code(), Some("AccessDeniedException"));
        assert_eq!(calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_timeout() {
        let api = TokenApi::default();
        let lock = Mutex::new(());
        let config = RetryConfig {
            timeout: Duration::from_secs(10),
            ..Default::default()
        };
        let mut calls = 0;
        let started = Instant::now();

        let result: ApiResult<()> = Retryer::new(&api, &lock, &config)
            .retry_with_token(|_| {
                calls += 1;
                async { Err(stale()) }
            })
            .await;

        // Sleeps of 1s, 2s and 4s fit in 10s; the next 8s does not
        assert!(matches!(result, Err(ApiError::Timeout(_))));
        assert_eq!(result.unwrap_err().code(), Some(ERR_STALE_DATA));
        assert_eq!(calls, 4);
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn calls_are_serialized() {
        let api = Arc::new(TokenApi::default());
        let lock = Arc::new(Mutex::new(()));
        let config = Arc::new(RetryConfig::default());
        let in_flight = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let (api, lock, config, in_flight) =
                (api.clone(), lock.clone(), config.clone(), in_flight.clone());
            handles.push(tokio::spawn(async move {
                Retryer::new(api.as_ref(), &lock, &config)
                    .retry_with_token(|_| {
                        let in_flight = in_flight.clone();
                        async move {
                            assert!(!in_flight.swap(true, Ordering::SeqCst));
                            sleep(Duration::from_millis(50)).await;
                            in_flight.store(false, Ordering::SeqCst);
                            Ok(())
                        }
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(api.issued.load(Ordering::SeqCst), 3);
    }
}
