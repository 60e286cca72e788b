use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Bounded exponential backoff.
///
/// After the zero-based attempt `i` fails the policy sleeps
/// `base_delay * 2^i` before trying again, so delays run `base`, `2*base`,
/// `4*base`, ... Every error is retried the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetryError<E> {
    #[error("{0}")]
    Exhausted(E),
    /// The pending backoff was cancelled; holds the error of the last attempt.
    #[error("retry cancelled: {0}")]
    Cancelled(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted(err) | RetryError::Cancelled(err) => err,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled(_))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay slept after the zero-based attempt `attempt` fails.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_inner(op, None).await.map_err(RetryError::into_inner)
    }

    /// Like [`RetryPolicy::run`] but the backoff sleep between attempts stops
    /// as soon as `token` is cancelled. An attempt already in flight is
    /// allowed to finish.
    pub async fn run_cancellable<T, E, F, Fut>(
        &self,
        op: F,
        token: &CancelToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_inner(op, Some(token)).await
    }

    async fn run_inner<T, E, F, Fut>(
        &self,
        mut op: F,
        cancel: Option<&CancelToken>,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if attempt + 1 >= self.max_attempts {
                return Err(RetryError::Exhausted(err));
            }
            let delay = self.delay_for(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "attempt failed: {err}"
            );
            match cancel {
                Some(token) => {
                    if token.is_cancelled() {
                        return Err(RetryError::Cancelled(err));
                    }
                    let mut token = token.clone();
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = token.cancelled() => {
                            tracing::debug!("retry cancelled during backoff");
                            return Err(RetryError::Cancelled(err));
                        }
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
            attempt += 1;
        }
    }
}

/// Runs `op` under a [`RetryPolicy`] built from the given limits.
pub async fn with_retry<T, E, F, Fut>(
    op: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    RetryPolicy::new(max_attempts, base_delay).run(op).await
}

/// Owner side of a cancellation signal. Dropping it cancels every token.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn new() -> Self {
        cancel_pair().0
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the handle cancels or is dropped.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
