//! Bounded retry with backoff.
//!
//! # Responsibility
//! - Describe one retry policy (attempt ceiling, base delay, multiplier)
//!   shared by batch deletion and text generation.
//! - Keep the actual waiting behind `Sleeper` so callers can observe it.
//!
//! # Invariants
//! - `max_attempts` counts the first attempt; a policy always allows one.
//! - Sleeps happen only between attempts, never after the last one.

use std::time::Duration;

/// Blocking wait used between retry attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Attempt ceiling plus exponential (or fixed, with multiplier 1) backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
        }
    }

    /// Batch delete: 5 attempts, 50 ms doubling.
    pub const fn batch_delete() -> Self {
        Self::new(5, Duration::from_millis(50), 2)
    }

    /// Text generation: 3 attempts, fixed 2 s pause.
    pub const fn text_generation() -> Self {
        Self::new(3, Duration::from_secs(2), 1)
    }

    /// Effective attempt ceiling (at least one).
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.attempts()
    }

    /// Delay before the `retry`-th retry (1-based): `base * multiplier^(retry-1)`.
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `op` until it succeeds or attempts are exhausted.
    ///
    /// `op` receives the 1-based attempt number. Returns the last error when
    /// every attempt fails.
    pub fn run<T, E, S, F>(&self, sleeper: &S, op: F) -> Result<T, E>
    where
        S: Sleeper + ?Sized,
        F: FnMut(u32) -> Result<T, E>,
    {
        self.run_when(sleeper, op, |_| true)
    }

    /// Like [`RetryPolicy::run`], but stops at the first error for which
    /// `retryable` returns false.
    pub fn run_when<T, E, S, F, P>(&self, sleeper: &S, mut op: F, retryable: P) -> Result<T, E>
    where
        S: Sleeper + ?Sized,
        F: FnMut(u32) -> Result<T, E>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !self.allows_retry_after(attempt) || !retryable(&err) => {
                    return Err(err)
                }
                Err(_) => {
                    sleeper.sleep(self.delay_before_retry(attempt));
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::batch_delete()
    }
}
