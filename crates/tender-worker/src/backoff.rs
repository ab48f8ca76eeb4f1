//! Retry back-off schedule: `min(MaxDelay, Base * 2^attempt) + jitter`, with
//! an extended floor for rate-limit errors.

use rand::Rng;
use tender_config::RetryConfig;
use tender_store::ErrorKind;

/// Compute the delay, in milliseconds, before retrying attempt `attempt`
/// (0-indexed: the attempt number that just failed).
pub fn backoff_ms(config: &RetryConfig, attempt: u32, error_kind: ErrorKind) -> u64 {
    let base = config.retry_base_delay_ms;
    let capped = base.saturating_mul(1u64 << attempt.min(32)).min(config.retry_max_delay_ms);
    let jitter_ceiling = (capped as f64 * 0.25) as u64;
    let jitter = if jitter_ceiling == 0 { 0 } else { rand::thread_rng().gen_range(0..=jitter_ceiling) };
    let delay = capped.saturating_add(jitter);

    if error_kind == ErrorKind::RateLimit {
        delay.max(config.rate_limit_floor_ms)
    } else {
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RetryConfig {
        RetryConfig {
            max_retry_attempts: 3,
            retry_base_delay_ms: 2_000,
            retry_max_delay_ms: 60_000,
            rate_limit_floor_ms: 30_000,
        }
    }

    #[test]
    fn delay_grows_with_attempt_and_is_capped() {
        let cfg = config();
        let first = backoff_ms(&cfg, 0, ErrorKind::Retryable);
        let second = backoff_ms(&cfg, 1, ErrorKind::Retryable);
        assert!(first >= 2_000 && first <= 2_500);
        assert!(second >= 4_000 && second <= 5_000);

        let huge = backoff_ms(&cfg, 10, ErrorKind::Retryable);
        assert!(huge <= 60_000 + 15_000);
    }

    #[test]
    fn rate_limit_enforces_floor() {
        let cfg = config();
        let delay = backoff_ms(&cfg, 0, ErrorKind::RateLimit);
        assert!(delay >= 30_000);
    }
}
