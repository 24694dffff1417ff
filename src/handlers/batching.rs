use crate::llm::LlmError;
use std::fmt::Display;
use std::time::Duration;
use tracing::warn;

/// Message fragments treated as transient provider failures.
///
/// Substring matching on error text is a weak classification; keep the list
/// stable rather than growing it.
const RETRYABLE_MARKERS: &[&str] = &["429", "rate limit", "timed out", "timeout"];

pub fn is_retryable_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    RETRYABLE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Failures that can say whether another attempt may succeed.
pub trait RetryableError: Display {
    fn is_retryable(&self) -> bool;
}

impl RetryableError for LlmError {
    /// Only the provider's status and body or the transport reason are
    /// classified; the endpoint URL never is.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, body, .. } => {
                is_retryable_message(&format!("{status} {body}"))
            }
            Self::Transport { reason, .. } => is_retryable_message(reason),
            _ => false,
        }
    }
}

impl RetryableError for String {
    fn is_retryable(&self) -> bool {
        is_retryable_message(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub batch_size: usize,
    /// Attempts per batch, including the first.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// Linear backoff: `retry_delay * attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }
}

/// Items that carry a display rank.
pub trait Ranked {
    fn rank(&self) -> u32;
}

/// Runs `call` over contiguous batches of `items`, retrying transient failures
/// with linear backoff, then returns every output ordered by rank.
///
/// A non-retryable failure, or the last allowed attempt failing, aborts the
/// whole run with that error.
pub fn run_batched_with_retry<I, O, E, F, S>(
    items: &[I],
    policy: &RetryPolicy,
    mut call: F,
    mut sleep: S,
) -> Result<Vec<O>, E>
where
    O: Ranked,
    E: RetryableError,
    F: FnMut(&[I]) -> Result<Vec<O>, E>,
    S: FnMut(Duration),
{
    let batch_size = policy.batch_size.max(1);
    let max_attempts = policy.max_retries.max(1);
    let mut outputs = Vec::with_capacity(items.len());

    for (batch_index, batch) in items.chunks(batch_size).enumerate() {
        let mut attempt = 1_u32;
        loop {
            match call(batch) {
                Ok(mut translated) => {
                    outputs.append(&mut translated);
                    break;
                }
                Err(err) => {
                    if attempt >= max_attempts || !err.is_retryable() {
                        return Err(err);
                    }
                    let delay = policy.backoff(attempt);
                    warn!(
                        batch = batch_index,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "batch failed with a retryable error"
                    );
                    sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    outputs.sort_by_key(|item| item.rank());
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item(u32);

    impl Ranked for Item {
        fn rank(&self) -> u32 {
            self.0
        }
    }

    fn policy(batch_size: usize, max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            batch_size,
            max_retries,
            retry_delay: Duration::from_secs(2),
        }
    }

    #[test]
    fn retryable_markers_match_case_insensitively() {
        assert!(is_retryable_message("HTTP 429 Too Many Requests"));
        assert!(is_retryable_message("Rate Limit exceeded"));
        assert!(is_retryable_message("request Timed Out"));
        assert!(is_retryable_message("read timeout"));
        assert!(!is_retryable_message("invalid api key"));
    }

    #[test]
    fn llm_errors_ignore_the_endpoint_when_classified() {
        let unauthorized = LlmError::Status {
            endpoint: "https://timeout-429.example/v1".to_string(),
            status: 401,
            body: "invalid api key".to_string(),
        };
        assert!(!unauthorized.is_retryable());

        let throttled = LlmError::Status {
            endpoint: "https://api.example/v1".to_string(),
            status: 429,
            body: "slow down".to_string(),
        };
        assert!(throttled.is_retryable());

        let refused = LlmError::Transport {
            endpoint: "https://timeout.example/v1".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(!refused.is_retryable());

        let timed_out = LlmError::Transport {
            endpoint: "https://api.example/v1".to_string(),
            reason: "operation timed out".to_string(),
        };
        assert!(timed_out.is_retryable());
        assert!(!LlmError::Response("timeout in body text".to_string()).is_retryable());
    }

    #[test]
    fn batches_are_contiguous_and_output_sorted_by_rank() {
        let items = [5_u32, 1, 4, 2, 3];
        let mut seen = Vec::new();

        let out = run_batched_with_retry(
            &items,
            &policy(2, 1),
            |batch: &[u32]| -> Result<Vec<Item>, String> {
                seen.push(batch.to_vec());
                Ok(batch.iter().map(|rank| Item(*rank)).collect())
            },
            |_| {},
        )
        .expect("batches");

        assert_eq!(seen, vec![vec![5, 1], vec![4, 2], vec![3]]);
        assert_eq!(out, vec![Item(1), Item(2), Item(3), Item(4), Item(5)]);
    }

    #[test]
    fn retryable_failure_backs_off_linearly_until_exhausted() {
        let mut calls = 0;
        let mut sleeps = Vec::new();

        let err = run_batched_with_retry(
            &[1_u32],
            &policy(3, 3),
            |_: &[u32]| -> Result<Vec<Item>, String> {
                calls += 1;
                Err("rate limit".to_string())
            },
            |delay| sleeps.push(delay),
        )
        .expect_err("exhausted");

        assert_eq!(err, "rate limit");
        assert_eq!(calls, 3);
        assert_eq!(sleeps, vec![Duration::from_secs(2), Duration::from_secs(4)]);
    }
}
