use std::time::Duration;

use log::warn;

use crate::{browser::settle, config::ScrapingConfig};

/// Timeouts only differ from other failures in how long we back off.
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::Display)]
pub enum FailureKind {
    #[strum(serialize = "timeout")]
    Timeout,
    #[strum(serialize = "error")]
    Other,
}
impl FailureKind {
    pub fn classify(error: &anyhow::Error) -> Self {
        let text = format!("{error:#}").to_lowercase();
        if ["timeout", "timed out", "exceeded"]
            .iter()
            .any(|needle| text.contains(needle))
        {
            Self::Timeout
        } else {
            Self::Other
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
    pub timeout_backoff: Duration,
}
impl RetryPolicy {
    pub fn from_config(config: &ScrapingConfig) -> Self {
        Self {
            attempts: config.max_retries.max(1),
            backoff: config.retry_backoff,
            timeout_backoff: config.timeout_backoff,
        }
    }

    fn backoff_for(&self, kind: FailureKind) -> Duration {
        match kind {
            FailureKind::Timeout => self.timeout_backoff,
            FailureKind::Other => self.backoff,
        }
    }
}

/// Runs `f` from scratch until it succeeds or the attempts run out; `f` gets the 1-based
/// attempt number.
pub fn retry<T>(
    policy: &RetryPolicy,
    what: &str,
    mut f: impl FnMut(u32) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let mut attempt = 1;
    loop {
        match f(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.attempts => {
                return Err(e.context(format!("{what} failed after {attempt} attempts")));
            }
            Err(e) => {
                let kind = FailureKind::classify(&e);
                warn!(
                    "{what}: attempt {attempt}/{} failed ({kind}): {e:#}",
                    policy.attempts
                );
                settle(policy.backoff_for(kind));
                attempt += 1;
            }
        }
    }
}
