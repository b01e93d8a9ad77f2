//! Exponential-backoff retries around any signal extractor.

use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use tracing::warn;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Conversation, ExtractionRetryConfig, RawSignalSet};
use crate::domain::ports::SignalExtractor;

/// Retry limits for extraction calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ExtractionRetryConfig::default())
    }
}

impl From<&ExtractionRetryConfig> for RetryPolicy {
    fn from(config: &ExtractionRetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

/// Retries retryable failures of the wrapped extractor; once the retries
/// are spent the last failure surfaces as `ExtractionFailed`.
pub struct RetryingExtractor<E: SignalExtractor> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: SignalExtractor> RetryingExtractor<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: SignalExtractor> SignalExtractor for RetryingExtractor<E> {
    async fn extract(&self, conversation: &Conversation) -> DomainResult<RawSignalSet> {
        let schedule = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.policy.initial_backoff)
            .with_max_interval(self.policy.max_backoff)
            .with_max_elapsed_time(None)
            .build();

        let max_retries = self.policy.max_retries;
        let mut attempt = 0u32;
        let inner = &self.inner;

        let result = backoff::future::retry_notify(
            schedule,
            || {
                attempt += 1;
                let current = attempt;
                async move {
                    inner.extract(conversation).await.map_err(|err| {
                        if err.is_retryable() && current <= max_retries {
                            backoff::Error::transient(err)
                        } else {
                            backoff::Error::permanent(err)
                        }
                    })
                }
            },
            |err: DomainError, wait: Duration| {
                warn!(
                    conversation_id = %conversation.conversation_id,
                    error = %err,
                    retry_in = ?wait,
                    "extraction failed, retrying"
                );
            },
        )
        .await;

        result.map_err(|err| match err {
            DomainError::ExtractionFailed { .. } => err,
            other => DomainError::ExtractionFailed {
                conversation_id: conversation.conversation_id,
                reason: other.to_string(),
            },
        })
    }
}
