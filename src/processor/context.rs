//! Request context for processor calls
//!
//! Every content-store pull made on behalf of a request goes through the
//! caller's [`ProcessContext`], so a deadline set at the ingestion boundary
//! cancels the slow I/O underneath it. Expiry surfaces as
//! [`ProcessorError::Cancelled`], distinct from parse and availability errors;
//! callers must not trust partially populated artifact fields after it.
//!
//! [`ProcessorError::Cancelled`]: crate::error::ProcessorError::Cancelled

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{ProcessorError, Result};

#[derive(Debug, Clone, Default)]
pub struct ProcessContext {
    deadline: Option<Instant>,
}

impl ProcessContext {
    /// Context without a deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Run a fallible future under this context's deadline.
    ///
    /// An already-expired context fails before polling, so cancellation is
    /// deterministic even when the inner future would complete immediately.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.deadline {
            None => fut.await,
            Some(deadline) => {
                if Instant::now() >= deadline {
                    return Err(ProcessorError::Cancelled);
                }
                match tokio::time::timeout_at(deadline, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(ProcessorError::Cancelled),
                }
            }
        }
    }
}
