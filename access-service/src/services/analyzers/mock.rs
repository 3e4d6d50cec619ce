//! Mock analyzer for local runs and tests.

use super::{AlertContext, AnalyzerError, AnomalyAnalyzer};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

enum Behavior {
    Reply,
    Fail,
    Stall(Duration),
}

pub struct MockAnalyzer {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockAnalyzer {
    /// Replies with a short summary of the denial reasons.
    pub fn new() -> Self {
        Self::with(Behavior::Reply)
    }

    /// Fails every call.
    pub fn failing() -> Self {
        Self::with(Behavior::Fail)
    }

    /// Sleeps before replying, to exercise the caller's timeout.
    pub fn stalled(delay: Duration) -> Self {
        Self::with(Behavior::Stall(delay))
    }

    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnomalyAnalyzer for MockAnalyzer {
    async fn analyze(&self, context: &AlertContext) -> Result<String, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            Behavior::Reply => {}
            Behavior::Fail => {
                return Err(AnalyzerError::ApiError("mock analyzer failure".to_string()));
            }
            Behavior::Stall(delay) => tokio::time::sleep(delay).await,
        }

        Ok(format!(
            "Mock alert: blocked access to document {} ({})",
            context.document_id,
            context.denial_reasons.join(", ")
        ))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
