//! Execution context shared by a session and its handles.

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::engine::{EngineError, EngineResult};

/// Cancellation scope every engine call runs under.
///
/// Created once per session; handles carry a clone so cancelling the
/// session aborts their calls as well.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    token: CancellationToken,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. one derived from an application shutdown token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `call`, failing with [`EngineError::Cancelled`] if the context is
    /// cancelled first. A context cancelled beforehand never polls `call`.
    pub async fn run<T, F>(&self, operation: &str, call: F) -> EngineResult<T>
    where
        F: Future<Output = EngineResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(EngineError::Cancelled(operation.to_string())),
            result = call => result,
        }
    }
}
