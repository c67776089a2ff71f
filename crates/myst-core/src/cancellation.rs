/*
 * cancellation.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Build-wide cancellation signal.
 */

//! Cancellation for a build.
//!
//! Workers poll [`Cancellation::is_cancelled`] at pass boundaries and at
//! per-node checkpoints in long passes. A stop requested this way is
//! reported as cancelled, never as a failure.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// A cancellation token shared by every worker of a build.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    inner: CancellationToken,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.inner.cancel()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }

    /// Cancel after `delay`, from a background task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn cancel_after(&self, delay: Duration) {
        let token = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            token.cancel();
        });
    }
}

impl From<CancellationToken> for Cancellation {
    fn from(token: CancellationToken) -> Self {
        Self { inner: token }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_not_cancelled() {
        let token = Cancellation::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_clone_shares_state() {
        let token = Cancellation::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_from_tokio_token() {
        let tokio_token = CancellationToken::new();
        let token = Cancellation::from(tokio_token.clone());
        tokio_token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let token = Cancellation::new();
        token.cancel_after(Duration::from_millis(5));
        token.cancelled().await;
        assert!(token.is_cancelled());
    }
}
