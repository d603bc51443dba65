//! Browser session and factory traits

use crate::element::ObservedElement;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Token usage accumulated inside the browser adapter (e.g. a vision model
/// backing the observe calls). Optional; adapters without one report zeros.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BrowserTokenStats {
    /// Input tokens consumed by the adapter
    pub input_tokens: u64,
    /// Output tokens consumed by the adapter
    pub output_tokens: u64,
}

/// One live browser session
///
/// A session belongs exclusively to one build attempt. The build wrapper
/// tears it down and creates a fresh one on every retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to a URL and wait for the page to settle
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Scroll to the bottom of the page, waiting `wait_ms` for lazy content
    async fn scroll_to_bottom(&self, wait_ms: u64) -> Result<()>;

    /// Enumerate candidate interactive elements on the current page
    async fn observe(&self, instruction: &str, timeout_ms: u64) -> Result<Vec<ObservedElement>>;

    /// Perform an action described in natural language or a selector
    async fn act(&self, instruction: &str) -> Result<serde_json::Value>;

    /// Go back to the previous page
    async fn go_back(&self) -> Result<()>;

    /// Current page URL
    async fn current_url(&self) -> Result<String>;

    /// Token usage accumulated by the adapter, if it tracks any
    async fn token_stats(&self) -> Option<BrowserTokenStats> {
        None
    }

    /// Close the session and release its resources
    async fn close(&self) -> Result<()>;
}

/// Factory for browser sessions
///
/// The build wrapper holds a factory rather than a session so it can discard
/// only the browser on a transient failure and keep the rest of its
/// collaborators (store, logger) alive across attempts.
#[async_trait::async_trait]
pub trait BrowserFactory: Send + Sync {
    /// Open a fresh browser session
    async fn open(&self) -> Result<std::sync::Arc<dyn BrowserSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_session() {
        let mut mock = MockBrowserSession::new();
        mock.expect_navigate().returning(|_| Ok(()));
        mock.expect_token_stats().returning(|| None);

        mock.navigate("https://example.com").await.unwrap();
        assert!(mock.token_stats().await.is_none());
    }
}
