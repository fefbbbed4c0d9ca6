//! Base provider trait for chatvault
//!
//! Defines the [`ChatProvider`] trait the conversation manager generates
//! replies through. Providers receive a caller-assembled prompt window and
//! return plain text; history persistence and windowing stay on the
//! manager's side of this seam.

use crate::error::Result;
use crate::store::Turn;
use async_trait::async_trait;

/// Reply generator over an assembled prompt window
///
/// Implementations must not mutate, reorder, or persist the window; the
/// first entry is always the system message, the rest are the most recent
/// stored turns in original order.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Generate an assistant reply for a prompt window
    ///
    /// # Arguments
    ///
    /// * `window` - system message followed by recent turns, oldest first
    ///
    /// # Errors
    ///
    /// Returns a provider error when the upstream call fails or returns an
    /// unusable response
    async fn generate_reply(&self, window: &[Turn]) -> Result<String>;

    /// Name of the model replies are generated with
    fn model(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatvaultError;
    use std::sync::Mutex;

    struct EchoProvider;

    #[async_trait]
    impl ChatProvider for EchoProvider {
        async fn generate_reply(&self, window: &[Turn]) -> Result<String> {
            let last = window
                .last()
                .ok_or_else(|| ChatvaultError::Provider("empty prompt window".to_string()))?;
            Ok(format!("echo: {}", last.content))
        }

        fn model(&self) -> String {
            "echo".to_string()
        }
    }

    #[tokio::test]
    async fn test_provider_trait_is_object_safe() {
        let provider: Box<dyn ChatProvider> = Box::new(EchoProvider);
        let window = vec![Turn::system("sys"), Turn::user("hello")];

        let reply = provider.generate_reply(&window).await.unwrap();
        assert_eq!(reply, "echo: hello");
        assert_eq!(provider.model(), "echo");
    }

    #[test]
    fn test_provider_trait_objects_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Box<dyn ChatProvider>>();
        assert_send_sync::<Mutex<Box<dyn ChatProvider>>>();
    }
}
