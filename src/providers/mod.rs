//! Provider module for chatvault
//!
//! Contains the reply-generation abstraction and the OpenAI-compatible
//! implementation.

pub mod base;
pub mod openai;

pub use base::ChatProvider;
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a provider instance from configuration
///
/// # Errors
///
/// Returns error if provider initialization fails
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn ChatProvider>> {
    Ok(Arc::new(OpenAiProvider::new(config.clone())?))
}
