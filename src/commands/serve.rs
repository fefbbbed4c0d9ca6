//! HTTP server command handler

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::error::{ChatvaultError, Result};
use crate::manager::ConversationManager;
use crate::providers::create_provider;
use crate::store::FileStore;
use std::sync::Arc;

/// Build application state from configuration
pub fn build_state(config: &Config) -> Result<AppState> {
    let store = match &config.storage.data_dir {
        Some(dir) => FileStore::new_with_dir(dir)?,
        None => FileStore::new()?,
    };

    let manager = ConversationManager::new(
        store,
        config.provider.default_system_message.clone(),
        config.conversation.context_turns,
        config.conversation.max_stored_turns,
    );
    let provider = create_provider(&config.provider)?;

    Ok(AppState {
        manager: Arc::new(manager),
        provider,
    })
}

/// Run the HTTP server until shutdown
pub async fn run_server(config: Config, port_override: Option<u16>) -> Result<()> {
    let state = build_state(&config)?;
    let app = create_router(state);

    let port = port_override.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ChatvaultError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| ChatvaultError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
