//! chatvault - Conversational session store
//!
//! This library persists chat conversations as one JSON document per
//! session and serves them over an HTTP API backed by an
//! OpenAI-compatible reply provider.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `store`: Durable record store, one JSON file per session
//! - `manager`: Session identity, append ordering, prompt windows, titles
//! - `providers`: Reply-generation abstraction and the OpenAI implementation
//! - `api`: HTTP interface over the manager
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: CLI command handlers
//!
//! # Example
//!
//! ```no_run
//! use chatvault::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = chatvault::cli::Cli::parse_args();
//!     let config = Config::load("chatvault.yaml", &cli)?;
//!     config.validate()?;
//!
//!     chatvault::commands::serve::run_server(config, None).await
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod manager;
pub mod providers;
pub mod store;

pub use config::Config;
pub use error::{ChatvaultError, Result};
pub use manager::{ChatRequest, ChatResponse, ConversationManager};
pub use providers::{ChatProvider, OpenAiProvider};
pub use store::{ConversationHistory, ConversationPreview, ConversationRecord, FileStore, Role, Turn};
