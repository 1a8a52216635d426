//! User and dialog persistence for the chat bot.
//!
//! This crate stores per-user chat state (profile, usage counters, current
//! dialog pointer) and per-dialog message history in two tables of a remote
//! table service, `users` and `dialogues`.
//!
//! # Example
//!
//! ```no_run
//! use chat_store::{NewUser, UserStore};
//! use serde_json::json;
//!
//! # async fn example() -> chat_store::Result<()> {
//! // Reads SUPABASE_URL / SUPABASE_KEY and the optional store settings
//! let store = UserStore::from_env()?;
//!
//! store.create_user(&NewUser::new(42, 42).with_username("alice")).await?;
//! store.start_dialog(42).await?;
//!
//! let mut messages = store.get_dialog_messages(42, None).await?;
//! messages.push(json!({"user": "Hi!", "bot": "Hello!"}));
//! store.set_dialog_messages(42, &messages, None).await?;
//!
//! store.record_token_usage(42, "gpt-4o-mini", 12, 4).await?;
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use attribute::UserAttribute;
pub use config::{StoreConfig, StoreConfigBuilder};
pub use error::{Result, StoreError};
pub use models::{Dialog, NewUser, TokenUsage, TokenUsageMap, User, DEFAULT_CHAT_MODE};
pub use store::UserStore;

// Re-export table-client types needed to construct a store
pub use table_client::{ClientConfig, MemoryTables, TableService};
