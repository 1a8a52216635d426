//! Client library for PostgREST table services.
//!
//! This crate provides a small, typed client for the table API that
//! Supabase exposes over HTTP. It supports:
//!
//! - Selecting rows with equality filters, optionally requiring a single row
//! - Inserting rows
//! - Partial updates of matching rows
//!
//! The [`TableService`] trait is the seam between callers and the backend:
//! [`RestClient`] talks HTTP, [`MemoryTables`] keeps rows in memory.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use table_client::{ClientConfig, RestClient, Table};
//!
//! # async fn example() -> Result<(), table_client::TableError> {
//! let client = RestClient::new(ClientConfig::from_env()?)?;
//! let users = Table::new(Arc::new(client), "users");
//!
//! let rows = users.select("id").eq("id", 42).execute().await?;
//! println!("user 42 exists: {}", !rows.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod memory;
pub mod rest;
pub mod service;
pub mod table;

pub use config::ClientConfig;
pub use error::TableError;
pub use filter::Filter;
pub use memory::{row_from, MemoryTables, OpStats};
pub use rest::RestClient;
pub use service::{Row, TableService};
pub use table::{to_row, InsertQuery, SelectQuery, SingleQuery, Table, UpdateQuery};

// Re-export async_trait for implementors
pub use async_trait::async_trait;
