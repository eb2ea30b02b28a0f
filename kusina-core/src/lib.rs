//! # kusina-core
//!
//! Core library for kusina - a restaurant admin dashboard.
//!
//! This library provides:
//! - Typed records read from the hosted document store
//! - Store and object storage clients (REST and in-memory)
//! - Reports: per-day series, leaderboards, items ordered together
//! - Admin workflows: applications, moderation, menu
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Data flow
//!
//! Reports flow one way:
//! - **Fetch:** [`Fetcher`] queries a [`RecordStore`] with the caller's [`Session`]
//!   and validates every document into a typed record
//! - **Aggregate:** pure bucketing, ranking and pair counting
//! - **Present:** chart rows and leaderboards, rendered by the CLI
//!
//! ## Example
//!
//! ```rust,no_run
//! use kusina_core::analytics::{generate_sales_report, ReportOptions, ReportPeriod};
//! use kusina_core::{Config, Fetcher, FirestoreStore, Session};
//!
//! # async fn run() -> kusina_core::Result<()> {
//! let config = Config::load()?;
//! let store = FirestoreStore::new(&config.store)?;
//! let session = Session::load(&Config::session_path())?.ok_or(kusina_core::Error::NotAuthenticated)?;
//!
//! let fetcher = Fetcher::new(&store, &session).with_batch_size(config.store.in_batch_size);
//! let options = ReportOptions::from_config(&config.reports)?;
//! let report = generate_sales_report(&fetcher, "r1", ReportPeriod::Month(2024, 5), &options).await?;
//! println!("{} orders", report.totals.orders);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use auth::{AuthClient, Session};
pub use config::Config;
pub use error::{Error, Result};
pub use fetch::Fetcher;
pub use storage::{MemoryStorage, ObjectStorage, SupabaseStorage};
pub use store::{FirestoreStore, MemoryStore, RecordStore};
pub use types::*;

// Public modules
pub mod admin;
pub mod analytics;
pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod logging;
pub mod storage;
pub mod store;
pub mod types;
