//! Storage layer for climalink sensor readings.
//!
//! This crate provides SQLite-backed persistence for the readings sampled by
//! the persistence loop, and the two chart queries served from them.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool manager with automatic migrations
//! - [`ReadingRepository`] - Data access trait, the sink the bridge writes to
//! - [`SqliteReadingRepository`] - SQLite implementation
//!
//! # Examples
//!
//! ```no_run
//! use climalink_storage::{Database, DatabaseConfig, ReadingRepository, SqliteReadingRepository};
//! use climalink_storage::models::Reading;
//! use chrono::Utc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::open(DatabaseConfig::new("climalink.db")).await?;
//! let readings = SqliteReadingRepository::new(db.pool().clone());
//!
//! readings.create(&Reading::new(22.5, 48.0, Utc::now())).await?;
//!
//! for reading in readings.find_recent(10).await? {
//!     println!("{} {:.1}C {:.0}%", reading.recorded_at, reading.temperature, reading.humidity);
//! }
//!
//! // Five-minute averages for the last hour
//! let buckets = readings.find_grouped(300, 12).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Timestamps
//!
//! `recorded_at` is stored as RFC 3339 text in UTC. Every value carries the
//! same offset, so text order matches time order and SQLite's date functions
//! can bucket it.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::{Reading, ReadingBucket};
pub use repositories::{ReadingRepository, SqliteReadingRepository};
