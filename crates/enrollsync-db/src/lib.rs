//! Postgres storage for enrollsync.
//!
//! Provides the device registry and tag policy store backed by `SQLx`,
//! together with the connection pool and embedded migrations.
//!
//! # Example
//!
//! ```rust,ignore
//! use enrollsync_db::{run_migrations, DbPool, PgDeviceRegistry, PgTagPolicyStore};
//!
//! let pool = DbPool::connect("postgres://localhost/enrollsync").await?;
//! run_migrations(&pool).await?;
//!
//! let registry = PgDeviceRegistry::new(pool.clone());
//! let tags = PgTagPolicyStore::new(pool);
//! ```

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod registry;
pub mod tags;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::{DbPool, DEFAULT_MAX_CONNECTIONS};
pub use registry::PgDeviceRegistry;
pub use tags::PgTagPolicyStore;
