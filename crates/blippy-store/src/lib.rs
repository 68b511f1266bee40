//! # blippy-store
//!
//! `SQLite` persistence for Blippy: connection pooling with WAL and
//! foreign-key enforcement, embedded schema migrations, and stateless
//! repositories over the persisted tables.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod rows;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection};
pub use errors::{Result, StoreError};

/// Handle to the database: pool plus migration bootstrap.
#[derive(Clone)]
pub struct Store {
    pool: ConnectionPool,
}

impl Store {
    /// Open (or create) a file-backed database and run pending migrations.
    pub fn open(path: &str) -> Result<Self> {
        let pool = connection::new_file(path, &ConnectionConfig::default())?;
        {
            let conn = pool.get()?;
            let _ = migrations::run_migrations(&conn)?;
        }
        Ok(Self { pool })
    }

    /// Open an in-memory database with migrations applied (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let pool = connection::new_in_memory()?;
        {
            let conn = pool.get()?;
            let _ = migrations::run_migrations(&conn)?;
        }
        Ok(Self { pool })
    }

    /// Check out a pooled connection.
    pub fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }
}
