//! SQLite database management for local Conductor state.
//!
//! This crate owns the on-disk schema for workspaces, integrations and the
//! small config table. It works purely on rows: credential blobs pass
//! through untouched, so everything here runs without the master key.

pub mod connection;
pub mod migrations;
pub mod models;
pub mod schema;

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for database operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {message}")]
    Migration { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database is closed")]
    Closed,

    #[error("Generic database error: {0}")]
    Generic(String),
}

/// Which table constraint a failed write tripped over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    PrimaryKey,
    ForeignKey,
    Other,
}

impl Error {
    /// Create a new migration error.
    pub fn migration<S: Into<String>>(message: S) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }

    /// Create a new generic database error.
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Classify a constraint violation, if this error is one.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        let Error::Database(rusqlite::Error::SqliteFailure(failure, _)) = self else {
            return None;
        };
        if failure.code != rusqlite::ErrorCode::ConstraintViolation {
            return None;
        }
        Some(match failure.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => ConstraintKind::Unique,
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => ConstraintKind::PrimaryKey,
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
            _ => ConstraintKind::Other,
        })
    }
}

/// Database connection and management.
pub use connection::Database;

/// Database models and operations.
pub use models::{
    ConfigStore, IntegrationRecord, IntegrationRecordStore, NewIntegrationRecord,
    WorkspaceRecord, WorkspaceRecordStore,
};

/// Schema definitions and constants.
pub use schema::*;
