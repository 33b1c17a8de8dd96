//! Conductor daemon REST API contract types
//!
//! This crate defines the request and response bodies of the controller
//! daemon's control-plane API. They are shared between the REST client and
//! the mock daemons used in tests.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
