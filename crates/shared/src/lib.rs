//! SubDash Shared Types and Utilities
//!
//! This crate contains store row types, errors, and database helpers shared
//! by the SubDash API, billing, and worker crates.

pub mod db;
pub mod error;
pub mod telemetry;
pub mod types;

pub use db::*;
pub use error::*;
pub use telemetry::init_tracing;
pub use types::*;
