//! SubDash API Library
//!
//! This crate contains the operator-facing HTTP API for SubDash.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod supabase;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
