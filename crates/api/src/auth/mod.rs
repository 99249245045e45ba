//! Authentication module for SubDash

pub mod jwt;
pub mod middleware;

pub use jwt::{JwtError, SupabaseClaims, SupabaseJwtVerifier};
pub use middleware::{require_admin, AdminUser};
