//! Supabase Auth admin client
//!
//! Operators add users from the dashboard; each one gets an auth identity
//! before its subscription row is written.

use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use serde_json::json;

const GENERATED_PASSWORD_LEN: usize = 24;

/// Client for the Supabase Auth (GoTrue) admin endpoints
#[derive(Clone)]
pub struct SupabaseAdminClient {
    http: reqwest::Client,
    base_url: String,
    service_role_key: String,
}

#[derive(Debug, Deserialize)]
struct CreatedUser {
    id: String,
}

/// GoTrue has used several error shapes over time
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg.or(self.message).or(self.error_description)
    }
}

impl SupabaseAdminClient {
    pub fn new(base_url: &str, service_role_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_role_key: service_role_key.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.service_role_key.is_empty()
    }

    /// Create a confirmed identity with a throwaway password; returns the auth user id
    pub async fn create_user(&self, email: &str, display_name: &str) -> Result<String, SupabaseError> {
        if !self.is_configured() {
            return Err(SupabaseError::NotConfigured);
        }

        let response = self
            .http
            .post(format!("{}/auth/v1/admin/users", self.base_url))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .json(&json!({
                "email": email,
                "password": generate_password(),
                "email_confirm": true,
                "user_metadata": { "display_name": display_name },
            }))
            .send()
            .await
            .map_err(|e| SupabaseError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| status.to_string());
            tracing::warn!(status = status.as_u16(), error = %message, "Supabase rejected user creation");
            return Err(SupabaseError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedUser = response
            .json()
            .await
            .map_err(|e| SupabaseError::InvalidResponse(e.to_string()))?;

        tracing::info!(user_id = %created.id, "Created Supabase auth user");
        Ok(created.id)
    }
}

/// Random alphanumeric password; the user resets it through the normal flow
fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("Supabase admin API is not configured")]
    NotConfigured,
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Supabase returned {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}
