use serde::{Deserialize, Serialize};

use crate::api::client::{ApiClient, ApiError};

#[derive(Debug, Serialize)]
struct SecureLoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyEmailRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SecureLoginResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Set when Greenhouse wants the user to click a verification email
    /// before the session becomes usable.
    #[serde(default)]
    pub verification_pending: bool,
}

#[derive(Debug, Deserialize)]
pub struct SessionStatusResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveSessionsResponse {
    pub success: bool,
    #[serde(default)]
    pub sessions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GreenhouseAck {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiClient {
    pub async fn greenhouse_secure_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SecureLoginResponse, ApiError> {
        self.post("/greenhouse/secure-login", &SecureLoginRequest { email, password })
            .await
    }

    pub async fn greenhouse_secure_scrape(
        &self,
        session_id: &str,
    ) -> Result<GreenhouseAck, ApiError> {
        self.post(
            "/greenhouse/secure-scrape",
            &serde_json::json!({ "session_id": session_id }),
        )
        .await
    }

    pub async fn greenhouse_session_status(
        &self,
        session_id: &str,
    ) -> Result<SessionStatusResponse, ApiError> {
        self.get(&format!("/greenhouse/session-status/{}", session_id)).await
    }

    pub async fn greenhouse_clear_session(
        &self,
        session_id: &str,
    ) -> Result<GreenhouseAck, ApiError> {
        self.delete(&format!("/greenhouse/clear-session/{}", session_id)).await
    }

    pub async fn greenhouse_active_sessions(&self) -> Result<ActiveSessionsResponse, ApiError> {
        self.get("/greenhouse/active-sessions").await
    }

    pub async fn greenhouse_verify_email(&self, email: &str) -> Result<GreenhouseAck, ApiError> {
        self.post("/greenhouse/verify-email", &VerifyEmailRequest { email })
            .await
    }

    pub async fn greenhouse_status(&self) -> Result<GreenhouseAck, ApiError> {
        self.get("/greenhouse/status").await
    }

    pub async fn greenhouse_start_scraping(&self) -> Result<GreenhouseAck, ApiError> {
        self.post("/greenhouse/start-scraping", &serde_json::json!({})).await
    }
}
