use serde::{Deserialize, Serialize};

use crate::api::client::{ApiClient, ApiError};
use crate::models::user::User;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Envelope shared by the login/register/google-user endpoints. `success`
/// is the application-level verdict; HTTP status alone does not decide it.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
struct GoogleTokenRequest<'a> {
    code: &'a str,
    redirect_uri: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GoogleTokenResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct GoogleUserRequest<'a> {
    access_token: &'a str,
}

impl ApiClient {
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.post("/auth/login", &LoginRequest { email, password }).await
    }

    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<AuthResponse, ApiError> {
        self.post("/auth/register", request).await
    }

    /// Exchanges an OAuth authorization code through the backend.
    pub async fn google_token(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<GoogleTokenResponse, ApiError> {
        self.post("/auth/google/token", &GoogleTokenRequest { code, redirect_uri })
            .await
    }

    /// Resolves a Google access token into a SwiftApply user record.
    pub async fn google_user(&self, access_token: &str) -> Result<AuthResponse, ApiError> {
        self.post("/auth/google/user", &GoogleUserRequest { access_token })
            .await
    }
}
