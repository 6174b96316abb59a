use serde::{Deserialize, Serialize};

use crate::api::client::{ApiClient, ApiError};
use crate::apply::progress::ApplyProgress;
use crate::models::application::ApplicationRecord;

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    user_id: &'a str,
    job_id: &'a str,
}

#[derive(Debug, Serialize)]
struct SecurityCodeRequest<'a> {
    user_id: &'a str,
    job_id: &'a str,
    code: &'a str,
}

/// Response to starting a run or submitting a security code. The legacy
/// pipeline calls the key `session_id`, the enhanced one `application_key`;
/// both land in `key`.
#[derive(Debug, Deserialize)]
pub struct StartResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "application_key", alias = "session_id")]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub progress: Option<ApplyProgress>,
}

#[derive(Debug, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub applications: Vec<ApplicationRecord>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupResponse {
    pub success: bool,
    #[serde(default)]
    pub removed: u64,
}

// Original auto-apply pipeline.
impl ApiClient {
    pub async fn auto_apply_start(
        &self,
        user_id: &str,
        job_id: &str,
    ) -> Result<StartResponse, ApiError> {
        self.post("/auto-apply/start", &StartRequest { user_id, job_id }).await
    }

    pub async fn auto_apply_progress(&self, key: &str) -> Result<StatusResponse, ApiError> {
        self.get(&format!("/auto-apply/progress/{}", key)).await
    }

    pub async fn auto_apply_cancel(&self, key: &str) -> Result<AckResponse, ApiError> {
        self.post(&format!("/auto-apply/cancel/{}", key), &serde_json::json!({}))
            .await
    }

    pub async fn auto_apply_history(&self, user_id: &str) -> Result<HistoryResponse, ApiError> {
        self.get(&format!("/auto-apply/history/{}", user_id)).await
    }

    pub async fn auto_apply_cleanup(&self) -> Result<CleanupResponse, ApiError> {
        self.post("/auto-apply/cleanup", &serde_json::json!({})).await
    }
}

// Enhanced pipeline: the same job driven by the richer backend that can
// pause for a one-time security code.
impl ApiClient {
    pub async fn enhanced_start(
        &self,
        user_id: &str,
        job_id: &str,
    ) -> Result<StartResponse, ApiError> {
        self.post("/enhanced-auto-apply/start", &StartRequest { user_id, job_id })
            .await
    }

    pub async fn enhanced_status(&self, key: &str) -> Result<StatusResponse, ApiError> {
        self.get(&format!("/enhanced-auto-apply/status/{}", key)).await
    }

    pub async fn enhanced_applications(
        &self,
        user_id: &str,
    ) -> Result<HistoryResponse, ApiError> {
        self.get(&format!("/enhanced-auto-apply/applications/{}", user_id))
            .await
    }

    pub async fn enhanced_application(
        &self,
        user_id: &str,
        job_id: &str,
    ) -> Result<StatusResponse, ApiError> {
        self.get(&format!("/enhanced-auto-apply/application/{}/{}", user_id, job_id))
            .await
    }

    pub async fn enhanced_cancel(
        &self,
        user_id: &str,
        job_id: &str,
    ) -> Result<AckResponse, ApiError> {
        self.post(
            &format!("/enhanced-auto-apply/cancel/{}/{}", user_id, job_id),
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn submit_security_code(
        &self,
        user_id: &str,
        job_id: &str,
        code: &str,
    ) -> Result<StartResponse, ApiError> {
        self.post(
            "/enhanced-auto-apply/submit-security-code",
            &SecurityCodeRequest { user_id, job_id, code },
        )
        .await
    }

    /// Service self-test, called before starting a run.
    pub async fn enhanced_test(&self) -> Result<AckResponse, ApiError> {
        self.get("/enhanced-auto-apply/test").await
    }

    pub async fn enhanced_cleanup(&self) -> Result<CleanupResponse, ApiError> {
        self.post("/enhanced-auto-apply/cleanup", &serde_json::json!({})).await
    }
}
