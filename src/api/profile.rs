use serde::{Deserialize, Serialize};

use crate::api::client::{ApiClient, ApiError};
use crate::models::application::ApplicationRecord;
use crate::models::user::Profile;

#[derive(Debug, Serialize)]
struct ProfileUpdateRequest<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    profile: &'a Profile,
}

#[derive(Debug, Deserialize)]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationsResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub applications: Vec<ApplicationRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub application: Option<ApplicationRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ResumesResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub resumes: Vec<ResumeInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeInfo {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

impl ApiClient {
    pub async fn get_profile(&self, user_id: &str) -> Result<ProfileResponse, ApiError> {
        self.get(&format!("/profile/get?user_id={}", user_id)).await
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        profile: &Profile,
    ) -> Result<ProfileResponse, ApiError> {
        self.put("/profile/update", &ProfileUpdateRequest { user_id, profile })
            .await
    }

    pub async fn applications(&self) -> Result<ApplicationsResponse, ApiError> {
        self.get("/applications").await
    }

    pub async fn application(&self, id: &str) -> Result<ApplicationResponse, ApiError> {
        self.get(&format!("/applications/{}", id)).await
    }

    pub async fn set_application_status(
        &self,
        id: &str,
        status: &str,
    ) -> Result<ApplicationResponse, ApiError> {
        self.patch(
            &format!("/applications/{}", id),
            &serde_json::json!({ "status": status }),
        )
        .await
    }

    pub async fn withdraw_application(&self, id: &str) -> Result<ApplicationResponse, ApiError> {
        self.delete(&format!("/applications/{}", id)).await
    }

    pub async fn user_resumes(&self, user_id: &str) -> Result<ResumesResponse, ApiError> {
        self.get(&format!("/resumes/user?user_id={}", user_id)).await
    }
}
