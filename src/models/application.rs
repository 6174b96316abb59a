use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A submitted application, as listed by `/applications` and the
/// auto-apply history endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}
