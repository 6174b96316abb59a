use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One job listing as stored by the backend. Read-only on this side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub posted_date: Option<String>,
    #[serde(default)]
    pub scraped_at: Option<DateTime<Utc>>,
    /// External application URL on the company's board.
    #[serde(default)]
    pub url: Option<String>,
}

/// One page of listings from `/jobs/from-database` or `/jobs/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobPage {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub jobs: Vec<JobListing>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobStatistics {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub total_jobs: u64,
    #[serde(default)]
    pub companies: HashMap<String, u64>,
    #[serde(default)]
    pub locations: HashMap<String, u64>,
    #[serde(default)]
    pub last_scraped: Option<DateTime<Utc>>,
}
