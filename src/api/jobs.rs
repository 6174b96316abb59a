use std::path::Path;

use eyre::{Result, WrapErr};
use log::info;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::api::client::{ApiClient, ApiError};
use crate::models::job::{JobPage, JobStatistics};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub jobs_found: u64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub imported: u64,
}

impl ApiClient {
    pub async fn jobs_from_database(&self, page: u32, per_page: u32) -> Result<JobPage, ApiError> {
        self.get(&format!("/jobs/from-database?page={}&per_page={}", page, per_page))
            .await
    }

    pub async fn search_jobs(
        &self,
        query: Option<&str>,
        location: Option<&str>,
    ) -> Result<JobPage, ApiError> {
        self.post("/jobs/search", &SearchRequest { query, location }).await
    }

    pub async fn job_statistics(&self) -> Result<JobStatistics, ApiError> {
        self.get("/jobs/statistics").await
    }

    pub async fn scrape_greenhouse(&self, force: bool) -> Result<ScrapeResponse, ApiError> {
        let endpoint = if force {
            "/jobs/scrape-greenhouse-force"
        } else {
            "/jobs/scrape-greenhouse"
        };
        self.post(endpoint, &serde_json::json!({})).await
    }

    pub async fn export_jobs_csv(&self) -> Result<Vec<u8>, ApiError> {
        self.get_bytes("/jobs/export-csv").await
    }

    /// Validates the CSV locally before shipping it, so an obviously broken
    /// file never hits the backend.
    pub async fn import_jobs_csv(&self, path: &Path) -> Result<ImportResponse> {
        let raw = tokio::fs::read(path)
            .await
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;

        let mut reader = csv::Reader::from_reader(raw.as_slice());
        let headers = reader.headers().wrap_err("file is not valid CSV")?.clone();
        if !headers.iter().any(|h| h.eq_ignore_ascii_case("title")) {
            eyre::bail!("CSV is missing a 'title' column");
        }
        let rows = reader.records().count();
        info!("importing {} listings from {}", rows, path.display());

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("jobs.csv")
            .to_string();
        let form = Form::new().part(
            "file",
            Part::bytes(raw)
                .file_name(file_name)
                .mime_str("text/csv")
                .wrap_err("failed to build multipart body")?,
        );

        Ok(self.post_multipart("/jobs/import-csv", form).await?)
    }
}
