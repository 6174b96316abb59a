use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use easy_config_store::ConfigStore;
use eyre::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub type Config = Arc<ConfigInner>;

pub fn config(path: PathBuf) -> Result<Config> {
    let config_store = ConfigStore::<ConfigInner>::read(path, "config".to_string())?;
    let inner = (*config_store).clone();

    info!("config parsing successful");
    debug!("loaded configuration:\n{}", toml::to_string_pretty(&inner)?);

    Ok(Arc::new(inner))
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigInner {
    pub backend: BackendConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub auto_apply: AutoApplyConfig,
    /// Where session state (storage + cookie mirrors) lives. Defaults to
    /// `~/.swiftapply`.
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct AutoApplyConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// No cutoff when absent: the poller trusts the backend to eventually
    /// reach a terminal state.
    pub poll_timeout_secs: Option<u64>,
}

impl AutoApplyConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for AutoApplyConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/auth/google/callback".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

impl Default for ConfigInner {
    fn default() -> Self {
        let cfg = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.default.toml",));

        toml::from_str(cfg).unwrap() // should be okay
    }
}
