//! GoCD connection settings

use serde::{Deserialize, Serialize};

use crate::error::{GocdError, Result};

const DEFAULT_USER_AGENT: &str = concat!("artwise-gocd/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GocdConfig {
    /// Server base URL, e.g. `https://ci.example.com`
    pub url: String,
    /// Pipeline whose history is shown
    pub pipeline: String,
    pub user: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl GocdConfig {
    pub fn new(url: &str, pipeline: &str) -> Self {
        GocdConfig {
            url: url.trim_end_matches('/').to_string(),
            pipeline: pipeline.to_string(),
            user: None,
            password: None,
            user_agent: default_user_agent(),
        }
    }

    /// Read `GOCD_URL`, `GOCD_PIPELINE`, `GOCD_USER` and `GOCD_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("GOCD_URL")
            .map_err(|_| GocdError::NotConfigured("GOCD_URL is not set".to_string()))?;
        let pipeline = std::env::var("GOCD_PIPELINE")
            .map_err(|_| GocdError::NotConfigured("GOCD_PIPELINE is not set".to_string()))?;
        let config = Self::new(&url, &pipeline);
        Ok(match (std::env::var("GOCD_USER"), std::env::var("GOCD_PASSWORD")) {
            (Ok(user), Ok(password)) => config.with_credentials(&user, &password),
            _ => config,
        })
    }

    /// Use HTTP basic auth.
    pub fn with_credentials(mut self, user: &str, password: &str) -> Self {
        self.user = Some(user.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn history_url(&self) -> String {
        format!("{}/go/api/pipelines/{}/history", self.url, self.pipeline)
    }

    /// Stage locators look like `pipeline/counter/stage/stage_counter`.
    pub fn stage_url(&self, locator: &str) -> String {
        format!("{}/go/api/stages/{}", self.url, locator)
    }

    /// Pipeline instance references look like `pipeline/counter`.
    pub fn instance_url(&self, reference: &str) -> String {
        format!("{}/go/api/pipelines/{}", self.url, reference)
    }

    /// Resolve a continuation reference against the server.
    pub fn resolve(&self, next: &str) -> String {
        if next.starts_with("http://") || next.starts_with("https://") {
            next.to_string()
        } else {
            format!("{}/{}", self.url, next.trim_start_matches('/'))
        }
    }
}
