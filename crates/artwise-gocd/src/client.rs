//! GoCD REST client
//!
//! Implements the four Artwise sources against a GoCD server:
//! pipeline history pages for the feed, stage instances for stage details,
//! pipeline instances for materials and the newest history page for live
//! activity.

use artwise_core::domain::{Activity, Material};
use artwise_core::{ActivitySource, FeedPage, FeedSource, MaterialSource, StageDetailSource, StageDetails};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::GocdConfig;
use crate::error::{GocdError, Result};
use crate::wire::{PipelineHistory, PipelineInstance, StageInstance};

const PIPELINE_API: &str = "application/vnd.go.cd.v1+json";
const STAGE_API: &str = "application/vnd.go.cd.v3+json";

pub struct GocdClient {
    config: GocdConfig,
    http_client: reqwest::Client,
}

impl GocdClient {
    pub fn new(config: GocdConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(GocdClient {
            config,
            http_client,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GocdConfig::from_env()?)
    }

    pub fn config(&self) -> &GocdConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, accept: &str) -> Result<T> {
        debug!("Requesting {}", url);

        let mut request = self
            .http_client
            .get(url)
            .header(reqwest::header::ACCEPT, accept);
        if let Some(user) = &self.config.user {
            request = request.basic_auth(user, self.config.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GocdError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| GocdError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    pub async fn history_page(&self, next: Option<&str>) -> Result<PipelineHistory> {
        let url = match next {
            Some(next) => self.config.resolve(next),
            None => self.config.history_url(),
        };
        self.get_json(&url, PIPELINE_API).await
    }
}

#[async_trait]
impl FeedSource for GocdClient {
    async fn fetch_page(&self, next: Option<&str>) -> artwise_core::Result<FeedPage> {
        Ok(self.history_page(next).await?.into_page())
    }
}

#[async_trait]
impl StageDetailSource for GocdClient {
    async fn stage_details(&self, stage_id: &str) -> artwise_core::Result<StageDetails> {
        let url = self.config.stage_url(stage_id);
        let stage: StageInstance = self.get_json(&url, STAGE_API).await?;
        stage.into_details().ok_or_else(|| {
            GocdError::Decode {
                url,
                message: "stage has no result yet".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl MaterialSource for GocdClient {
    async fn materials(&self, material_ref: &str) -> artwise_core::Result<Vec<Material>> {
        let url = self.config.instance_url(material_ref);
        let instance: PipelineInstance = self.get_json(&url, PIPELINE_API).await?;
        Ok(instance.materials())
    }
}

#[async_trait]
impl ActivitySource for GocdClient {
    async fn activity(&self) -> artwise_core::Result<Activity> {
        Ok(self.history_page(None).await?.activity())
    }
}
