//! CircleCI v2 API client

use super::{PipelineApi, PipelineStatus};
use crate::error::VerifyError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Default API root
pub const DEFAULT_API_BASE: &str = "https://circleci.com/api/v2";

/// Timeout for a single API request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("safeup/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct PipelineCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WorkflowPage {
    items: Vec<Workflow>,
}

#[derive(Debug, Deserialize)]
struct Workflow {
    status: String,
}

/// Triggers and inspects CircleCI pipelines
#[derive(Clone)]
pub struct CircleCiClient {
    client: Client,
    api_base: String,
    project_slug: String,
    token: String,
}

impl CircleCiClient {
    /// Create a client for `project_slug` (e.g. `gh/org/repo`)
    pub fn new(
        api_base: impl Into<String>,
        project_slug: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, VerifyError> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                VerifyError::network(&api_base, format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_base,
            project_slug: project_slug.into(),
            token: token.into(),
        })
    }

    fn trigger_url(&self) -> String {
        format!("{}/project/{}/pipeline", self.api_base, self.project_slug)
    }

    fn workflow_url(&self, pipeline_id: &str) -> String {
        format!("{}/pipeline/{}/workflow", self.api_base, pipeline_id)
    }

    fn expect_status(
        url: &str,
        response: &reqwest::Response,
        expected: StatusCode,
    ) -> Result<(), VerifyError> {
        if response.status() == expected {
            return Ok(());
        }
        Err(VerifyError::network(
            url,
            format!("HTTP {} (expected {})", response.status(), expected),
        ))
    }
}

#[async_trait]
impl PipelineApi for CircleCiClient {
    fn name(&self) -> &str {
        "circleci"
    }

    async fn trigger_pipeline(&self, branch: &str) -> Result<String, VerifyError> {
        let url = self.trigger_url();
        let response = self
            .client
            .post(&url)
            .header("Circle-Token", &self.token)
            .json(&json!({ "branch": branch }))
            .send()
            .await
            .map_err(|e| VerifyError::network(&url, e.to_string()))?;

        Self::expect_status(&url, &response, StatusCode::CREATED)?;

        let created: PipelineCreated = response
            .json()
            .await
            .map_err(|e| VerifyError::network(&url, format!("failed to parse JSON: {}", e)))?;
        Ok(created.id)
    }

    async fn workflow_status(&self, pipeline_id: &str) -> Result<PipelineStatus, VerifyError> {
        let url = self.workflow_url(pipeline_id);
        let response = self
            .client
            .get(&url)
            .header("Circle-Token", &self.token)
            .send()
            .await
            .map_err(|e| VerifyError::network(&url, e.to_string()))?;

        Self::expect_status(&url, &response, StatusCode::OK)?;

        let page: WorkflowPage = response
            .json()
            .await
            .map_err(|e| VerifyError::network(&url, format!("failed to parse JSON: {}", e)))?;
        Ok(PipelineStatus::from_workflows(
            page.items.iter().map(|w| w.status.as_str()),
        ))
    }
}
