use crate::config::{AgentConfig, FetchConfig};
use crate::domain::ports::RemoteFetcher;
use crate::utils::error::{IntakeError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const API_KEY_HEADER: &str = "X-Phantombuster-Key";

fn build_client(fetch: &FetchConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(fetch.timeout_seconds))
        .build()?)
}

async fn read_body(response: reqwest::Response, url: &str) -> Result<String> {
    let status = response.status();
    tracing::debug!("GET {} -> {}", url, status);
    if !status.is_success() {
        return Err(IntakeError::ApiStatusError {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}

/// 網路錯誤與 5xx 才重試
fn is_retryable(error: &IntakeError) -> bool {
    match error {
        IntakeError::ApiError(_) => true,
        IntakeError::ApiStatusError { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Object-store client for agent result files.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(fetch: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(fetch)?,
            retry_attempts: fetch.retry_attempts,
            retry_delay: Duration::from_millis(fetch.retry_delay_ms),
        })
    }

    async fn get_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        read_body(response, url).await
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retry_attempts && is_retryable(&e) => {
                    attempt += 1;
                    tracing::warn!(
                        "Fetching {} failed ({}), retry {}/{}",
                        url,
                        e,
                        attempt,
                        self.retry_attempts
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Agent metadata; the two folders locate the agent's result files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub org_s3_folder: Option<String>,
    #[serde(default)]
    pub s3_folder: Option<String>,
}

impl AgentMetadata {
    pub fn result_csv_url(&self, remote_prefix: &str) -> Option<String> {
        let org = self.org_s3_folder.as_deref().filter(|s| !s.is_empty())?;
        let folder = self.s3_folder.as_deref().filter(|s| !s.is_empty())?;
        Some(format!(
            "{}/{}/{}/result.csv",
            remote_prefix.trim_end_matches('/'),
            org,
            folder
        ))
    }
}

/// Scraping-agent API client.
#[derive(Debug, Clone)]
pub struct AgentClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    agent_id: Option<String>,
}

impl AgentClient {
    pub fn new(agent: &AgentConfig, fetch: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(fetch)?,
            api_base: agent.api_base.trim_end_matches('/').to_string(),
            api_key: agent.api_key.clone(),
            agent_id: agent.agent_id.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.api_key.as_deref(), self.agent_id.as_deref()) {
            (Some(key), Some(id)) if !key.is_empty() && !id.is_empty() => Ok((key, id)),
            _ => Err(IntakeError::SourceUnavailable {
                message: "scraping agent API key or agent id not configured".to_string(),
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let (key, id) = self.credentials()?;
        let url = format!("{}/{}", self.api_base, endpoint);
        tracing::debug!("Making agent API request to: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("id", id)])
            .header(API_KEY_HEADER, key)
            .send()
            .await?;
        let body = read_body(response, &url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Raw payload of the agent's last run.
    pub async fn fetch_output(&self) -> Result<Value> {
        self.get_json("agents/fetch-output").await
    }

    pub async fn fetch_agent(&self) -> Result<AgentMetadata> {
        self.get_json("agents/fetch").await
    }
}
