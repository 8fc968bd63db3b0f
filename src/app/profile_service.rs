use crate::adapters::http::AgentClient;
use crate::core::normalizer::ProfileNormalizer;
use crate::core::raw_output::RawOutput;
use crate::domain::model::{NormalizeOutcome, NormalizedProfile};
use crate::domain::ports::{ProfileStore, RemoteFetcher};
use crate::utils::error::{IntakeError, Result};
use serde::{Deserialize, Serialize};

pub const EMPTY_MESSAGE: &str =
    "No preview profiles available yet. Our database contains 10,000+ profiles.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    #[serde(rename = "google_sheets")]
    SheetStore,
    #[serde(rename = "phantombuster")]
    Agent,
    Unknown,
}

/// Always-renderable listing: failures show up as an empty list with a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilesResponse {
    pub profiles: Vec<NormalizedProfile>,
    pub total: usize,
    pub source: ProfileSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProfilesResponse {
    fn found(profiles: Vec<NormalizedProfile>, source: ProfileSource) -> Self {
        Self {
            total: profiles.len(),
            profiles,
            source,
            message: None,
        }
    }

    fn empty() -> Self {
        Self {
            profiles: Vec::new(),
            total: 0,
            source: ProfileSource::Unknown,
            message: Some(EMPTY_MESSAGE.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub result_url: String,
    pub rows_parsed: usize,
    pub profiles_saved: usize,
    pub dropped: usize,
}

pub struct ProfileService<S: ProfileStore, F: RemoteFetcher> {
    store: S,
    agent: AgentClient,
    normalizer: ProfileNormalizer<F>,
}

impl<S: ProfileStore, F: RemoteFetcher> ProfileService<S, F> {
    pub fn new(store: S, agent: AgentClient, normalizer: ProfileNormalizer<F>) -> Self {
        Self {
            store,
            agent,
            normalizer,
        }
    }

    /// 先讀表格；沒有資料才向 agent 取輸出，取到後寫回表格
    pub async fn list_profiles(&self) -> ProfilesResponse {
        match self.store.load_profiles().await {
            Ok(profiles) if !profiles.is_empty() => {
                tracing::info!("Loaded {} profiles from the sheet store", profiles.len());
                return ProfilesResponse::found(profiles, ProfileSource::SheetStore);
            }
            Ok(_) => tracing::info!("Sheet store empty, trying the scraping agent..."),
            Err(e) => tracing::warn!("Could not read from the sheet store: {}", e),
        }

        match self.fetch_from_agent().await {
            Ok(outcome) if !outcome.profiles.is_empty() => {
                tracing::info!("✅ Loaded {} profiles from the scraping agent", outcome.profiles.len());
                if let Err(e) = self.store.replace_profiles(&outcome.profiles).await {
                    tracing::error!("Error saving profiles to the sheet store: {}", e);
                }
                ProfilesResponse::found(outcome.profiles, ProfileSource::Agent)
            }
            Ok(_) => {
                tracing::warn!("⚠️ Agent returned 0 profiles. Check that it has run and has output.");
                ProfilesResponse::empty()
            }
            Err(e) if e.is_source_unavailable() => {
                tracing::info!("Scraping agent unavailable: {}", e);
                ProfilesResponse::empty()
            }
            Err(e) => {
                tracing::error!("Error fetching from the scraping agent: {}", e);
                ProfilesResponse::empty()
            }
        }
    }

    async fn fetch_from_agent(&self) -> Result<NormalizeOutcome> {
        let raw = self.agent.fetch_output().await?;
        Ok(self.normalizer.normalize(raw).await)
    }

    /// Re-imports the agent's latest CSV result file into the store.
    pub async fn refresh_profiles(&self) -> Result<RefreshReport> {
        let result_url = self.resolve_result_url().await?;

        tracing::info!("Fetching CSV from {}", result_url);
        let body = self.normalizer.fetcher().fetch_text(&result_url).await?;

        let outcome = self.normalizer.normalize_csv(&body);
        let rows_parsed = outcome.profiles.len() + outcome.dropped.len();
        if rows_parsed == 0 {
            return Err(IntakeError::InvalidResultFile { url: result_url });
        }

        self.store.replace_profiles(&outcome.profiles).await?;

        Ok(RefreshReport {
            result_url,
            rows_parsed,
            profiles_saved: outcome.profiles.len(),
            dropped: outcome.dropped.len(),
        })
    }

    /// 優先用 agent 的資料夾資訊組出結果檔網址，否則從最後一次輸出找
    async fn resolve_result_url(&self) -> Result<String> {
        let metadata = self.agent.fetch_agent().await?;
        if let Some(url) = metadata.result_csv_url(self.normalizer.remote_prefix()) {
            tracing::info!("✅ Built CSV URL from agent metadata: {}", url);
            return Ok(url);
        }

        tracing::warn!("⚠️ No folder info in agent metadata, checking its output...");
        let output = self.agent.fetch_output().await?;
        match self.normalizer.patterns().classify(output) {
            RawOutput::RemoteCsvUrl { url, .. } => {
                tracing::info!("✅ Found CSV URL in agent output: {}", url);
                Ok(url)
            }
            _ => Err(IntakeError::NoResultUrl {
                message: "the agent may need to run first to generate results".to_string(),
            }),
        }
    }
}
