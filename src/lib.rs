pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::AppConfig;

pub use adapters::{AgentClient, CsvSheetStore, HttpFetcher};
pub use app::{ProfileService, ProfilesResponse};
pub use crate::core::normalizer::ProfileNormalizer;
pub use domain::model::{NormalizeOutcome, NormalizedProfile};
pub use utils::error::{IntakeError, Result};

/// 依設定組出完整的服務
pub fn build_service(config: &AppConfig) -> Result<ProfileService<CsvSheetStore, HttpFetcher>> {
    let fetcher = HttpFetcher::new(&config.fetch)?;
    let normalizer = ProfileNormalizer::new(fetcher, &config.normalizer)?;
    let agent = AgentClient::new(&config.agent, &config.fetch)?;
    let store = CsvSheetStore::new(&config.store.path);
    Ok(ProfileService::new(store, agent, normalizer))
}
