use crate::domain::model::NormalizedProfile;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Plain GET against the object store holding agent result files.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Sheet-backed tabular store, one profile per row.
pub trait ProfileStore: Send + Sync {
    fn load_profiles(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<NormalizedProfile>>> + Send;
    fn replace_profiles(
        &self,
        profiles: &[NormalizedProfile],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
