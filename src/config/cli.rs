use crate::config::AppConfig;
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "profile-intake")]
#[command(about = "Normalize scraping-agent output into profile records")]
pub struct CliConfig {
    #[arg(long, help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Override the profile store path")]
    pub store_path: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Normalize an agent output payload saved as JSON
    Normalize { input: PathBuf },
    /// List profiles: store first, agent as fallback
    List,
    /// Re-import the agent's latest result file into the store
    Refresh,
    /// Score two member profiles stored as a JSON array
    Compat { input: PathBuf },
}

impl CliConfig {
    /// 載入 TOML（若有指定）並套用環境變數與命令列覆寫
    pub fn app_config(&self) -> Result<AppConfig> {
        let config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };

        let mut config = config.with_env_overrides();
        if let Some(store_path) = &self.store_path {
            config.store.path = store_path.clone();
        }
        Ok(config)
    }
}
