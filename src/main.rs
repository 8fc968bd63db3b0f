use anyhow::Context;
use clap::Parser;
use profile_intake::config::Command;
use profile_intake::core::compatibility::{assess, MatchProfile};
use profile_intake::utils::{logger, validation::Validate};
use profile_intake::{build_service, CliConfig, HttpFetcher, ProfileNormalizer};
use serde::Serialize;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting profile-intake");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = cli.app_config()?;
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match &cli.command {
        Command::Normalize { input } => {
            let content = std::fs::read_to_string(input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            // 不是 JSON 的檔案當成原始字串輸出（例如 CSV）
            let raw = serde_json::from_str(&content)
                .unwrap_or(serde_json::Value::String(content));

            let fetcher = HttpFetcher::new(&config.fetch)?;
            let normalizer = ProfileNormalizer::new(fetcher, &config.normalizer)?;
            let outcome = normalizer.normalize(raw).await;
            print_json(&outcome)?;
        }
        Command::List => {
            let service = build_service(&config)?;
            print_json(&service.list_profiles().await)?;
        }
        Command::Refresh => {
            let service = build_service(&config)?;
            match service.refresh_profiles().await {
                Ok(report) => {
                    tracing::info!(
                        "✅ Refreshed {} profiles from {}",
                        report.profiles_saved,
                        report.result_url
                    );
                    print_json(&report)?;
                }
                Err(e) => {
                    tracing::error!("❌ Refresh failed: {}", e);
                    eprintln!("❌ {}", e.user_friendly_message());
                    std::process::exit(2);
                }
            }
        }
        Command::Compat { input } => {
            let content = std::fs::read_to_string(input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let members: Vec<MatchProfile> =
                serde_json::from_str(&content).context("expected a JSON array of members")?;
            let [first, second] = members.as_slice() else {
                anyhow::bail!("expected exactly two member profiles, got {}", members.len());
            };
            print_json(&assess(first, second))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
