use crate::config::NormalizerConfig;
use crate::core::csv_line::parse_csv_text;
use crate::core::extract::{AgeEstimator, FieldExtractor};
use crate::core::raw_output::{first_array_field, RawOutput, UrlPatterns};
use crate::domain::model::{DropReason, DroppedRecord, NormalizeOutcome, Record};
use crate::domain::ports::RemoteFetcher;
use crate::utils::error::Result;
use serde_json::Value;

/// Turns one agent output payload into normalized profiles.
///
/// Never fails on malformed input: unknown shapes, failed remote fetches and
/// records without a username all degrade to fewer results. Dropped records
/// are reported in [`NormalizeOutcome::dropped`].
pub struct ProfileNormalizer<F: RemoteFetcher> {
    fetcher: F,
    patterns: UrlPatterns,
    extractor: FieldExtractor,
    remote_prefix: String,
    id_prefix: String,
    max_rows: Option<usize>,
}

impl<F: RemoteFetcher> ProfileNormalizer<F> {
    pub fn new(fetcher: F, config: &NormalizerConfig) -> Result<Self> {
        let ages = match config.current_year {
            Some(year) => AgeEstimator::new(config.age_policy, year),
            None => AgeEstimator::with_current_year(config.age_policy),
        };

        Ok(Self {
            fetcher,
            patterns: UrlPatterns::new(&config.remote_prefix)?,
            extractor: FieldExtractor::new(
                &config.url_marker,
                &config.profile_url_template,
                ages,
            ),
            remote_prefix: config.remote_prefix.clone(),
            id_prefix: config.id_prefix.clone(),
            max_rows: config.max_rows,
        })
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn patterns(&self) -> &UrlPatterns {
        &self.patterns
    }

    pub fn remote_prefix(&self) -> &str {
        &self.remote_prefix
    }

    pub async fn normalize(&self, raw: Value) -> NormalizeOutcome {
        let shape = self.patterns.classify(raw);
        tracing::debug!("Agent output classified as {}", shape.kind());

        let items = self.resolve(shape).await;
        if items.is_empty() {
            tracing::warn!("⚠️ No profile records found in agent output");
        }
        self.normalize_items(items)
    }

    /// 解析已下載的 CSV 結果檔
    pub fn normalize_csv(&self, text: &str) -> NormalizeOutcome {
        let items = records_to_values(parse_csv_text(text, self.max_rows));
        self.normalize_items(items)
    }

    /// 依序嘗試各個來源，前一步沒有結果才往下一步
    pub async fn resolve(&self, shape: RawOutput) -> Vec<Value> {
        let mut shape = shape;
        loop {
            shape = match shape {
                RawOutput::StructuredList(items) => {
                    tracing::info!("✅ Found {} records in array format", items.len());
                    return items;
                }
                RawOutput::InlineCsv(text) => {
                    let records = parse_csv_text(&text, None);
                    tracing::info!("✅ Found {} records in inline CSV", records.len());
                    return records_to_values(records);
                }
                RawOutput::NestedContainer(map) => {
                    return match first_array_field(&map) {
                        Some((key, items)) => {
                            tracing::info!("✅ Found {} records in field '{}'", items.len(), key);
                            items.clone()
                        }
                        None => Vec::new(),
                    };
                }
                RawOutput::Unrecognized => return Vec::new(),
                RawOutput::RemoteCsvUrl { url, fallback } => {
                    let items = self.fetch_csv(&url).await;
                    if !items.is_empty() {
                        return items;
                    }
                    *fallback
                }
                RawOutput::RemoteJsonUrl { url, fallback } => {
                    let items = self.fetch_json(&url).await;
                    if !items.is_empty() {
                        return items;
                    }
                    *fallback
                }
            };
        }
    }

    async fn fetch_csv(&self, url: &str) -> Vec<Value> {
        tracing::info!("Fetching CSV result file: {}", url);
        match self.fetcher.fetch_text(url).await {
            Ok(body) => {
                let records = parse_csv_text(&body, self.max_rows);
                tracing::info!("✅ Found {} records from CSV URL", records.len());
                records_to_values(records)
            }
            Err(e) => {
                tracing::warn!("Failed to fetch CSV from {}: {}", url, e);
                Vec::new()
            }
        }
    }

    async fn fetch_json(&self, url: &str) -> Vec<Value> {
        tracing::info!("Fetching JSON result file: {}", url);
        let body = match self.fetcher.fetch_text(url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to fetch JSON from {}: {}", url, e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(items)) => {
                tracing::info!("✅ Found {} records from JSON URL", items.len());
                items
            }
            Ok(Value::Object(map)) => match first_array_field(&map) {
                Some((key, items)) => {
                    tracing::info!("✅ Found {} records from JSON object.{}", items.len(), key);
                    items.clone()
                }
                None => Vec::new(),
            },
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::warn!("Result file at {} is not valid JSON: {}", url, e);
                Vec::new()
            }
        }
    }

    fn normalize_items(&self, items: Vec<Value>) -> NormalizeOutcome {
        let total = items.len();
        let mut outcome = NormalizeOutcome::default();

        for (index, item) in items.into_iter().enumerate() {
            let Value::Object(map) = item else {
                outcome.dropped.push(DroppedRecord {
                    index,
                    reason: DropReason::NotAFieldMap,
                });
                continue;
            };

            let record = Record::new(map);
            let id = format!("{}_{}", self.id_prefix, index);
            match self.extractor.extract(&record, id) {
                Some(profile) => outcome.profiles.push(profile),
                None => {
                    tracing::debug!("Skipping record {} - no username found", index);
                    outcome.dropped.push(DroppedRecord {
                        index,
                        reason: DropReason::MissingUsername,
                    });
                }
            }
        }

        tracing::info!(
            "✅ Converted {} profiles from {} records ({} dropped)",
            outcome.profiles.len(),
            total,
            outcome.dropped.len()
        );
        outcome
    }
}

fn records_to_values(records: Vec<Record>) -> Vec<Value> {
    records
        .into_iter()
        .map(|record| Value::Object(record.data))
        .collect()
}
