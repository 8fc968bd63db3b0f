use crate::domain::model::{NormalizedProfile, PROFILE_COLUMNS};
use crate::domain::ports::ProfileStore;
use crate::utils::error::Result;
use std::fs;
use std::path::PathBuf;

/// Tabular profile store backed by a local CSV file: one header row, then
/// one profile per row in [`PROFILE_COLUMNS`] order.
#[derive(Debug, Clone)]
pub struct CsvSheetStore {
    path: PathBuf,
}

impl CsvSheetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl ProfileStore for CsvSheetStore {
    async fn load_profiles(&self) -> Result<Vec<NormalizedProfile>> {
        if !self.path.exists() {
            tracing::debug!("Profile store {} does not exist yet", self.path.display());
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let mut profiles = Vec::new();
        for row in reader.records() {
            let row = row?;
            let cells: Vec<&str> = row.iter().collect();
            if let Some(profile) = NormalizedProfile::from_row(&cells) {
                profiles.push(profile);
            }
        }

        tracing::debug!("Read {} profiles from {}", profiles.len(), self.path.display());
        Ok(profiles)
    }

    /// 覆寫整個表格（保留標題列）
    async fn replace_profiles(&self, profiles: &[NormalizedProfile]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(PROFILE_COLUMNS)?;
        for profile in profiles {
            writer.write_record(profile.to_row())?;
        }
        writer.flush()?;

        tracing::info!(
            "✅ Saved {} profiles to {}",
            profiles.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn profile(index: usize, username: &str) -> NormalizedProfile {
        NormalizedProfile {
            id: format!("ig_pb_{}", index),
            username: username.to_string(),
            bio: Some("Lawyer, loves hiking, \"quoted\"".to_string()),
            age: Some(30),
            is_verified: index % 2 == 0,
            profile_url: Some(format!(
                "https://www.instagram.com/{}",
                username.trim_start_matches('@')
            )),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = CsvSheetStore::new(temp_dir.path().join("none.csv"));
        assert!(store.load_profiles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = CsvSheetStore::new(temp_dir.path().join("nested/dir/profiles.csv"));

        let profiles = vec![profile(0, "@alice"), profile(1, "@bob")];
        store.replace_profiles(&profiles).await.unwrap();
        assert_eq!(store.load_profiles().await.unwrap(), profiles);

        // 第二次寫入會覆蓋而非附加
        store.replace_profiles(&profiles[..1]).await.unwrap();
        assert_eq!(store.load_profiles().await.unwrap().len(), 1);

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("id,username,fullName,bio,location,age"));
    }

    #[tokio::test]
    async fn test_load_skips_rows_without_username() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("profiles.csv");
        std::fs::write(
            &path,
            "id,username,fullName\nig_pb_0\nig_pb_1,,Nameless\nig_pb_2,@carol,Carol\n",
        )
        .unwrap();

        let profiles = CsvSheetStore::new(&path).load_profiles().await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].username, "@carol");
        assert_eq!(profiles[0].full_name.as_deref(), Some("Carol"));
    }
}
