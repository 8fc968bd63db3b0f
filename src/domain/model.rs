use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 單筆無結構欄位資料（field-map），保留來源欄位順序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// 依序嘗試多個別名，回傳第一個非空字串值
    pub fn first_str(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| {
            self.data
                .get(*alias)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
        })
    }

    pub fn is_blank(&self) -> bool {
        self.data.values().all(|v| match v {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        })
    }
}

/// Canonical per-person record produced by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProfile {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts_count: Option<u64>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Fixed column order of the tabular profile store.
pub const PROFILE_COLUMNS: [&str; 13] = [
    "id",
    "username",
    "fullName",
    "bio",
    "location",
    "age",
    "profession",
    "followersCount",
    "followingCount",
    "postsCount",
    "isVerified",
    "profileUrl",
    "imageUrl",
];

impl NormalizedProfile {
    pub fn to_row(&self) -> Vec<String> {
        fn opt<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        vec![
            self.id.clone(),
            self.username.clone(),
            opt(&self.full_name),
            opt(&self.bio),
            opt(&self.location),
            opt(&self.age),
            opt(&self.profession),
            opt(&self.followers_count),
            opt(&self.following_count),
            opt(&self.posts_count),
            self.is_verified.to_string(),
            opt(&self.profile_url),
            opt(&self.image_url),
        ]
    }

    /// 從表格列還原；少於兩欄或沒有 username 的列回傳 None
    pub fn from_row<S: AsRef<str>>(row: &[S]) -> Option<Self> {
        if row.len() < 2 {
            return None;
        }

        let cell = |i: usize| -> Option<String> {
            row.get(i)
                .map(|s| s.as_ref().trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let number = |i: usize| cell(i).and_then(|s| s.parse().ok());

        let username = cell(1)?;
        Some(Self {
            id: cell(0).unwrap_or_default(),
            username,
            full_name: cell(2),
            bio: cell(3),
            location: cell(4),
            age: number(5).and_then(|n: u64| u32::try_from(n).ok()),
            profession: cell(6),
            followers_count: number(7),
            following_count: number(8),
            posts_count: number(9),
            is_verified: cell(10).as_deref() == Some("true"),
            profile_url: cell(11),
            image_url: cell(12),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingUsername,
    NotAFieldMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRecord {
    pub index: usize,
    pub reason: DropReason,
}

/// 正規化結果：保留的 profile 與被略過的紀錄
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOutcome {
    pub profiles: Vec<NormalizedProfile>,
    pub dropped: Vec<DroppedRecord>,
}

impl NormalizeOutcome {
    pub fn dropped_count(&self, reason: DropReason) -> usize {
        self.dropped.iter().filter(|d| d.reason == reason).count()
    }
}
