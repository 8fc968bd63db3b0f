//! Per-record field extraction.
//!
//! Agent exports name the same column differently depending on which phantom
//! produced them, so every logical field is looked up through an ordered list
//! of aliases.

use crate::domain::model::{NormalizedProfile, Record};
use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

pub const USERNAME_KEYS: &[&str] = &[
    "username",
    "handle",
    "Profile URL",
    "profileUrl",
    "url",
    "Instagram Handle",
    "instagram_handle",
    "user",
    "User",
];
pub const FULL_NAME_KEYS: &[&str] = &["fullName", "name", "Full Name"];
pub const BIO_KEYS: &[&str] = &["bio", "description", "Bio"];
pub const BIO_TEXT_KEYS: &[&str] = &["bio", "description"];
pub const LOCATION_KEYS: &[&str] = &["location", "Location"];
pub const IMAGE_URL_KEYS: &[&str] = &[
    "imgUrl",
    "imageUrl",
    "Image URL",
    "profilePictureUrl",
    "Profile Picture URL",
    "avatarUrl",
    "avatar",
];
pub const FOLLOWERS_KEYS: &[&str] = &["followersCount", "Followers Count", "followers"];
pub const FOLLOWING_KEYS: &[&str] = &["followingCount", "Following Count", "following"];
pub const POSTS_KEYS: &[&str] = &["postsCount", "Posts Count", "posts"];
pub const VERIFIED_KEYS: &[&str] = &["isVerified", "verified", "Verified"];

pub const PROFESSION_KEYWORDS: &[&str] = &[
    "lawyer",
    "doctor",
    "engineer",
    "teacher",
    "consultant",
    "manager",
    "director",
    "analyst",
    "designer",
    "developer",
    "therapist",
    "nurse",
    "dentist",
    "accountant",
    "architect",
];

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 100;

pub const DEFAULT_URL_MARKER: &str = "instagram.com/";
pub const DEFAULT_PROFILE_URL_TEMPLATE: &str = "https://www.instagram.com/{username}";
pub const USERNAME_PLACEHOLDER: &str = "{username}";

static AGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2})\b").expect("age token pattern"));
static BIRTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("birth year pattern"));
static BARE_HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@?[a-zA-Z0-9._]+$").expect("handle pattern"));

/// Which age heuristic wins when a bio carries both a two-digit number and a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgePolicy {
    #[default]
    TokenThenYear,
    YearThenToken,
    TokenOnly,
    YearOnly,
}

#[derive(Debug, Clone, Copy)]
pub struct AgeEstimator {
    policy: AgePolicy,
    current_year: i32,
}

impl AgeEstimator {
    pub fn new(policy: AgePolicy, current_year: i32) -> Self {
        Self {
            policy,
            current_year,
        }
    }

    pub fn with_current_year(policy: AgePolicy) -> Self {
        Self::new(policy, chrono::Utc::now().year())
    }

    /// 文字中第一個落在合理範圍內的兩位數
    pub fn from_token(&self, text: &str) -> Option<u32> {
        AGE_TOKEN
            .captures_iter(text)
            .filter_map(|caps| caps[1].parse::<u32>().ok())
            .find(|age| (MIN_AGE..=MAX_AGE).contains(age))
    }

    /// 以出生年份推估（例如 "born 1994"）
    pub fn from_birth_year(&self, text: &str) -> Option<u32> {
        BIRTH_YEAR
            .find_iter(text)
            .filter_map(|m| m.as_str().parse::<i32>().ok())
            .filter_map(|year| u32::try_from(self.current_year - year).ok())
            .find(|age| (MIN_AGE..=MAX_AGE).contains(age))
    }

    pub fn estimate(&self, text: &str) -> Option<u32> {
        let text = text.to_lowercase();
        match self.policy {
            AgePolicy::TokenThenYear => self
                .from_token(&text)
                .or_else(|| self.from_birth_year(&text)),
            AgePolicy::YearThenToken => self
                .from_birth_year(&text)
                .or_else(|| self.from_token(&text)),
            AgePolicy::TokenOnly => self.from_token(&text),
            AgePolicy::YearOnly => self.from_birth_year(&text),
        }
    }
}

pub fn extract_profession(bio: &str) -> Option<String> {
    let bio = bio.to_lowercase();
    PROFESSION_KEYWORDS
        .iter()
        .find(|keyword| bio.contains(*keyword))
        .map(|keyword| capitalize(keyword))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 計數欄位：數字直接採用，字串去掉千分位逗號後取開頭數字
pub fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .filter(|c| *c != ',')
                .take_while(char::is_ascii_digit)
                .collect();
            if digits.is_empty() {
                None
            } else {
                digits.parse().ok()
            }
        }
        _ => None,
    }
}

pub fn first_count(record: &Record, aliases: &[&str]) -> Option<u64> {
    aliases
        .iter()
        .find_map(|alias| record.get(alias).and_then(parse_count))
}

pub fn is_verified(record: &Record) -> bool {
    VERIFIED_KEYS.iter().any(|key| match record.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(s)) => s == "true",
        _ => false,
    })
}

#[derive(Debug, Clone)]
pub struct FieldExtractor {
    url_marker: String,
    profile_url_template: String,
    ages: AgeEstimator,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(
            DEFAULT_URL_MARKER,
            DEFAULT_PROFILE_URL_TEMPLATE,
            AgeEstimator::with_current_year(AgePolicy::default()),
        )
    }
}

impl FieldExtractor {
    pub fn new(url_marker: &str, profile_url_template: &str, ages: AgeEstimator) -> Self {
        Self {
            url_marker: url_marker.to_string(),
            profile_url_template: profile_url_template.to_string(),
            ages,
        }
    }

    pub fn profile_url(&self, handle: &str) -> String {
        self.profile_url_template
            .replace(USERNAME_PLACEHOLDER, handle)
    }

    /// 回傳不含 `@` 的帳號；具名欄位都找不到時掃描所有字串欄位
    pub fn extract_username(&self, record: &Record) -> Option<String> {
        let named = USERNAME_KEYS.iter().find_map(|key| {
            record
                .get(key)
                .and_then(Value::as_str)
                .map(|value| self.clean_handle(value))
                .filter(|handle| !handle.is_empty())
        });
        if named.is_some() {
            return named;
        }

        record.data.values().find_map(|value| {
            let value = value.as_str()?;
            if value.contains(&self.url_marker) || BARE_HANDLE.is_match(value) {
                Some(self.clean_handle(value)).filter(|handle| !handle.is_empty())
            } else {
                None
            }
        })
    }

    fn clean_handle(&self, value: &str) -> String {
        match value.find(&self.url_marker) {
            Some(pos) => {
                let rest = &value[pos + self.url_marker.len()..];
                rest.split(['/', '?', '#'])
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .trim_start_matches('@')
                    .to_string()
            }
            None => value.trim().trim_start_matches('@').trim().to_string(),
        }
    }

    /// Maps one field-map to a profile; `None` when no username can be found.
    pub fn extract(&self, record: &Record, id: String) -> Option<NormalizedProfile> {
        let handle = self.extract_username(record)?;

        let bio_text = record.first_str(BIO_TEXT_KEYS).unwrap_or_default();
        let age = self.ages.estimate(bio_text);
        let profession = extract_profession(bio_text);

        Some(NormalizedProfile {
            id,
            username: format!("@{}", handle),
            full_name: record.first_str(FULL_NAME_KEYS).map(str::to_string),
            bio: record.first_str(BIO_KEYS).map(str::to_string),
            location: record.first_str(LOCATION_KEYS).map(str::to_string),
            age,
            profession,
            followers_count: first_count(record, FOLLOWERS_KEYS),
            following_count: first_count(record, FOLLOWING_KEYS),
            posts_count: first_count(record, POSTS_KEYS),
            is_verified: is_verified(record),
            profile_url: Some(self.profile_url(&handle)),
            image_url: record.first_str(IMAGE_URL_KEYS).map(str::to_string),
        })
    }
}
