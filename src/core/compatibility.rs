//! Rule-based compatibility between two members.
//!
//! The score and the highlights are computed by separate rule sets: the
//! score grades age and observance in tiers, the highlights only name exact
//! matches.

use serde::{Deserialize, Serialize};

pub const AGE_GAP_YEARS: u32 = 5;
/// 年齡差距上限與對應分數，由近到遠
pub const AGE_TIERS: [(u32, u32); 3] = [(2, 20), (5, 15), (10, 10)];
pub const LOCATION_POINTS: u32 = 15;
pub const OBSERVANCE_POINTS: u32 = 25;
pub const SIMILAR_OBSERVANCE_POINTS: u32 = 15;
pub const SIMILAR_OBSERVANCES: [&str; 3] = ["Orthodox", "Conservative", "Reform"];
pub const INDUSTRY_POINTS: u32 = 15;
pub const POINTS_PER_SHARED_INTEREST: u32 = 5;
pub const MAX_INTERESTS_POINTS: u32 = 25;
pub const MAX_SCORE: u32 = 100;
const MAX_LISTED_INTERESTS: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchProfile {
    pub user_id: String,
    pub name: String,
    pub age: u32,
    pub location: String,
    pub religious_observance: String,
    pub industry: String,
    pub interests: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compatibility {
    pub score: u32,
    pub highlights: Vec<String>,
}

fn same_non_empty(a: &str, b: &str) -> bool {
    let a = a.trim();
    !a.is_empty() && a == b.trim()
}

/// 興趣以逗號或空白分隔，忽略兩個字元以下的詞
fn interest_words(interests: &str) -> Vec<String> {
    interests
        .to_lowercase()
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|word| word.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

pub fn shared_interests(a: &str, b: &str) -> Vec<String> {
    let theirs = interest_words(b);
    let mut shared: Vec<String> = Vec::new();
    for word in interest_words(a) {
        if theirs.contains(&word) && !shared.contains(&word) {
            shared.push(word);
        }
    }
    shared
}

/// 年齡未知（0）時不給分
fn age_gap(a: &MatchProfile, b: &MatchProfile) -> Option<u32> {
    (a.age > 0 && b.age > 0).then(|| a.age.abs_diff(b.age))
}

pub fn age_points(gap: u32) -> u32 {
    AGE_TIERS
        .iter()
        .find(|(max_gap, _)| gap <= *max_gap)
        .map_or(0, |(_, points)| *points)
}

pub fn observance_points(a: &str, b: &str) -> u32 {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        0
    } else if a == b {
        OBSERVANCE_POINTS
    } else if SIMILAR_OBSERVANCES.contains(&a) && SIMILAR_OBSERVANCES.contains(&b) {
        SIMILAR_OBSERVANCE_POINTS
    } else {
        0
    }
}

/// 0 到 100 分；各項規則獨立計分後加總
pub fn score(a: &MatchProfile, b: &MatchProfile) -> u32 {
    let mut total = age_gap(a, b).map_or(0, age_points);

    if same_non_empty(&a.location, &b.location) {
        total += LOCATION_POINTS;
    }
    total += observance_points(&a.religious_observance, &b.religious_observance);
    if same_non_empty(&a.industry, &b.industry) {
        total += INDUSTRY_POINTS;
    }

    let shared = shared_interests(&a.interests, &b.interests).len() as u32;
    total += (shared * POINTS_PER_SHARED_INTEREST).min(MAX_INTERESTS_POINTS);

    total.min(MAX_SCORE)
}

/// Human-readable reasons used in match introduction emails.
pub fn highlights(a: &MatchProfile, b: &MatchProfile) -> Vec<String> {
    let mut highlights = Vec::new();

    if age_gap(a, b).is_some_and(|gap| gap <= AGE_GAP_YEARS) {
        highlights.push(format!("Similar age ({} & {})", a.age, b.age));
    }
    if same_non_empty(&a.location, &b.location) {
        highlights.push(format!("Both in {}", a.location.trim()));
    }
    if same_non_empty(&a.religious_observance, &b.religious_observance) {
        highlights.push("Same religious observance level".to_string());
    }
    if same_non_empty(&a.industry, &b.industry) {
        highlights.push(format!("Both in {} industry", a.industry.trim()));
    }

    let shared = shared_interests(&a.interests, &b.interests);
    if !shared.is_empty() {
        let listed: Vec<&str> = shared
            .iter()
            .take(MAX_LISTED_INTERESTS)
            .map(String::as_str)
            .collect();
        highlights.push(format!("Shared interests: {}", listed.join(", ")));
    }

    highlights
}

pub fn assess(a: &MatchProfile, b: &MatchProfile) -> Compatibility {
    Compatibility {
        score: score(a, b),
        highlights: highlights(a, b),
    }
}
