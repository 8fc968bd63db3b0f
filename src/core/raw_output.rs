//! Shape classification for agent output payloads.
//!
//! The scraping agent returns whatever its last run produced: a JSON array,
//! a CSV dump, a log line pointing at a result file, or an object wrapping any
//! of those. `UrlPatterns::classify` inspects the payload once and returns a
//! closed tag; string tags carry the next fallback to try if theirs yields
//! nothing.

use crate::utils::error::{IntakeError, Result};
use regex::Regex;
use serde_json::{Map, Value};

/// Agent responses nest the payload under this key, sometimes twice.
pub const OUTPUT_KEY: &str = "output";
pub const CSV_URL_KEY: &str = "csvUrl";
const MAX_OUTPUT_DEPTH: usize = 3;

pub const DEFAULT_REMOTE_PREFIX: &str = "https://phantombuster.s3.amazonaws.com/";

#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    /// Already a list of field-maps.
    StructuredList(Vec<Value>),
    RemoteCsvUrl {
        url: String,
        fallback: Box<RawOutput>,
    },
    RemoteJsonUrl {
        url: String,
        fallback: Box<RawOutput>,
    },
    InlineCsv(String),
    /// Object whose first array-valued field holds the records.
    NestedContainer(Map<String, Value>),
    Unrecognized,
}

impl RawOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            RawOutput::StructuredList(_) => "structured_list",
            RawOutput::RemoteCsvUrl { .. } => "remote_csv_url",
            RawOutput::RemoteJsonUrl { .. } => "remote_json_url",
            RawOutput::InlineCsv(_) => "inline_csv",
            RawOutput::NestedContainer(_) => "nested_container",
            RawOutput::Unrecognized => "unrecognized",
        }
    }
}

/// 在輸出字串中尋找結果檔網址
#[derive(Debug, Clone)]
pub struct UrlPatterns {
    csv: Regex,
    json: Regex,
}

impl UrlPatterns {
    pub fn new(remote_prefix: &str) -> Result<Self> {
        let build = |extension: &str| {
            let pattern = format!(r"{}[^\s)]+\.{}", regex::escape(remote_prefix), extension);
            Regex::new(&pattern).map_err(|e| IntakeError::ConfigError {
                message: format!("Invalid remote URL prefix {}: {}", remote_prefix, e),
            })
        };

        Ok(Self {
            csv: build("csv")?,
            json: build("json")?,
        })
    }

    pub fn find_csv_url<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.csv.find(text).map(|m| m.as_str())
    }

    pub fn find_json_url<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.json.find(text).map(|m| m.as_str())
    }

    pub fn classify(&self, raw: Value) -> RawOutput {
        self.classify_at(raw, 0)
    }

    fn classify_at(&self, raw: Value, depth: usize) -> RawOutput {
        match raw {
            Value::Array(items) => RawOutput::StructuredList(items),
            Value::String(text) => self.classify_text(text),
            Value::Object(mut map) => {
                let has_output = map
                    .get(OUTPUT_KEY)
                    .is_some_and(|inner| !is_empty_value(inner));
                if depth < MAX_OUTPUT_DEPTH && has_output {
                    if let Some(inner) = map.remove(OUTPUT_KEY) {
                        return self.classify_at(inner, depth + 1);
                    }
                }

                let csv_url = map
                    .get(CSV_URL_KEY)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string);

                match csv_url {
                    Some(url) => RawOutput::RemoteCsvUrl {
                        url,
                        fallback: Box::new(RawOutput::NestedContainer(map)),
                    },
                    None => RawOutput::NestedContainer(map),
                }
            }
            _ => RawOutput::Unrecognized,
        }
    }

    // 順序：CSV 網址 → JSON 網址 → 內嵌 CSV
    fn classify_text(&self, text: String) -> RawOutput {
        let inline = if text.contains(',') {
            RawOutput::InlineCsv(text.clone())
        } else {
            RawOutput::Unrecognized
        };

        let after_json = match self.find_json_url(&text) {
            Some(url) => RawOutput::RemoteJsonUrl {
                url: url.to_string(),
                fallback: Box::new(inline),
            },
            None => inline,
        };

        match self.find_csv_url(&text) {
            Some(url) => RawOutput::RemoteCsvUrl {
                url: url.to_string(),
                fallback: Box::new(after_json),
            },
            None => after_json,
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// 找出第一個值為陣列的欄位：先看同層欄位，再依序往下層物件找。
pub fn first_array_field(map: &Map<String, Value>) -> Option<(&str, &Vec<Value>)> {
    let direct = map.iter().find_map(|(key, value)| match value {
        Value::Array(items) => Some((key.as_str(), items)),
        _ => None,
    });
    if direct.is_some() {
        return direct;
    }

    map.values().find_map(|value| match value {
        Value::Object(inner) => first_array_field(inner),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patterns() -> UrlPatterns {
        UrlPatterns::new(DEFAULT_REMOTE_PREFIX).unwrap()
    }

    #[test]
    fn test_array_is_structured_list() {
        let shape = patterns().classify(json!([{"username": "a"}]));
        assert_eq!(shape.kind(), "structured_list");
    }

    #[test]
    fn test_output_key_is_unwrapped_twice() {
        let shape = patterns().classify(json!({"status": "finished", "output": {"output": [{"username": "a"}]}}));
        assert_eq!(shape, RawOutput::StructuredList(vec![json!({"username": "a"})]));
    }

    #[test]
    fn test_csv_url_in_log_text() {
        let text = "Done (saved to https://phantombuster.s3.amazonaws.com/org/abc/result.csv) and \
                    https://phantombuster.s3.amazonaws.com/org/abc/result.json";
        match patterns().classify(json!(text)) {
            RawOutput::RemoteCsvUrl { url, fallback } => {
                assert_eq!(url, "https://phantombuster.s3.amazonaws.com/org/abc/result.csv");
                match *fallback {
                    RawOutput::RemoteJsonUrl { url, fallback } => {
                        assert_eq!(url, "https://phantombuster.s3.amazonaws.com/org/abc/result.json");
                        assert_eq!(fallback.kind(), "unrecognized");
                    }
                    other => panic!("unexpected fallback {:?}", other),
                }
            }
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn test_foreign_host_is_not_a_remote_url() {
        let shape = patterns().classify(json!("https://evil.example.com/result.csv"));
        assert_eq!(shape, RawOutput::Unrecognized);
    }

    #[test]
    fn test_inline_csv_text() {
        let shape = patterns().classify(json!("username,bio\nalice,hi"));
        assert_eq!(shape.kind(), "inline_csv");
    }

    #[test]
    fn test_csv_url_field_on_object() {
        let shape = patterns().classify(json!({"output": {"csvUrl": "https://files.example.com/x.csv"}}));
        match shape {
            RawOutput::RemoteCsvUrl { url, fallback } => {
                assert_eq!(url, "https://files.example.com/x.csv");
                assert_eq!(fallback.kind(), "nested_container");
            }
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn test_scalars_are_unrecognized() {
        assert_eq!(patterns().classify(json!(42)), RawOutput::Unrecognized);
        assert_eq!(patterns().classify(json!(null)), RawOutput::Unrecognized);
        assert_eq!(patterns().classify(json!("no commas here")), RawOutput::Unrecognized);
    }

    #[test]
    fn test_first_array_field_prefers_same_level() {
        let value = json!({"meta": {"deep": [1]}, "rows": [2]});
        let map = value.as_object().unwrap();
        let (key, items) = first_array_field(map).unwrap();
        assert_eq!(key, "rows");
        assert_eq!(items, &vec![json!(2)]);
    }

    #[test]
    fn test_first_array_field_descends_into_objects() {
        let value = json!({"data": {"count": 1, "results": [{"handle": "@carol"}]}});
        let (key, _) = first_array_field(value.as_object().unwrap()).unwrap();
        assert_eq!(key, "results");
        assert!(first_array_field(json!({"a": 1}).as_object().unwrap()).is_none());
    }
}
