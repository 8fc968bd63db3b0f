//! Line-oriented CSV reader for agent result files.
//!
//! Agent exports are not strict RFC 4180: quotes only ever wrap a whole cell,
//! so a quote simply toggles whether `,` splits. Each physical line is one row.

use crate::domain::model::Record;
use serde_json::{Map, Value};

/// 拆解單行 CSV，引號內的逗號不分割
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(finish_field(&current));
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(finish_field(&current));

    fields
}

fn finish_field(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}

/// 解析整段 CSV 文字：第一行為標題，其後每行依位置對應成一筆 Record。
/// `max_rows` 限制資料列數（不含標題）。全空白的列會被捨棄。
pub fn parse_csv_text(text: &str, max_rows: Option<usize>) -> Vec<Record> {
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers = parse_csv_line(header_line);

    lines
        .take(max_rows.unwrap_or(usize::MAX))
        .map(|line| {
            let values = parse_csv_line(line);
            let mut data = Map::new();
            for (index, header) in headers.iter().enumerate() {
                let value = values.get(index).cloned().unwrap_or_default();
                data.insert(header.clone(), Value::String(value));
            }
            Record::new(data)
        })
        .filter(|record| !record.is_blank())
        .collect()
}
