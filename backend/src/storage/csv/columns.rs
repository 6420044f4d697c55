//! Column encodings shared by the CSV row types.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamps are stored as RFC 3339 with millisecond precision
pub fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid {} timestamp '{}'", column, value))?;
    Ok(parsed.with_timezone(&Utc))
}

/// List-valued fields are stored as a JSON array inside one column
pub fn encode_list(values: &[String]) -> Result<String> {
    Ok(serde_json::to_string(values)?)
}

pub fn decode_list(column: &str, value: &str) -> Result<Vec<String>> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(value).with_context(|| format!("Invalid {} list '{}'", column, value))
}
