use chrono::{DateTime, NaiveDateTime, Utc, Weekday};
use serde_json::Value;

use crate::error::EventError;

/// Формат timestamp'ов в фиде: `Mon Jan 01 00:00:00 +0000 2024`.
pub const SOURCE_FORMAT: &str = "%a %b %d %H:%M:%S +0000 %Y";

/// Канонический формат хранения: `2024-01-01 00:00:00`.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ═══════════════════════════════════════════════════════════════
//  Field extraction
// ═══════════════════════════════════════════════════════════════

/// Collect every value stored under `field` at any depth, in encounter order.
///
/// Walks objects and arrays depth-first. A matched value is itself walked
/// too, so a field nested under a field of the same name is also found.
/// The order matches the order in which the values appear in the
/// serialized form of `value`.
pub fn collect_field_values<'a>(value: &'a Value, field: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    walk(value, field, &mut out);
    out
}

fn walk<'a>(value: &'a Value, field: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == field {
                    out.push(child);
                }
                walk(child, field, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, field, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

// ═══════════════════════════════════════════════════════════════
//  TimestampNormalizer
// ═══════════════════════════════════════════════════════════════

/// Переписывает все значения поля-timestamp в сериализованном payload
/// из исходного формата в целевой.
#[derive(Debug, Clone)]
pub struct TimestampNormalizer {
    field: String,
    source_format: String,
    target_format: String,
}

impl TimestampNormalizer {
    /// Feed format → canonical format.
    pub fn new(field: impl Into<String>) -> Self {
        Self::with_formats(field, SOURCE_FORMAT, CANONICAL_FORMAT)
    }

    pub fn with_formats(
        field: impl Into<String>,
        source_format: impl Into<String>,
        target_format: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            source_format: source_format.into(),
            target_format: target_format.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Parse a raw timestamp in the source format as a UTC instant.
    ///
    /// A leading `%a` must be a weekday name but is not checked against the
    /// date: `Fri Jan 01 00:00:00 +0000 2024` is 2024-01-01.
    pub fn parse_instant(&self, raw: &str) -> Result<DateTime<Utc>, EventError> {
        let bad = |reason: String| EventError::BadTimestamp {
            value: raw.to_string(),
            reason,
        };

        let parsed = match self.source_format.strip_prefix("%a ") {
            Some(date_format) => {
                let (weekday, date) = raw
                    .split_once(' ')
                    .ok_or_else(|| bad("expected a weekday name".into()))?;
                weekday
                    .parse::<Weekday>()
                    .map_err(|_| bad(format!("unknown weekday '{weekday}'")))?;
                NaiveDateTime::parse_from_str(date, date_format)
            }
            None => NaiveDateTime::parse_from_str(raw, &self.source_format),
        };
        parsed.map(|naive| naive.and_utc()).map_err(|e| bad(e.to_string()))
    }

    /// Reformat one raw timestamp into the target format.
    pub fn reformat(&self, raw: &str) -> Result<String, EventError> {
        Ok(self.parse_instant(raw)?.format(&self.target_format).to_string())
    }

    /// Rewrite every occurrence of the field inside `text`, the compact
    /// serialized form of `payload` (`serde_json::to_string`).
    ///
    /// Each value is located as its `"field":"value"` pair, scanning forward
    /// from the end of the previous replacement, so each value replaces
    /// exactly one occurrence and neither rewritten text nor identical
    /// strings under other keys are touched. A payload without the field
    /// yields `text` unchanged.
    pub fn normalize(&self, payload: &Value, text: &str) -> Result<String, EventError> {
        let values = collect_field_values(payload, &self.field);
        if values.is_empty() {
            return Ok(text.to_string());
        }

        let key = Value::String(self.field.clone()).to_string();
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        for value in values {
            let raw = value.as_str().ok_or_else(|| EventError::NotAString {
                field: self.field.clone(),
            })?;
            let needle = format!("{key}:{}", Value::String(raw.to_string()));
            let replacement = format!("{key}:{}", Value::String(self.reformat(raw)?));

            let pos = find_unescaped(rest, &needle)
                .ok_or_else(|| EventError::OccurrenceNotFound(raw.to_string()))?;
            out.push_str(&rest[..pos]);
            out.push_str(&replacement);
            rest = &rest[pos + needle.len()..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// First occurrence of `needle` whose opening quote is a real JSON quote,
/// not an escaped `\"` inside some other key or string.
fn find_unescaped(haystack: &str, needle: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(needle) {
        let pos = from + offset;
        let backslashes = haystack.as_bytes()[..pos]
            .iter()
            .rev()
            .take_while(|&&b| b == b'\\')
            .count();
        if backslashes % 2 == 0 {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}
