//! Export and import codecs
//!
//! Export renders the collection as JSON, CSV or plain text. Import accepts
//! only the JSON form and validates the whole payload before anything is
//! applied.

use std::collections::HashSet;

use crate::error::{LocalBrainError, Result};
use crate::types::{ExportFormat, MemoryRecord};

/// CSV header row
pub const CSV_HEADER: &str = "id,content,timestamp,source,url,category,summary,tags";

/// Render records in the requested format
pub fn export_records(records: &[MemoryRecord], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => to_json(records),
        ExportFormat::Csv => Ok(to_csv(records)),
        ExportFormat::Text => Ok(to_text(records)),
    }
}

/// Pretty-printed JSON array of full records
pub fn to_json(records: &[MemoryRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// One header line plus one line per record, every field quoted
pub fn to_csv(records: &[MemoryRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADER.to_string());

    for record in records {
        let fields = [
            record.id.clone(),
            record.content.clone(),
            record.timestamp.to_rfc3339(),
            record.source.clone(),
            record.url.clone(),
            record.category.to_string(),
            record.summary.clone(),
            record.tags.join(";"),
        ];
        lines.push(
            fields
                .iter()
                .map(|f| csv_field(f))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}

/// Human-readable blocks separated by a blank line
pub fn to_text(records: &[MemoryRecord]) -> String {
    records
        .iter()
        .map(|record| {
            let mut block = format!(
                "=== Memory {} ===\nDate: {}\nSource: {}\nCategory: {}\nTags: {}\nURL: {}\n\n{}",
                record.id,
                record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                record.source,
                record.category,
                record.tags.join(", "),
                record.url,
                record.content,
            );
            if !record.summary.is_empty() {
                block.push_str("\nSummary: ");
                block.push_str(&record.summary);
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Decode and validate an import payload
///
/// The payload must be a JSON array of objects, each with a string `id`, a
/// string `content` and a parsable `timestamp`. Any violation rejects the
/// whole payload. Repeated ids keep their first occurrence.
pub fn parse_import(data: &str) -> Result<Vec<MemoryRecord>> {
    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| LocalBrainError::InvalidImport(format!("not valid JSON: {}", e)))?;

    let items = value.as_array().ok_or_else(|| {
        LocalBrainError::InvalidImport("expected a JSON array of memories".to_string())
    })?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let object = item.as_object().ok_or_else(|| {
            LocalBrainError::InvalidImport(format!("entry {} is not an object", index))
        })?;

        for field in ["id", "content"] {
            if !object.get(field).map(|v| v.is_string()).unwrap_or(false) {
                return Err(LocalBrainError::InvalidImport(format!(
                    "entry {} is missing string field `{}`",
                    index, field
                )));
            }
        }
        if !object.contains_key("timestamp") {
            return Err(LocalBrainError::InvalidImport(format!(
                "entry {} is missing `timestamp`",
                index
            )));
        }

        let record: MemoryRecord = serde_json::from_value(item.clone())
            .map_err(|e| LocalBrainError::InvalidImport(format!("entry {}: {}", index, e)))?;

        if seen.insert(record.id.clone()) {
            records.push(record);
        } else {
            tracing::debug!(id = %record.id, "Duplicate id in import payload, keeping first");
        }
    }

    Ok(records)
}
