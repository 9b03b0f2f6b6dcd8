//! Pre-scoring filters
//!
//! Filters narrow the corpus before TF-IDF runs, so document frequencies are
//! computed over the filtered subset only.

use crate::types::{MemoryRecord, SearchFilters};

impl SearchFilters {
    /// Check a single record against every active filter
    pub fn matches(&self, record: &MemoryRecord) -> bool {
        if let Some(category) = self.category {
            if record.category != category {
                return false;
            }
        }

        if let Some(ref source) = self.source {
            if !record
                .source
                .to_lowercase()
                .contains(&source.to_lowercase())
            {
                return false;
            }
        }

        if let Some(from) = self.date_from {
            if record.timestamp < from {
                return false;
            }
        }

        if let Some(to) = self.date_to {
            if record.timestamp > to {
                return false;
            }
        }

        if !self.tags.is_empty() {
            let record_tags: Vec<String> = record.tags.iter().map(|t| t.to_lowercase()).collect();
            let all_present = self
                .tags
                .iter()
                .all(|wanted| record_tags.contains(&wanted.to_lowercase()));
            if !all_present {
                return false;
            }
        }

        true
    }
}

/// Apply filters, preserving corpus order
pub fn apply_filters<'a>(
    records: &'a [MemoryRecord],
    filters: &SearchFilters,
) -> Vec<&'a MemoryRecord> {
    if filters.is_empty() {
        return records.iter().collect();
    }
    records.iter().filter(|r| filters.matches(r)).collect()
}
