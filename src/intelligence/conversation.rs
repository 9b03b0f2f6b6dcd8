//! Conversation grouping
//!
//! Saves from the same page inside one time bucket share a conversation id.
//! A later save whose id matches a record created within the merge window is
//! appended to that record instead of creating a new one.

use chrono::{DateTime, Duration, Utc};

use crate::types::{Analysis, MemoryRecord, FACT_MEMORY_TYPE};

/// Separator placed between merged content fragments
pub const MERGE_SEPARATOR: &str = "\n\n";

/// Default conversation bucket and merge window
pub const DEFAULT_WINDOW_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy)]
pub struct ConversationGrouper {
    window: Duration,
}

impl Default for ConversationGrouper {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_WINDOW_MINUTES))
    }
}

impl ConversationGrouper {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// `url` followed by the index of the current window bucket
    pub fn conversation_id(&self, url: &str, now: DateTime<Utc>) -> String {
        let window_ms = self.window.num_milliseconds().max(1);
        format!("{}{}", url, now.timestamp_millis().div_euclid(window_ms))
    }

    /// Index of a record in the same conversation touched within the window
    ///
    /// Extracted facts stand alone and are never merge targets.
    pub fn find_merge_target(
        &self,
        conversation_id: &str,
        corpus: &[MemoryRecord],
        now: DateTime<Utc>,
    ) -> Option<usize> {
        corpus.iter().position(|record| {
            record.conversation_id == conversation_id
                && record.memory_type != FACT_MEMORY_TYPE
                && now.signed_duration_since(record.timestamp) <= self.window
        })
    }

    /// Append `new_content` and replace derived metadata with `analysis`
    ///
    /// `analysis` must describe the full merged content, see [`merged_content`].
    pub fn merge_into(
        &self,
        record: &mut MemoryRecord,
        new_content: &str,
        analysis: Analysis,
        now: DateTime<Utc>,
    ) {
        record.content = merged_content(&record.content, new_content);
        record.timestamp = now;
        record.last_updated = Some(now);
        record.category = analysis.category;
        record.summary = analysis.summary;
        record.tags = analysis.tags;
    }
}

/// Content a record holds after absorbing `new_content`
pub fn merged_content(existing: &str, new_content: &str) -> String {
    format!("{}{}{}", existing, MERGE_SEPARATOR, new_content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, SaveContext};
    use chrono::TimeZone;

    const URL: &str = "https://chat.openai.com/c/abc";

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn record(conversation_id: &str, created: DateTime<Utc>) -> MemoryRecord {
        MemoryRecord::new(
            "first part",
            &SaveContext::new("chat.openai.com", URL),
            conversation_id,
            Analysis::default(),
            created,
        )
    }

    #[test]
    fn test_conversation_id_buckets() {
        let grouper = ConversationGrouper::default();
        assert_eq!(
            grouper.conversation_id(URL, at(1_800_000 * 5 + 10)),
            format!("{}5", URL)
        );
        assert_eq!(
            grouper.conversation_id(URL, at(1_800_000 * 6 - 1)),
            format!("{}5", URL)
        );
        assert_eq!(
            grouper.conversation_id(URL, at(1_800_000 * 6)),
            format!("{}6", URL)
        );
    }

    #[test]
    fn test_merge_target_within_window() {
        let grouper = ConversationGrouper::default();
        let created = at(1_800_000 * 100);
        let id = grouper.conversation_id(URL, created);
        let corpus = vec![record("other", created), record(&id, created)];

        let now = created + Duration::minutes(30);
        assert_eq!(grouper.find_merge_target(&id, &corpus, now), Some(1));

        let later = created + Duration::minutes(31);
        assert_eq!(grouper.find_merge_target(&id, &corpus, later), None);
    }

    #[test]
    fn test_facts_are_not_merge_targets() {
        let grouper = ConversationGrouper::default();
        let created = at(1_800_000 * 100);
        let id = grouper.conversation_id(URL, created);
        let mut fact = record(&id, created);
        fact.memory_type = FACT_MEMORY_TYPE.to_string();
        let corpus = vec![fact, record(&id, created - Duration::minutes(1))];

        let now = created + Duration::minutes(1);
        assert_eq!(grouper.find_merge_target(&id, &corpus, now), Some(1));
        assert_eq!(grouper.find_merge_target(&id, &corpus[..1], now), None);
    }

    #[test]
    fn test_merge_into_appends_and_refreshes() {
        let grouper = ConversationGrouper::default();
        let created = at(1_000);
        let mut rec = record("conv", created);
        let original_id = rec.id.clone();
        let now = created + Duration::minutes(5);

        grouper.merge_into(
            &mut rec,
            "second part",
            Analysis {
                category: Category::Example,
                summary: "merged".to_string(),
                tags: vec!["tag".to_string()],
            },
            now,
        );

        assert_eq!(rec.id, original_id);
        assert_eq!(rec.content, "first part\n\nsecond part");
        assert_eq!(rec.timestamp, now);
        assert_eq!(rec.last_updated, Some(now));
        assert_eq!(rec.category, Category::Example);
        assert_eq!(rec.summary, "merged");
        assert_eq!(rec.tags, vec!["tag".to_string()]);
    }
}
