//! Cross-stream filtering and pagination
//!
//! Both backends answer queries the same way: merge the two streams, filter,
//! sort newest first, then slice the requested page.

use serde::{Deserialize, Serialize};
use swipe_diag_core::{LogEntry, LogLevel};
use uuid::Uuid;

/// Page size used when the caller does not pick one
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Filter and page selection for a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    /// Admit only these levels; an empty set does not filter
    pub levels: Option<Vec<LogLevel>>,
    /// Case-insensitive substring of the event name
    pub event: Option<String>,
    /// Inclusive lower bound (ISO-8601)
    pub start_time: Option<String>,
    /// Inclusive upper bound (ISO-8601)
    pub end_time: Option<String>,
    /// Exact session id
    pub session_id: Option<Uuid>,
    /// Exact `correlationId` context value
    pub correlation_id: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            levels: None,
            event: None,
            start_time: None,
            end_time: None,
            session_id: None,
            correlation_id: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_levels(mut self, levels: impl IntoIterator<Item = LogLevel>) -> Self {
        self.levels = Some(levels.into_iter().collect());
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn since(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    pub fn until(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = Some(end_time.into());
        self
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Whether a single entry passes every filter
    pub fn matches(&self, entry: &LogEntry) -> bool {
        EntryFilter::new(self).matches(entry)
    }

    /// Filter, sort newest first and paginate
    pub fn apply(&self, entries: impl IntoIterator<Item = LogEntry>) -> QueryResult {
        let filter = EntryFilter::new(self);

        let mut matched: Vec<LogEntry> = entries
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .collect();

        // Stable, so equal timestamps keep their merge order
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total = matched.len();
        let entries: Vec<LogEntry> = matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();

        QueryResult {
            entries,
            total,
            has_more: self.offset.saturating_add(self.limit) < total,
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Matching entries on this page, newest first
    pub entries: Vec<LogEntry>,
    /// Number of entries matching the filters across all pages
    pub total: usize,
    /// Whether entries remain beyond this page
    pub has_more: bool,
}

/// Query options with the event needle lowercased once
struct EntryFilter<'a> {
    options: &'a QueryOptions,
    event_needle: Option<String>,
}

impl<'a> EntryFilter<'a> {
    fn new(options: &'a QueryOptions) -> Self {
        Self {
            options,
            event_needle: options.event.as_ref().map(|e| e.to_lowercase()),
        }
    }

    fn matches(&self, entry: &LogEntry) -> bool {
        let opts = self.options;

        if let Some(levels) = &opts.levels
            && !levels.is_empty()
            && !levels.contains(&entry.level)
        {
            return false;
        }

        if let Some(needle) = &self.event_needle
            && !entry.event.to_lowercase().contains(needle.as_str())
        {
            return false;
        }

        if let Some(start) = &opts.start_time
            && entry.timestamp.as_str() < start.as_str()
        {
            return false;
        }

        if let Some(end) = &opts.end_time
            && entry.timestamp.as_str() > end.as_str()
        {
            return false;
        }

        if let Some(session_id) = opts.session_id
            && entry.session_id != session_id
        {
            return false;
        }

        if let Some(correlation_id) = &opts.correlation_id
            && entry.correlation_id() != Some(correlation_id.as_str())
        {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swipe_diag_core::{CORRELATION_ID_KEY, ContextMap, Device, SessionContext, context};

    fn entry(
        ts: &str,
        level: LogLevel,
        event: &str,
        ctx: ContextMap,
        session: &SessionContext,
    ) -> LogEntry {
        LogEntry::at(ts, level, event, ctx, session)
    }

    fn sample() -> (Vec<LogEntry>, SessionContext, SessionContext) {
        let a = SessionContext::new("1.0.0", Device::Web);
        let b = SessionContext::new("1.0.0", Device::Web);
        let entries = vec![
            entry("2024-01-01T00:00:01.000Z", LogLevel::Debug, "APP_START", context! {}, &a),
            entry(
                "2024-01-01T00:00:02.000Z",
                LogLevel::Info,
                "AUTH_LOGIN",
                context! { CORRELATION_ID_KEY => "op-1" },
                &a,
            ),
            entry(
                "2024-01-01T00:00:03.000Z",
                LogLevel::Error,
                "AUTH_LOGIN_FAILED",
                context! { CORRELATION_ID_KEY => "op-1" },
                &a,
            ),
            entry("2024-01-01T00:00:04.000Z", LogLevel::Warn, "FORM_SLOW", context! {}, &b),
            entry(
                "2024-01-01T00:00:05.000Z",
                LogLevel::Audit,
                "USER_DATA_EXPORTED",
                context! {},
                &b,
            ),
        ];
        (entries, a, b)
    }

    #[test]
    fn test_newest_first() {
        let (entries, _, _) = sample();
        let result = QueryOptions::new().apply(entries);
        assert_eq!(result.total, 5);
        assert!(!result.has_more);
        let stamps: Vec<_> = result.entries.iter().map(|e| e.timestamp.as_str()).collect();
        assert_eq!(
            stamps,
            vec![
                "2024-01-01T00:00:05.000Z",
                "2024-01-01T00:00:04.000Z",
                "2024-01-01T00:00:03.000Z",
                "2024-01-01T00:00:02.000Z",
                "2024-01-01T00:00:01.000Z",
            ]
        );
    }

    #[test]
    fn test_level_filter() {
        let (entries, _, _) = sample();
        let result = QueryOptions::new()
            .with_levels([LogLevel::Error, LogLevel::Audit])
            .apply(entries);
        assert_eq!(result.total, 2);
        assert_eq!(result.entries[0].level, LogLevel::Audit);
        assert_eq!(result.entries[1].level, LogLevel::Error);
    }

    #[test]
    fn test_empty_level_set_does_not_filter() {
        let (entries, _, _) = sample();
        let options: QueryOptions = serde_json::from_str(r#"{"levels":[]}"#).unwrap();
        assert_eq!(options.levels, Some(Vec::new()));
        assert_eq!(options.apply(entries).total, 5);
    }

    #[test]
    fn test_event_substring_case_insensitive() {
        let (entries, _, _) = sample();
        let result = QueryOptions::new().with_event("auth_login").apply(entries);
        assert_eq!(result.total, 2);
    }

    #[test]
    fn test_time_range_inclusive() {
        let (entries, _, _) = sample();
        let result = QueryOptions::new()
            .since("2024-01-01T00:00:02.000Z")
            .until("2024-01-01T00:00:04.000Z")
            .apply(entries);
        assert_eq!(result.total, 3);
    }

    #[test]
    fn test_session_and_correlation() {
        let (entries, a, b) = sample();

        let by_session = QueryOptions::new().with_session(b.session_id()).apply(entries.clone());
        assert_eq!(by_session.total, 2);

        let by_correlation = QueryOptions::new()
            .with_session(a.session_id())
            .with_correlation_id("op-1")
            .apply(entries);
        assert_eq!(by_correlation.total, 2);
        assert!(by_correlation.entries.iter().all(|e| e.correlation_id() == Some("op-1")));
    }

    #[test]
    fn test_pagination_arithmetic() {
        let (entries, _, _) = sample();
        let n = entries.len();

        for limit in 0..=6 {
            for offset in 0..=7 {
                let result = QueryOptions::new().page(limit, offset).apply(entries.clone());
                let expected = limit.min(n.saturating_sub(offset));
                assert_eq!(result.entries.len(), expected, "limit={limit} offset={offset}");
                assert_eq!(result.has_more, offset + limit < n, "limit={limit} offset={offset}");
                assert_eq!(result.total, n);
            }
        }
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: QueryOptions =
            serde_json::from_str(r#"{"levels":["error"],"offset":20}"#).unwrap();
        assert_eq!(options.levels, Some(vec![LogLevel::Error]));
        assert_eq!(options.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(options.offset, 20);
    }
}
