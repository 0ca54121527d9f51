use crate::window::RingBuffer;
use chrono::{DateTime, Utc};
use logpulse_core::config::WindowConfig;
use logpulse_core::snapshot::percentage_of;
use logpulse_core::{
    ErrorPattern, ErrorPatternCount, ParseError, ParsedLine, Severity, SeverityShare,
    StatsSnapshot, TimestampField, WindowOccupancy,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Rolling statistics shared by the aggregator and the reporter.
///
/// One lock guards all of it.
pub type SharedStats = Arc<Mutex<RollingStats>>;

#[derive(Debug, Clone, Copy)]
struct PatternTally {
    count: u64,
    /// Order of first appearance, used to break ties
    first_seen: u64,
}

/// Rolling windows plus cumulative counters
#[derive(Debug)]
pub struct RollingStats {
    recent_timestamps: RingBuffer<DateTime<Utc>>,
    recent_lines: RingBuffer<String>,
    /// Lines in `recent_lines` containing "ERROR"
    recent_error_lines: usize,

    entries_processed: u64,
    severity_counts: [u64; 4],
    error_patterns: HashMap<String, PatternTally>,

    current_rate: f64,
    peak_rate: f64,
    error_rate: f64,
}

impl RollingStats {
    pub fn new(config: &WindowConfig) -> Self {
        Self::with_capacities(config.timestamp_capacity, config.line_capacity)
    }

    pub fn with_capacities(timestamp_capacity: usize, line_capacity: usize) -> Self {
        Self {
            recent_timestamps: RingBuffer::new(timestamp_capacity),
            recent_lines: RingBuffer::new(line_capacity),
            recent_error_lines: 0,
            entries_processed: 0,
            severity_counts: [0; 4],
            error_patterns: HashMap::new(),
            current_rate: 0.0,
            peak_rate: 0.0,
            error_rate: 0.0,
        }
    }

    /// Wrap into the shared, lock-guarded form
    pub fn shared(self) -> SharedStats {
        Arc::new(Mutex::new(self))
    }

    /// Account for one raw line.
    ///
    /// A malformed timestamp only skips the window append; the line is still
    /// counted and classified. The failure is handed back for reporting.
    pub fn record(&mut self, line: &str) -> Option<ParseError> {
        self.entries_processed += 1;

        let parsed = ParsedLine::parse(line);

        let failure = match parsed.timestamp {
            TimestampField::Parsed(ts) => {
                self.recent_timestamps.push(ts);
                self.push_line(line);
                None
            }
            TimestampField::Absent => None,
            TimestampField::Malformed(e) => Some(e),
        };

        self.severity_counts[parsed.severity.index()] += 1;

        if let Some(pattern) = parsed.error_pattern {
            if pattern == ErrorPattern::Unknown {
                debug!(line, "No error signature, bucketing as unknown");
            }
            self.count_pattern(pattern.as_str());
        }

        failure
    }

    fn push_line(&mut self, line: &str) {
        if line.contains("ERROR") {
            self.recent_error_lines += 1;
        }
        if let Some(evicted) = self.recent_lines.push(line.to_string()) {
            if evicted.contains("ERROR") {
                self.recent_error_lines -= 1;
            }
        }
    }

    fn count_pattern(&mut self, pattern: &str) {
        let next_seen = self.error_patterns.len() as u64;
        self.error_patterns
            .entry(pattern.to_string())
            .or_insert(PatternTally {
                count: 0,
                first_seen: next_seen,
            })
            .count += 1;
    }

    /// Recompute rates from the windows.
    ///
    /// Needs at least two timestamps spanning a positive duration; otherwise
    /// the previous rates are kept. `error_rate` divides the ERROR lines of
    /// the line window by the span of the timestamp window.
    pub fn recalculate_rates(&mut self) {
        if self.recent_timestamps.len() < 2 {
            return;
        }
        let (Some(first), Some(last)) = (self.recent_timestamps.first(), self.recent_timestamps.last())
        else {
            return;
        };

        let span = (*last - *first).num_milliseconds() as f64 / 1000.0;
        if span <= 0.0 {
            return;
        }

        self.current_rate = self.recent_timestamps.len() as f64 / span;
        self.peak_rate = self.peak_rate.max(self.current_rate);
        self.error_rate = self.recent_error_lines as f64 / span;
    }

    /// The `n` most frequent error patterns, ties in first-seen order
    pub fn top_errors(&self, n: usize) -> Vec<ErrorPatternCount> {
        let mut patterns: Vec<(&String, &PatternTally)> = self.error_patterns.iter().collect();
        patterns.sort_by(|(_, a), (_, b)| {
            b.count.cmp(&a.count).then(a.first_seen.cmp(&b.first_seen))
        });
        patterns
            .into_iter()
            .take(n)
            .map(|(pattern, tally)| ErrorPatternCount {
                pattern: pattern.clone(),
                count: tally.count,
            })
            .collect()
    }

    /// Copy everything a report needs. Does not recompute rates.
    pub fn snapshot(&self, top_n: usize, sliding_window_seconds: u64) -> StatsSnapshot {
        let total = self.entries_processed;
        let severities = Severity::ALL
            .iter()
            .map(|&severity| {
                let count = self.severity_count(severity);
                SeverityShare {
                    severity,
                    count,
                    percentage: percentage_of(count, total),
                }
            })
            .collect();

        StatsSnapshot {
            generated_at: Utc::now(),
            entries_processed: total,
            current_rate: self.current_rate,
            peak_rate: self.peak_rate,
            error_rate: self.error_rate,
            severities,
            top_errors: self.top_errors(top_n),
            window: WindowOccupancy {
                timestamps: self.recent_timestamps.len(),
                lines: self.recent_lines.len(),
            },
            sliding_window_seconds,
        }
    }

    pub fn entries_processed(&self) -> u64 {
        self.entries_processed
    }

    pub fn severity_count(&self, severity: Severity) -> u64 {
        self.severity_counts[severity.index()]
    }

    pub fn error_pattern_count(&self, pattern: &str) -> u64 {
        self.error_patterns.get(pattern).map(|t| t.count).unwrap_or(0)
    }

    /// Number of distinct error patterns seen
    pub fn error_pattern_kinds(&self) -> usize {
        self.error_patterns.len()
    }

    pub fn current_rate(&self) -> f64 {
        self.current_rate
    }

    pub fn peak_rate(&self) -> f64 {
        self.peak_rate
    }

    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    pub fn recent_timestamps(&self) -> &RingBuffer<DateTime<Utc>> {
        &self.recent_timestamps
    }

    pub fn recent_lines(&self) -> &RingBuffer<String> {
        &self.recent_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logpulse_core::UNKNOWN_ERROR_PATTERN;

    fn stats() -> RollingStats {
        RollingStats::new(&WindowConfig::default())
    }

    fn at(second: u32) -> String {
        format!("[2024-01-01T00:00:{:02}Z]", second)
    }

    #[test]
    fn test_reference_scenario() {
        let mut stats = stats();
        for line in [
            "[2024-01-01T00:00:00Z] INFO hello",
            "[2024-01-01T00:00:01Z] ERROR: disk_full on /data",
            "not a log line",
        ] {
            assert!(stats.record(line).is_none());
        }

        assert_eq!(stats.entries_processed(), 3);
        assert_eq!(stats.severity_count(Severity::Info), 1);
        assert_eq!(stats.severity_count(Severity::Error), 1);
        assert_eq!(stats.severity_count(Severity::Other), 1);
        assert_eq!(stats.severity_count(Severity::Debug), 0);
        assert_eq!(stats.error_pattern_count("disk_full"), 1);
        assert_eq!(stats.error_pattern_kinds(), 1);

        stats.recalculate_rates();
        assert_eq!(stats.current_rate(), 2.0);
        assert_eq!(stats.peak_rate(), 2.0);
        assert_eq!(stats.error_rate(), 1.0);
    }

    #[test]
    fn test_untimestamped_lines_skip_windows() {
        let mut stats = stats();
        stats.record("INFO no timestamp here");
        stats.record("");

        assert_eq!(stats.entries_processed(), 2);
        assert!(stats.recent_timestamps().is_empty());
        assert!(stats.recent_lines().is_empty());
        assert_eq!(stats.severity_count(Severity::Other), 1);
    }

    #[test]
    fn test_malformed_timestamp_still_counted() {
        let mut stats = stats();
        let failure = stats.record("[not-a-time] ERROR: oops");

        assert!(matches!(failure, Some(ParseError::Timestamp { .. })));
        assert_eq!(stats.entries_processed(), 1);
        assert_eq!(stats.severity_count(Severity::Error), 1);
        assert_eq!(stats.error_pattern_count("oops"), 1);
        assert!(stats.recent_timestamps().is_empty());
        assert!(stats.recent_lines().is_empty());
    }

    #[test]
    fn test_unknown_error_bucket() {
        let mut stats = stats();
        stats.record("ERROR happened somewhere");
        stats.record("FATAL ERROR");

        assert_eq!(stats.error_pattern_count(UNKNOWN_ERROR_PATTERN), 2);
    }

    #[test]
    fn test_windows_respect_capacities() {
        let mut stats = RollingStats::with_capacities(3, 5);
        for second in 0..10 {
            stats.record(&format!("{} INFO tick", at(second)));
        }

        assert_eq!(stats.recent_timestamps().len(), 3);
        assert_eq!(stats.recent_lines().len(), 5);
        assert_eq!(stats.entries_processed(), 10);
        assert!(stats.recent_lines().first().unwrap().starts_with(&at(5)));
    }

    #[test]
    fn test_error_count_follows_eviction() {
        let mut stats = RollingStats::with_capacities(10, 2);
        stats.record(&format!("{} ERROR: first", at(0)));
        stats.record(&format!("{} INFO ok", at(1)));
        stats.record(&format!("{} INFO ok", at(2)));

        // The only ERROR line has been evicted from the line window
        stats.recalculate_rates();
        assert_eq!(stats.error_rate(), 0.0);
        assert_eq!(stats.current_rate(), 1.5);
    }

    #[test]
    fn test_rates_need_two_timestamps() {
        let mut stats = stats();
        stats.record(&format!("{} INFO alone", at(0)));
        stats.recalculate_rates();
        assert_eq!(stats.current_rate(), 0.0);
        assert_eq!(stats.peak_rate(), 0.0);
    }

    #[test]
    fn test_zero_span_keeps_previous_rates() {
        let mut stats = stats();
        stats.record(&format!("{} INFO a", at(0)));
        stats.record(&format!("{} INFO b", at(0)));
        stats.recalculate_rates();
        assert_eq!(stats.current_rate(), 0.0);
    }

    #[test]
    fn test_recalculation_is_idempotent() {
        let mut stats = stats();
        for second in [0, 1, 1, 3] {
            stats.record(&format!("{} ERROR: burst", at(second)));
        }

        stats.recalculate_rates();
        let (rate, errors) = (stats.current_rate(), stats.error_rate());
        stats.recalculate_rates();
        assert_eq!(stats.current_rate(), rate);
        assert_eq!(stats.error_rate(), errors);
    }

    #[test]
    fn test_peak_rate_is_monotonic() {
        let mut stats = RollingStats::with_capacities(4, 100);
        let mut last_peak = 0.0;

        // Dense burst, then sparse traffic lowers the current rate
        for second in [0, 0, 0, 1, 10, 20, 30, 40, 50] {
            stats.record(&format!("{} INFO x", at(second)));
            stats.recalculate_rates();
            assert!(stats.peak_rate() >= last_peak);
            assert!(stats.peak_rate() >= stats.current_rate());
            last_peak = stats.peak_rate();
        }
        assert!(stats.current_rate() < stats.peak_rate());
    }

    #[test]
    fn test_top_errors_ordering() {
        let mut stats = stats();
        for line in [
            "ERROR: timeout",
            "ERROR: refused",
            "ERROR: disk_full",
            "ERROR: refused",
            "ERROR: disk_full",
            "ERROR: oom",
        ] {
            stats.record(line);
        }

        let top = stats.top_errors(3);
        let names: Vec<_> = top.iter().map(|e| e.pattern.as_str()).collect();
        // refused and disk_full tie at 2; refused was seen first
        assert_eq!(names, vec!["refused", "disk_full", "timeout"]);
        assert_eq!(top[0].count, 2);
        assert_eq!(top[2].count, 1);
    }

    #[test]
    fn test_snapshot_percentages() {
        let mut stats = stats();
        for line in ["ERROR: a", "INFO b", "INFO c", "DEBUG d", "other"] {
            stats.record(line);
        }

        let snapshot = stats.snapshot(3, 60);
        assert_eq!(snapshot.entries_processed, 5);
        assert_eq!(snapshot.severity(Severity::Error).percentage, 20);
        assert_eq!(snapshot.severity(Severity::Info).percentage, 40);
        assert_eq!(snapshot.severity(Severity::Debug).percentage, 20);
        assert_eq!(snapshot.severity(Severity::Other).percentage, 20);

        let sum: u64 = snapshot.severities.iter().map(|s| s.percentage).sum();
        assert!(sum <= 100);
        assert_eq!(snapshot.sliding_window_seconds, 60);
    }

    #[test]
    fn test_snapshot_percentages_round_each_share() {
        let mut thirds = stats();
        for line in ["ERROR: a", "INFO b", "DEBUG c"] {
            thirds.record(line);
        }
        let snapshot = thirds.snapshot(3, 60);
        assert!(snapshot.severities[..3].iter().all(|s| s.percentage == 33));
        let sum: u64 = snapshot.severities.iter().map(|s| s.percentage).sum();
        assert_eq!(sum, 99);

        // 1/8 and 3/8 sit exactly on .5 and all round up
        let mut halves = stats();
        for line in ["ERROR: a", "INFO b", "DEBUG c", "DEBUG d", "DEBUG e", "x", "y", "z"] {
            halves.record(line);
        }
        let snapshot = halves.snapshot(3, 60);
        assert_eq!(snapshot.severity(Severity::Error).percentage, 13);
        assert_eq!(snapshot.severity(Severity::Info).percentage, 13);
        assert_eq!(snapshot.severity(Severity::Debug).percentage, 38);
        assert_eq!(snapshot.severity(Severity::Other).percentage, 38);
        let sum: u64 = snapshot.severities.iter().map(|s| s.percentage).sum();
        assert_eq!(sum, 102);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = stats().snapshot(3, 60);
        assert_eq!(snapshot.entries_processed, 0);
        assert_eq!(snapshot.current_rate, 0.0);
        assert_eq!(snapshot.peak_rate, 0.0);
        assert!(snapshot.top_errors.is_empty());
        assert!(snapshot.severities.iter().all(|s| s.count == 0 && s.percentage == 0));
    }
}
