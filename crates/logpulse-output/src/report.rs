use async_trait::async_trait;
use logpulse_core::{OutputError, ReportFormat, ReportSink, Severity, StatsSnapshot};
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tracing::debug;

const DIVIDER_WIDTH: usize = 70;
const DIVIDER_CHAR: char = '━';

/// Window length every adaptive window is measured against
const BASE_WINDOW_SECONDS: u64 = 60;

/// Renders statistics snapshots to an async writer
pub struct ReportWriter<W> {
    format: ReportFormat,
    writer: W,
}

impl ReportWriter<Stdout> {
    /// Write text reports to stdout
    pub fn stdout() -> Self {
        Self::with_format(tokio::io::stdout(), ReportFormat::default())
    }

    /// Write reports to stdout in a specific format
    pub fn stdout_with_format(format: ReportFormat) -> Self {
        Self::with_format(tokio::io::stdout(), format)
    }
}

impl<W> ReportWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn with_format(writer: W, format: ReportFormat) -> Self {
        Self { format, writer }
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Write a single snapshot
    pub async fn write(&mut self, snapshot: &StatsSnapshot) -> Result<(), OutputError> {
        let output = self.render(snapshot)?;

        self.writer
            .write_all(output.as_bytes())
            .await
            .map_err(|e| OutputError::Write(e.to_string()))?;

        self.writer
            .flush()
            .await
            .map_err(|e| OutputError::Write(e.to_string()))?;

        debug!(format = ?self.format, bytes = output.len(), "Wrote report");
        Ok(())
    }

    /// Render a snapshot according to the output format
    pub fn render(&self, snapshot: &StatsSnapshot) -> Result<String, OutputError> {
        match self.format {
            ReportFormat::Text => Ok(format_text(snapshot)),
            ReportFormat::Json => serde_json::to_string(snapshot)
                .map(|mut line| {
                    line.push('\n');
                    line
                })
                .map_err(|e| OutputError::Serialization(e.to_string())),
        }
    }

    /// Consume the writer, returning the underlying sink
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> ReportSink for ReportWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &'static str {
        match self.format {
            ReportFormat::Text => "text",
            ReportFormat::Json => "json",
        }
    }

    async fn emit(&mut self, snapshot: &StatsSnapshot) -> Result<(), OutputError> {
        self.write(snapshot).await
    }
}

/// Human-readable report block, terminated by a blank line
pub fn format_text(snapshot: &StatsSnapshot) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Log Analysis Report (Last Updated: {} UTC)",
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    lines.push(DIVIDER_CHAR.to_string().repeat(DIVIDER_WIDTH));

    lines.push("Runtime Stats:".to_string());
    lines.push(format!(
        "Entries processed: {}",
        with_thousands(snapshot.entries_processed)
    ));
    lines.push(format!(
        "Current rate: {:.0} entries/sec (Peak: {:.0} entries/sec)",
        snapshot.current_rate, snapshot.peak_rate
    ));
    lines.push(format!(
        "Adaptive Window: {} seconds (Adjusted from {} seconds)",
        snapshot.sliding_window_seconds, BASE_WINDOW_SECONDS
    ));
    lines.push(String::new());

    lines.push("Pattern Analysis:".to_string());
    for severity in [Severity::Error, Severity::Info, Severity::Debug] {
        let share = snapshot.severity(severity);
        lines.push(format!(
            "{}: {}% ({} entries)",
            severity,
            share.percentage,
            with_thousands(share.count)
        ));
    }
    lines.push(String::new());

    lines.push("Top Errors:".to_string());
    if snapshot.top_errors.is_empty() {
        lines.push("(none)".to_string());
    } else {
        for (rank, error) in snapshot.top_errors.iter().enumerate() {
            lines.push(format!(
                "{}. {} ({} occurrences)",
                rank + 1,
                error.pattern,
                with_thousands(error.count)
            ));
        }
    }
    lines.push(String::new());

    let mut block = lines.join("\n");
    block.push('\n');
    block
}

/// `1234567` -> `1,234,567`
pub fn with_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
