use crate::queue::LineSender;
use logpulse_core::IngestionError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reads log lines from an async reader and pushes them onto the line queue
pub struct LineReader<R> {
    reader: R,
    source: &'static str,
}

impl LineReader<BufReader<Stdin>> {
    /// Read from the process standard input
    pub fn stdin() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            source: "stdin",
        }
    }
}

impl<R> LineReader<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Read from an injected reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            source: "reader",
        }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Start reading and push every line through the provided sender
    ///
    /// Reads until EOF, until the queue is closed, or until `cancel` fires.
    /// Trailing `\n` / `\r\n` are stripped; empty lines are kept. Invalid
    /// UTF-8 is replaced with U+FFFD rather than ending ingestion.
    /// The sender is dropped on return, which closes the queue once no
    /// other producer holds a clone.
    /// Returns the number of lines enqueued.
    pub async fn run(
        self,
        sender: LineSender,
        cancel: CancellationToken,
    ) -> Result<usize, IngestionError> {
        let source = self.source;
        let mut reader = self.reader;
        let mut buf = Vec::new();
        let mut count = 0;

        info!(source, "Starting line ingestion");

        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(source, lines_read = count, "Ingestion cancelled");
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => {
                    info!(source, lines_read = count, "End of input reached");
                    break;
                }
                Ok(_) => {
                    let line = decode_line(source, &buf);
                    buf.clear();
                    debug!(source, content = %line, "Received log line");

                    if sender.push(line).is_err() {
                        warn!(source, "Queue closed, stopping reader");
                        return Err(IngestionError::ChannelClosed);
                    }
                    count += 1;
                }
                Err(e) => {
                    warn!(source, error = %e, "Error reading input");
                    return Err(IngestionError::Read(e.to_string()));
                }
            }
        }

        Ok(count)
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8
fn decode_line(source: &str, raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

    match std::str::from_utf8(raw) {
        Ok(line) => line.to_string(),
        Err(e) => {
            warn!(source, error = %e, "Invalid UTF-8 in input line, replacing");
            String::from_utf8_lossy(raw).into_owned()
        }
    }
}
