use crate::application::broadcast::StreamUpdate;
use crate::error::Result;
use std::io::Write;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// Writes stream updates as JSON lines.
///
/// Each update is flushed on its own so a downstream reader (e.g. `jq`)
/// sees it as soon as the loop publishes it.
pub struct UpdateWriter<W: Write> {
    writer: W,
}

impl<W: Write> UpdateWriter<W> {
    /// Creates a new `UpdateWriter` over any `Write` sink (e.g. Stdout, File).
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_update(&mut self, update: &StreamUpdate) -> Result<()> {
        serde_json::to_writer(&mut self.writer, update)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes every update received until the broadcast channel closes.
    /// Returns the number of updates written. Lagged updates are skipped.
    pub async fn drain(mut self, mut updates: broadcast::Receiver<StreamUpdate>) -> Result<u64> {
        let mut written = 0;
        loop {
            match updates.recv().await {
                Ok(update) => {
                    self.write_update(&update)?;
                    written += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Output fell behind, updates dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        Ok(written)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
