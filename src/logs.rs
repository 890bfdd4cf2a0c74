//! Log capture.
//!
//! Engine output is collected in memory while the run executes and uploaded
//! as one blob when the run ends. Incremental streaming is disabled.

use crate::error::UploadError;
use crate::upload::HttpPut;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Append-only, ordered chunk buffer. Clones share the same chunks.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl LogBuffer {
    fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        self.chunks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn chunk_count(&self) -> usize {
        self.lock().len()
    }

    /// All chunks concatenated in write order.
    pub fn contents(&self) -> Vec<u8> {
        self.lock().concat()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Duplicates every write to all sinks, in order.
#[derive(Default)]
pub struct Tee {
    sinks: Vec<Box<dyn Write + Send>>,
}

impl Tee {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl Write + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in &mut self.sinks {
            sink.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

/// Buffers the run's log and uploads it once.
pub struct LogUploadAdapter {
    url: Option<String>,
    token: Option<String>,
    buffer: LogBuffer,
    client: HttpPut,
}

impl LogUploadAdapter {
    pub fn new(url: Option<String>, token: Option<String>, client: HttpPut) -> Self {
        Self {
            url,
            token,
            buffer: LogBuffer::default(),
            client,
        }
    }

    /// A writer appending to this adapter's buffer.
    pub fn sink(&self) -> LogBuffer {
        self.buffer.clone()
    }

    /// Upload everything written so far as a single PUT.
    ///
    /// Consumes the adapter, so the log is sent at most once.
    pub fn flush(self) -> Result<(), UploadError> {
        let Some(url) = self.url else {
            log::warn!("No log upload URL configured, discarding captured logs");
            return Ok(());
        };

        let payload = self.buffer.contents();
        log::info!(
            "Uploading logs ({} chunks, {} bytes)",
            self.buffer.chunk_count(),
            payload.len()
        );

        self.client
            .put(&url, &payload, self.token.as_deref())
            .map_err(|source| UploadError::LogUploadFailed { url, source })
    }
}
