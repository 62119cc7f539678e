//! Capture writer producing `.s3g` files.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::trace;

use super::{Result, Writer};

/// Appends raw action payloads to a byte sink.
///
/// Capture files hold bare payloads, one after another, with no packet
/// framing. Queries need a device to answer them and are not supported.
#[derive(Debug)]
pub struct FileWriter<W: Write> {
    out: W,
    open: bool,
    bytes_written: u64,
}

impl FileWriter<BufWriter<File>> {
    /// Create (truncating) a capture file.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> FileWriter<W> {
    /// Capture into `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            open: true,
            bytes_written: 0,
        }
    }

    /// Payload bytes captured so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and give the sink back.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> Writer for FileWriter<W> {
    fn send_action_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.out.write_all(payload)?;
        self.bytes_written += payload.len() as u64;
        trace!(len = payload.len(), "captured payload");
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> Result<bool> {
        Ok(self.open)
    }
}
