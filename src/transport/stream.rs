//! Packet writer over a byte stream.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, instrument, trace, warn};

use super::packet::{PacketDecoder, PacketError, encode_packet};
use super::{Result, TransportError, Writer};
use crate::protocol::check_status;

/// Retry and timeout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Attempts per payload before giving up.
    pub max_retries: u32,
    /// How long to wait for a complete response.
    pub timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            timeout: Duration::from_millis(200),
        }
    }
}

/// Counters kept by a [`StreamWriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Packets written, resends included.
    pub packets_sent: u64,
    /// Responses accepted.
    pub responses: u64,
    /// Resends after a retryable failure.
    pub retries: u64,
    /// Response waits that timed out.
    pub timeouts: u64,
    /// Responses dropped for a bad CRC.
    pub crc_errors: u64,
}

/// Frames payloads onto a stream and waits for each response.
///
/// Generic packet errors, buffer overflows, CRC mismatches (either
/// direction) and timeouts are retried up to
/// [`max_retries`](WriterConfig::max_retries) attempts. Every other device
/// status is returned as [`TransportError::Device`].
#[derive(Debug)]
pub struct StreamWriter<T> {
    stream: T,
    config: WriterConfig,
    decoder: PacketDecoder,
    stats: WriterStats,
    open: bool,
}

impl<T: Read + Write> StreamWriter<T> {
    /// Wrap an already-open stream with the default policy.
    pub fn new(stream: T) -> Self {
        Self::with_config(stream, WriterConfig::default())
    }

    /// Wrap an already-open stream.
    pub fn with_config(stream: T, config: WriterConfig) -> Self {
        Self {
            stream,
            config,
            decoder: PacketDecoder::new(),
            stats: WriterStats::default(),
            open: true,
        }
    }

    /// Policy in use.
    #[must_use]
    pub const fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// Borrow the stream.
    pub const fn get_ref(&self) -> &T {
        &self.stream
    }

    /// Give the stream back.
    pub fn into_inner(self) -> T {
        self.stream
    }

    #[instrument(level = "debug", skip(self, payload), fields(len = payload.len()))]
    fn send_command(&mut self, payload: &[u8]) -> Result<Bytes> {
        let packet = encode_packet(payload)?;
        let attempts = self.config.max_retries.max(1);

        for attempt in 1..=attempts {
            self.stream.write_all(&packet)?;
            self.stream.flush()?;
            self.stats.packets_sent += 1;

            match self.read_response() {
                Ok(response) => {
                    self.stats.responses += 1;
                    debug!(attempt, status = response.first().copied(), "response received");
                    return Ok(response);
                }
                Err(err) if err.is_retryable() => {
                    warn!(attempt, error = %err, "retrying packet");
                    if attempt < attempts {
                        self.stats.retries += 1;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(TransportError::RetriesExhausted { attempts })
    }

    fn read_response(&mut self) -> Result<Bytes> {
        let started = Instant::now();
        self.decoder.reset();
        let mut byte = [0u8; 1];

        loop {
            if started.elapsed() > self.config.timeout {
                self.stats.timeouts += 1;
                return Err(TransportError::Timeout {
                    waited_ms: started.elapsed().as_millis(),
                });
            }

            match self.stream.read(&mut byte) {
                Ok(0) => continue,
                Ok(_) => {}
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(err) => return Err(err.into()),
            }

            match self.decoder.push(byte[0]) {
                Ok(Some(response)) => {
                    trace!(len = response.len(), "packet decoded");
                    check_status(&response)?;
                    return Ok(response);
                }
                Ok(None) => {}
                Err(err) => {
                    if matches!(err, PacketError::Crc { .. }) {
                        self.stats.crc_errors += 1;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

impl<T: Read + Write> Writer for StreamWriter<T> {
    fn send_action_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.send_command(payload).map(|_| ())
    }

    fn send_query_payload(&mut self, payload: &[u8]) -> Result<Bytes> {
        self.send_command(payload)
    }

    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.stream.flush()?;
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> Result<bool> {
        Ok(self.open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProtocolError;
    use std::collections::VecDeque;
    use std::io;

    /// Serial port stand-in: reads come from a script, writes are recorded.
    #[derive(Default)]
    struct ScriptedPort {
        incoming: VecDeque<u8>,
        written: Vec<u8>,
    }

    impl ScriptedPort {
        fn with_responses(responses: &[&[u8]]) -> Self {
            let mut port = Self::default();
            for response in responses {
                port.incoming.extend(encode_packet(response).unwrap().iter());
            }
            port
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.incoming.pop_front() {
                Some(byte) if !buf.is_empty() => {
                    buf[0] = byte;
                    Ok(1)
                }
                _ => Err(io::Error::new(ErrorKind::TimedOut, "no data")),
            }
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn quick() -> WriterConfig {
        WriterConfig {
            max_retries: 3,
            timeout: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_query_returns_response() {
        let port = ScriptedPort::with_responses(&[&[0x81, 0x64, 0x00]]);
        let mut writer = StreamWriter::with_config(port, quick());

        let response = writer.send_query_payload(&[0x00, 0x64, 0x00]).unwrap();
        assert_eq!(response.as_ref(), &[0x81, 0x64, 0x00]);

        let written = &writer.get_ref().written;
        assert_eq!(written.as_slice(), encode_packet(&[0x00, 0x64, 0x00]).unwrap().as_ref());
        assert_eq!(writer.stats().packets_sent, 1);
    }

    #[test]
    fn test_buffer_overflow_retried() {
        let port = ScriptedPort::with_responses(&[&[0x82], &[0x81]]);
        let mut writer = StreamWriter::with_config(port, quick());

        writer.send_action_payload(&[133, 0, 0, 0, 0]).unwrap();
        assert_eq!(writer.stats().packets_sent, 2);
        assert_eq!(writer.stats().retries, 1);
    }

    #[test]
    fn test_unsupported_command_surfaces() {
        let port = ScriptedPort::with_responses(&[&[0x85]]);
        let mut writer = StreamWriter::with_config(port, quick());

        let err = writer.send_action_payload(&[200]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Device(ProtocolError::CommandNotSupported)
        ));
        assert_eq!(writer.stats().packets_sent, 1);
    }

    #[test]
    fn test_timeouts_exhaust_retries() {
        let mut writer = StreamWriter::with_config(ScriptedPort::default(), quick());

        let err = writer.send_query_payload(&[0x00]).unwrap_err();
        assert!(matches!(err, TransportError::RetriesExhausted { attempts: 3 }));
        assert_eq!(writer.stats().timeouts, 3);
        assert_eq!(writer.stats().packets_sent, 3);
    }

    #[test]
    fn test_bad_crc_retried() {
        let mut port = ScriptedPort::with_responses(&[&[0x81]]);
        let crc_index = port.incoming.len() - 1;
        port.incoming[crc_index] ^= 0x55;
        port.incoming.extend(encode_packet(&[0x81, 7]).unwrap().iter());

        let mut writer = StreamWriter::with_config(port, quick());
        let response = writer.send_query_payload(&[0x0B]).unwrap();
        assert_eq!(response.as_ref(), &[0x81, 7]);
        assert_eq!(writer.stats().crc_errors, 1);
    }

    #[test]
    fn test_open_close() {
        let mut writer = StreamWriter::new(ScriptedPort::default());
        assert!(writer.is_open().unwrap());
        writer.close().unwrap();
        assert!(!writer.is_open().unwrap());
        writer.open().unwrap();
        assert!(writer.is_open().unwrap());
    }
}
