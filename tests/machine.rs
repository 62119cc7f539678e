use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use s3g::gcode::{Interpreter, Profile};
use s3g::protocol::{ProtocolError, S3G_VERSION};
use s3g::transport::{encode_packet, PacketDecoder, StreamWriter, TransportError, WriterConfig};
use s3g::{Error, Machine};

/// Bot on the other end of a serial line: answers each packet from a script
#[derive(Default)]
struct Bot {
    responses: VecDeque<Vec<u8>>,
    outgoing: VecDeque<u8>,
    decoder: PacketDecoder,
    received: Vec<Vec<u8>>,
}

impl Bot {
    fn answering(responses: &[&[u8]]) -> Self {
        Self {
            responses: responses.iter().map(|response| response.to_vec()).collect(),
            ..Self::default()
        }
    }
}

impl Write for Bot {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if let Some(payload) = self.decoder.push(byte).unwrap() {
                self.received.push(payload.to_vec());
                if let Some(response) = self.responses.pop_front() {
                    self.outgoing.extend(encode_packet(&response).unwrap().iter());
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for Bot {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.outgoing.pop_front() {
            Some(byte) if !buf.is_empty() => {
                buf[0] = byte;
                Ok(1)
            }
            _ => Err(io::Error::new(ErrorKind::WouldBlock, "idle")),
        }
    }
}

fn connect(responses: &[&[u8]]) -> StreamWriter<Bot> {
    let config = WriterConfig {
        max_retries: 2,
        timeout: Duration::from_millis(10),
    };
    StreamWriter::with_config(Bot::answering(responses), config)
}

#[test]
fn test_version_handshake() {
    let mut machine = Machine::new(connect(&[&[0x81, 0x5A, 0x02]]));
    assert_eq!(machine.get_version().unwrap(), 602);

    let bot = machine.into_writer().into_inner();
    let [version_lo, version_hi] = S3G_VERSION.to_le_bytes();
    assert_eq!(bot.received, vec![vec![0x00, version_lo, version_hi]]);
}

#[test]
fn test_interpreter_over_serial() {
    let writer = connect(&[&[0x81], &[0x81], &[0x81, 0xD2, 0x00]]);
    let mut interpreter = Interpreter::new(writer, Profile::replicator_dual());

    interpreter.execute_line("M135 T0").unwrap();
    interpreter.execute_line("G1 X10 F1000").unwrap();
    let temperature = interpreter.execute_line("M105 T0").unwrap();
    assert_eq!(temperature, Some(s3g::Value::Temperature(210)));

    let bot = interpreter.into_writer().into_inner();
    assert_eq!(bot.received.len(), 3);
    assert_eq!(bot.received[0], vec![134, 0]);
    assert_eq!(bot.received[1][0], 139);
    assert_eq!(bot.received[2], vec![10, 0, 2]);
}

#[test]
fn test_busy_bot_retried() {
    let writer = connect(&[&[0x82], &[0x81]]);
    let mut machine = Machine::new(writer);
    machine.abort_immediately().unwrap();

    let writer = machine.into_writer();
    assert_eq!(writer.stats().retries, 1);
    assert_eq!(writer.into_inner().received.len(), 2);
}

#[test]
fn test_device_errors() {
    let mut interpreter = Interpreter::new(connect(&[&[0x85]]), Profile::replicator_dual());
    let err = interpreter.execute_line("G1 X10 F1000").unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::CommandNotSupported)));

    // a rejected move leaves the position untouched
    assert_eq!(interpreter.state().position.get(s3g::protocol::Axis::X), Some(0.0));
    assert_eq!(interpreter.state().feedrate, None);
}

#[test]
fn test_silent_bot_times_out() {
    let mut machine = Machine::new(connect(&[]));
    let err = machine.get_version().unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::RetriesExhausted { attempts: 2 })
    ));
}
