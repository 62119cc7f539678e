//! s3g payload codec (encode/decode)
//!
//! Payloads are the bytes inside a packet, before framing. All integers are
//! little-endian.
//!
//! # Format
//!
//! ```text
//! host call:   [OPCODE] [ARGS...]
//! tool query:  [10] [TOOL] [TOOL_OPCODE] [ARGS...]
//! tool action: [136] [TOOL] [TOOL_OPCODE] [ARGS_LEN] [ARGS...]
//! response:    [STATUS] [REPLY...]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::call::ProtocolCall;
use super::layout::{FieldKind, FieldValue};
use super::types::{HostCommand, Opcode, ResponseCode};
use super::{ProtocolError, Result};

/// Encode a call into a payload
///
/// Calls are validated when they are built, so this never fails.
#[must_use]
pub fn encode(call: &ProtocolCall) -> Bytes {
    let opcode = call.opcode();
    let wire = opcode.wire_command();
    let mut buf = BytesMut::with_capacity(call.encoded_len());

    buf.put_u8(wire.as_u8());
    if let Opcode::Tool(cmd) = opcode {
        buf.put_u8(call.tool_index().unwrap_or_default());
        buf.put_u8(cmd.as_u8());
        if wire == HostCommand::ToolActionCommand {
            let len: usize = call.args().iter().map(FieldValue::encoded_len).sum();
            buf.put_u8(u8::try_from(len).unwrap_or(u8::MAX));
        }
    }
    for field in call.args() {
        put_field(&mut buf, field);
    }

    buf.freeze()
}

/// Build a success response carrying `fields`
///
/// This is what a device sends back; hosts use it to script devices in tests.
#[must_use]
pub fn encode_reply(fields: &[FieldValue]) -> Bytes {
    let len = fields.iter().map(FieldValue::encoded_len).sum::<usize>() + 1;
    let mut buf = BytesMut::with_capacity(len);
    buf.put_u8(ResponseCode::Success.as_u8());
    for field in fields {
        put_field(&mut buf, field);
    }
    buf.freeze()
}

/// Check the status byte of a response and return the reply body
pub fn check_status(response: &[u8]) -> Result<&[u8]> {
    let (&status, body) = response
        .split_first()
        .ok_or(ProtocolError::EmptyResponse)?;
    let code =
        ResponseCode::from_u8(status).ok_or(ProtocolError::UnknownResponseCode { code: status })?;
    match ProtocolError::from_status(code) {
        Some(err) => Err(err),
        None => Ok(body),
    }
}

/// Unpack a reply body field by field
///
/// Strings end at their terminator; a string with no terminator is an error,
/// never a silent truncation. Bytes past the last field are ignored.
pub fn unpack_reply(fields: &[FieldKind], body: &[u8]) -> Result<Vec<FieldValue>> {
    let total = body.len();
    let mut cursor = body;
    let mut values = Vec::with_capacity(fields.len());

    for kind in fields {
        let value = match kind {
            FieldKind::CStr => {
                let end = cursor
                    .iter()
                    .position(|byte| *byte == 0)
                    .ok_or(ProtocolError::MissingTerminator)?;
                let text = cursor[..end].to_vec();
                cursor.advance(end + 1);
                FieldValue::CStr(text)
            }
            FieldKind::Tail => {
                let rest = cursor.to_vec();
                cursor.advance(rest.len());
                FieldValue::Tail(rest)
            }
            FieldKind::U8 => {
                ensure(cursor, 1, total)?;
                FieldValue::U8(cursor.get_u8())
            }
            FieldKind::U16 => {
                ensure(cursor, 2, total)?;
                FieldValue::U16(cursor.get_u16_le())
            }
            FieldKind::I16 => {
                ensure(cursor, 2, total)?;
                FieldValue::I16(cursor.get_i16_le())
            }
            FieldKind::U32 => {
                ensure(cursor, 4, total)?;
                FieldValue::U32(cursor.get_u32_le())
            }
            FieldKind::I32 => {
                ensure(cursor, 4, total)?;
                FieldValue::I32(cursor.get_i32_le())
            }
        };
        values.push(value);
    }

    Ok(values)
}

fn put_field(buf: &mut BytesMut, field: &FieldValue) {
    match field {
        FieldValue::U8(v) => buf.put_u8(*v),
        FieldValue::U16(v) => buf.put_u16_le(*v),
        FieldValue::I16(v) => buf.put_i16_le(*v),
        FieldValue::U32(v) => buf.put_u32_le(*v),
        FieldValue::I32(v) => buf.put_i32_le(*v),
        FieldValue::CStr(bytes) => {
            buf.put_slice(bytes);
            buf.put_u8(0);
        }
        FieldValue::Tail(bytes) => buf.put_slice(bytes),
    }
}

fn ensure(cursor: &[u8], size: usize, total: usize) -> Result<()> {
    if cursor.len() < size {
        return Err(ProtocolError::ReplyTooShort {
            needed: total - cursor.len() + size,
            got: total,
        });
    }
    Ok(())
}
