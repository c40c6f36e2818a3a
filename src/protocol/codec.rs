//! Wire codec
//!
//! Primitive frames shared by every message.
//!
//! ## Wire Format
//!
//! ### String frame
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (2)  │   Modified UTF-8 bytes      │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! ### Integer frame
//! ```text
//! ┌─────────────────────┐
//! │ u64 big-endian (8)  │
//! └─────────────────────┘
//! ```
//!
//! Strings use the modified UTF-8 form of classic `writeUTF` streams:
//! NUL is `C0 80` and characters outside the BMP are written as two
//! 3-byte surrogate sequences. Plain ASCII is identical to UTF-8.

use std::io::{ErrorKind, Read, Write};

use crate::error::{NoticeError, Result};

/// Largest encoded string that fits in the 2-byte length prefix
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

// =============================================================================
// Modified UTF-8
// =============================================================================

/// Encode a string as modified UTF-8
pub fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());

    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }

    out
}

/// Decode modified UTF-8 bytes into a string
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b0 = bytes[i];
        match b0 >> 4 {
            0x0..=0x7 => {
                if b0 == 0 {
                    return Err(malformed(i, "raw NUL byte"));
                }
                units.push(b0 as u16);
                i += 1;
            }
            0xC | 0xD => {
                let b1 = continuation(bytes, i, 1)?;
                units.push((((b0 & 0x1F) as u16) << 6) | (b1 & 0x3F) as u16);
                i += 2;
            }
            0xE => {
                let b1 = continuation(bytes, i, 1)?;
                let b2 = continuation(bytes, i, 2)?;
                units.push(
                    (((b0 & 0x0F) as u16) << 12)
                        | (((b1 & 0x3F) as u16) << 6)
                        | (b2 & 0x3F) as u16,
                );
                i += 3;
            }
            _ => return Err(malformed(i, "invalid lead byte")),
        }
    }

    String::from_utf16(&units)
        .map_err(|_| NoticeError::Protocol("Malformed string: unpaired surrogate".to_string()))
}

fn continuation(bytes: &[u8], start: usize, offset: usize) -> Result<u8> {
    match bytes.get(start + offset) {
        Some(&b) if b & 0xC0 == 0x80 => Ok(b),
        Some(_) => Err(malformed(start, "bad continuation byte")),
        None => Err(malformed(start, "partial character at end of string")),
    }
}

fn malformed(offset: usize, what: &str) -> NoticeError {
    NoticeError::Protocol(format!("Malformed string at byte {}: {}", offset, what))
}

// =============================================================================
// Stream helpers
// =============================================================================

/// Write a length-prefixed string frame
pub fn write_utf<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    let encoded = encode_modified_utf8(s);
    if encoded.len() > MAX_STRING_LEN {
        return Err(NoticeError::Protocol(format!(
            "String too long: {} bytes encoded (max {})",
            encoded.len(),
            MAX_STRING_LEN
        )));
    }

    writer.write_all(&(encoded.len() as u16).to_be_bytes())?;
    writer.write_all(&encoded)?;
    Ok(())
}

/// Read a length-prefixed string frame
///
/// End of stream anywhere inside the frame is `Truncated`.
pub fn read_utf<R: Read>(reader: &mut R) -> Result<String> {
    let mut len_buf = [0u8; 2];
    read_exact_or_truncated(reader, &mut len_buf)?;
    read_utf_body(reader, u16::from_be_bytes(len_buf) as usize)
}

/// Read a string frame, or `None` if the stream ends before the frame starts
///
/// Lets a request loop tell a peer that closed between requests apart from
/// one that vanished halfway through a frame.
pub fn read_utf_or_eof<R: Read>(reader: &mut R) -> Result<Option<String>> {
    let mut len_buf = [0u8; 2];

    loop {
        match reader.read(&mut len_buf[..1]) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    read_exact_or_truncated(reader, &mut len_buf[1..])?;

    read_utf_body(reader, u16::from_be_bytes(len_buf) as usize).map(Some)
}

fn read_utf_body<R: Read>(reader: &mut R, len: usize) -> Result<String> {
    let mut body = vec![0u8; len];
    if len > 0 {
        read_exact_or_truncated(reader, &mut body)?;
    }
    decode_modified_utf8(&body)
}

/// Write a big-endian u64 frame
pub fn write_u64<W: Write>(writer: &mut W, value: u64) -> Result<()> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

/// Read a big-endian u64 frame
pub fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    read_exact_or_truncated(reader, &mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

/// `read_exact` that reports how far it got when the stream ends early
fn read_exact_or_truncated<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(NoticeError::Truncated {
                    expected: buf.len() as u64,
                    received: filled as u64,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
