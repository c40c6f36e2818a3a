//! Response definitions
//!
//! Represents responses to clients.
//!
//! - LIST → one frame per filename, then the `END` sentinel
//! - GET  → `FOUND` + u64 size + raw bytes, or `NOT_FOUND`

use std::io::{Read, Write};

use crate::error::{NoticeError, Result};
use super::codec::{read_u64, read_utf, write_u64, write_utf};

/// Sentinel closing a listing
pub const END: &str = "END";

/// Tag preceding a notice's size and bytes
pub const FOUND: &str = "FOUND";

/// Tag for a missing notice
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Reply to a GET request, up to (not including) the notice bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetReply {
    /// The notice follows: exactly `size` raw bytes
    Found { size: u64 },

    /// No such notice
    NotFound,
}

// =============================================================================
// LIST
// =============================================================================

/// Write a full listing followed by the sentinel
pub fn write_listing<W, I, S>(writer: &mut W, names: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut count = 0;
    for name in names {
        let name = name.as_ref();
        if name == END {
            return Err(NoticeError::Protocol(format!(
                "Cannot list a notice named {:?}",
                END
            )));
        }
        write_utf(writer, name)?;
        count += 1;
    }

    write_utf(writer, END)?;
    writer.flush()?;
    Ok(count)
}

/// Read filenames until the sentinel
///
/// A stream that ends before the sentinel is `Truncated`; a partial listing
/// is never returned.
pub fn read_listing<R: Read>(reader: &mut R) -> Result<Vec<String>> {
    let mut names = Vec::new();

    loop {
        let name = read_utf(reader)?;
        if name == END {
            return Ok(names);
        }
        names.push(name);
    }
}

// =============================================================================
// GET
// =============================================================================

/// Write the FOUND header; the caller streams `size` bytes next
pub fn write_found<W: Write>(writer: &mut W, size: u64) -> Result<()> {
    write_utf(writer, FOUND)?;
    write_u64(writer, size)?;
    Ok(())
}

/// Write a NOT_FOUND reply
pub fn write_not_found<W: Write>(writer: &mut W) -> Result<()> {
    write_utf(writer, NOT_FOUND)?;
    writer.flush()?;
    Ok(())
}

/// Read the reply header to a GET request
pub fn read_get_reply<R: Read>(reader: &mut R) -> Result<GetReply> {
    let tag = read_utf(reader)?;
    match tag.as_str() {
        FOUND => Ok(GetReply::Found {
            size: read_u64(reader)?,
        }),
        NOT_FOUND => Ok(GetReply::NotFound),
        other => Err(NoticeError::Protocol(format!(
            "Unexpected reply to GET: {:?}",
            other
        ))),
    }
}
