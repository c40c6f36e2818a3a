//! Transfer Engine
//!
//! Streams an exact byte count from a reader to a writer through one
//! bounded buffer. Used by the server to send a notice and by the client to
//! receive one, so memory use stays at one chunk regardless of file size.

use std::io::{ErrorKind, Read, Write};

use crate::error::{NoticeError, Result};

/// Move exactly `total` bytes from `source` to `sink`
///
/// Each read asks for at most `min(chunk_size, remaining)` bytes, so nothing
/// past the declared length is consumed from `source`. Every chunk is
/// written as soon as it is read. Returns `Truncated` if `source` runs dry
/// first. The sink is not flushed.
pub fn transfer<R, W>(source: &mut R, sink: &mut W, total: u64, chunk_size: usize) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut remaining = total;

    while remaining > 0 {
        let want = remaining.min(buffer.len() as u64) as usize;

        let read = match source.read(&mut buffer[..want]) {
            Ok(0) => {
                return Err(NoticeError::Truncated {
                    expected: total,
                    received: total - remaining,
                })
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        sink.write_all(&buffer[..read])?;
        remaining -= read as u64;
    }

    Ok(total)
}
