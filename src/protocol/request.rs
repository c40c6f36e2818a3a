//! Request definitions
//!
//! Represents requests from clients. A request is a single string frame.

use std::io::{Read, Write};

use crate::error::{NoticeError, Result};
use super::codec::{read_utf_or_eof, write_utf};

/// Literal sent for a listing request
pub const LIST: &str = "LIST";

/// Prefix of a download request; the filename follows directly
pub const GET_PREFIX: &str = "GET ";

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// List every notice
    List,

    /// Download one notice by name
    Get(String),
}

impl Request {
    /// The string carried in the request frame
    pub fn encode(&self) -> String {
        match self {
            Request::List => LIST.to_string(),
            Request::Get(name) => format!("{}{}", GET_PREFIX, name),
        }
    }

    /// Parse a request frame
    ///
    /// The filename is everything after the prefix. The frame is length
    /// prefixed, so the name needs no escaping.
    pub fn parse(frame: &str) -> Result<Self> {
        if frame == LIST {
            return Ok(Request::List);
        }
        if let Some(name) = frame.strip_prefix(GET_PREFIX) {
            return Ok(Request::Get(name.to_string()));
        }

        Err(NoticeError::Protocol(format!("Unknown request: {:?}", frame)))
    }
}

/// Write a request frame
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    write_utf(writer, &request.encode())?;
    writer.flush()?;
    Ok(())
}

/// Read the next request, or `None` once the peer has closed cleanly
pub fn read_request<R: Read>(reader: &mut R) -> Result<Option<Request>> {
    match read_utf_or_eof(reader)? {
        Some(frame) => Request::parse(&frame).map(Some),
        None => Ok(None),
    }
}
