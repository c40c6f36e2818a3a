//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format
//!
//! Every message is built from two frames: a string (2-byte big-endian
//! length + modified UTF-8) and a u64 (8 bytes, big-endian).
//!
//! ### Requests
//! - `"LIST"`
//! - `"GET "` + filename
//!
//! ### Responses
//! - LIST: filename frames, then `"END"`
//! - GET:  `"FOUND"`, u64 size, `size` raw bytes
//! - GET:  `"NOT_FOUND"`

mod codec;
mod request;
mod response;

pub use codec::{
    decode_modified_utf8, encode_modified_utf8, read_u64, read_utf, read_utf_or_eof, write_u64,
    write_utf, MAX_STRING_LEN,
};
pub use request::{read_request, write_request, Request, GET_PREFIX, LIST};
pub use response::{
    read_get_reply, read_listing, write_found, write_listing, write_not_found, GetReply, END,
    FOUND, NOT_FOUND,
};
