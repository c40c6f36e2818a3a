//! Notice Store Module
//!
//! The file-store collaborator the server reads notices from.
//!
//! ## Responsibilities
//! - List the published notice names in the store's order
//! - Open one notice for reading, with its size
//! - Enforce the flat namespace (no separators, no reserved names)
//!
//! Request handling only reads from a store. Adding notices is a separate
//! operation on the concrete store types.

mod directory;
mod memory;

use std::io::Read;

use crate::error::{NoticeError, Result};
use crate::protocol::END;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;

/// Name prefix of files staged by an in-progress add; never a notice name
pub const STAGING_PREFIX: &str = ".noticeboard-staging-";

/// An opened notice, ready to stream
pub struct OpenNotice {
    /// Number of bytes the reader will yield
    pub size: u64,

    /// Notice contents
    pub reader: Box<dyn Read + Send>,
}

/// Read-only view of the published notices
pub trait NoticeStore: Send + Sync {
    /// Names of every notice, in the store's order
    fn list(&self) -> Result<Vec<String>>;

    /// Open a notice; `None` when it does not exist
    fn open(&self, name: &str) -> Result<Option<OpenNotice>>;
}

/// Check that `name` is a single flat notice name
///
/// Rejects empty names, `.` and `..`, path separators, NUL, the listing
/// sentinel (a notice called `END` would cut every listing short), and the
/// staging prefix used by directory adds.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name == END
        || name.starts_with(STAGING_PREFIX)
        || name.contains(['/', '\\', '\0']);

    if invalid {
        Err(NoticeError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}
