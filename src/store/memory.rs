//! Memory Store
//!
//! Insertion-ordered notices held in RAM. Useful for embedding and tests.

use bytes::{Buf, Bytes};
use parking_lot::RwLock;

use crate::error::Result;

use super::{validate_name, NoticeStore, OpenNotice};

/// In-memory notice store
///
/// ## Concurrency:
/// - `notices`: RwLock (many concurrent readers, exclusive writer)
/// - `open` clones the `Bytes` handle and releases the lock before any
///   bytes are streamed
#[derive(Debug, Default)]
pub struct MemoryStore {
    notices: RwLock<Vec<(String, Bytes)>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a notice
    ///
    /// A replaced notice keeps its position in the listing.
    pub fn insert(&self, name: &str, contents: impl Into<Bytes>) -> Result<()> {
        validate_name(name)?;
        let contents = contents.into();

        let mut notices = self.notices.write();
        match notices.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = contents,
            None => notices.push((name.to_string(), contents)),
        }
        Ok(())
    }

    /// Remove a notice, returning whether it existed
    pub fn remove(&self, name: &str) -> bool {
        let mut notices = self.notices.write();
        let before = notices.len();
        notices.retain(|(n, _)| n != name);
        notices.len() != before
    }

    /// Number of notices
    pub fn len(&self) -> usize {
        self.notices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NoticeStore for MemoryStore {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.notices.read().iter().map(|(n, _)| n.clone()).collect())
    }

    fn open(&self, name: &str) -> Result<Option<OpenNotice>> {
        let contents = self
            .notices
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.clone());

        Ok(contents.map(|c| OpenNotice {
            size: c.len() as u64,
            reader: Box::new(c.reader()),
        }))
    }
}
