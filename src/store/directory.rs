//! Directory Store
//!
//! Notices are the regular files directly inside one directory.
//!
//! ## Concurrency:
//! - `list`/`open` only read the directory; any number may run at once
//! - `add_*` writes a temporary file inside the root and renames it over the
//!   target, so a reader opening the same name sees either the old notice or
//!   the complete new one

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tempfile::Builder;

use crate::error::{NoticeError, Result};

use super::{validate_name, NoticeStore, OpenNotice, STAGING_PREFIX};

/// Notice store backed by a directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    /// Directory holding the notices
    root: PathBuf,
}

impl DirectoryStore {
    /// Use `root` as the notice directory
    ///
    /// The directory does not need to exist yet; it lists as empty and is
    /// created by the first add.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The notice directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Publish a copy of the file at `source` under its own file name
    pub fn add_file(&self, source: &Path) -> Result<String> {
        let meta = fs::metadata(source)?;
        if !meta.is_file() {
            return Err(NoticeError::InvalidName(source.display().to_string()));
        }

        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| NoticeError::InvalidName(source.display().to_string()))?
            .to_string();

        let mut file = File::open(source)?;
        self.add_bytes(&name, &mut file)?;
        Ok(name)
    }

    /// Publish the contents of `reader` as notice `name`
    ///
    /// Replaces an existing notice with the same name.
    pub fn add_bytes<R: Read + ?Sized>(&self, name: &str, reader: &mut R) -> Result<u64> {
        validate_name(name)?;
        fs::create_dir_all(&self.root)?;

        let mut staged = Builder::new().prefix(STAGING_PREFIX).tempfile_in(&self.root)?;
        let written = io::copy(reader, staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        staged
            .persist(self.root.join(name))
            .map_err(|e| NoticeError::Io(e.error))?;

        tracing::debug!("Added notice {} ({} bytes)", name, written);
        Ok(written)
    }
}

impl NoticeStore for DirectoryStore {
    /// Regular files with valid names, sorted by name
    ///
    /// Symlinks are followed, matching `open`. Staged adds carry a reserved
    /// prefix and are skipped along with anything else that is not a valid
    /// notice name.
    fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => continue,
                // Dangling symlink, or removed since read_dir saw it
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::trace!("Skipping non UTF-8 file name {:?}", entry.file_name());
                continue;
            };
            if validate_name(&name).is_err() {
                continue;
            }
            names.push(name);
        }

        names.sort();
        Ok(names)
    }

    fn open(&self, name: &str) -> Result<Option<OpenNotice>> {
        if validate_name(name).is_err() {
            return Ok(None);
        }

        let file = match File::open(self.root.join(name)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Size comes from the open handle so a rename racing with us cannot
        // pair one file's length with another file's bytes.
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Ok(None);
        }

        Ok(Some(OpenNotice {
            size: meta.len(),
            reader: Box::new(file),
        }))
    }
}
