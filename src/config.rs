//! Configuration for Noticeboard
//!
//! Centralized configuration with sensible defaults. Shared by the server
//! and the client; each side reads the fields it needs.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{NoticeError, Result};

/// Default TCP port for the notice protocol
pub const DEFAULT_PORT: u16 = 12345;

/// Default transfer chunk size (bytes)
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Main configuration for a Noticeboard server or client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the published notices
    pub notice_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Server Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address (host:port)
    pub listen_addr: String,

    /// Number of worker threads serving connections
    pub worker_count: usize,

    /// Accepted connections allowed to wait for a free worker
    pub queue_capacity: usize,

    // -------------------------------------------------------------------------
    // Transfer Configuration
    // -------------------------------------------------------------------------
    /// Size of the single buffer used to stream notice bytes
    pub chunk_size: usize,

    // -------------------------------------------------------------------------
    // Timeouts (0 disables)
    // -------------------------------------------------------------------------
    /// Client connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Socket read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// Socket write timeout in milliseconds
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notice_dir: PathBuf::from("notices"),
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            worker_count: 10,
            queue_capacity: 64,
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout_ms: 5_000,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Connect timeout, `None` when disabled
    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    /// Read timeout, `None` when disabled
    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    /// Write timeout, `None` when disabled
    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the notice directory
    pub fn notice_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.notice_dir = path.into();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of worker threads
    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    /// Set how many accepted connections may wait for a worker
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Set the transfer chunk size (in bytes)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Result<Config> {
        let config = self.config;

        if config.worker_count == 0 {
            return Err(NoticeError::Config("worker_count must be at least 1".to_string()));
        }
        if config.queue_capacity == 0 {
            return Err(NoticeError::Config("queue_capacity must be at least 1".to_string()));
        }
        if config.chunk_size == 0 {
            return Err(NoticeError::Config("chunk_size must be at least 1".to_string()));
        }

        Ok(config)
    }
}
