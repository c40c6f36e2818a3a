//! # Noticeboard
//!
//! A small file-distribution service:
//! - A server publishes a flat directory of files ("notices") over TCP
//! - Clients list the notices and download one at a time
//! - Length-prefixed string frames, big-endian integers
//! - Bounded worker pool, bounded transfer buffer
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Client                               │
//! │            (one connection per list / download)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  LIST | GET <name>
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   TCP Server                                 │
//! │          (acceptor + fixed worker pool)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Connection  │─────────▶│  Transfer   │
//!   │  (session)  │          │  (chunked)  │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │ NoticeStore │
//!   │ (dir / mem) │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transfer;
pub mod store;
pub mod events;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{NoticeError, Result};
pub use config::Config;
pub use client::{Client, Download};
pub use network::Server;
pub use store::{DirectoryStore, MemoryStore, NoticeStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Noticeboard
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
