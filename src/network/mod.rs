//! Network Module
//!
//! TCP server and connection handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Fixed worker thread pool fed by a bounded queue
//! - Requests answered from a shared `NoticeStore`

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, SessionEnd};
