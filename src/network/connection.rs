//! Connection Handler
//!
//! Serves one client connection: read a request, answer it, repeat until
//! the peer goes away.

use std::io::{BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{NoticeError, Result};
use crate::events::{EventSink, ServerEvent};
use crate::protocol::{read_request, write_found, write_listing, write_not_found, Request};
use crate::store::NoticeStore;
use crate::transfer::transfer;

/// How a session ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Peer closed between requests
    Closed,

    /// Peer reset or dropped the connection
    Dropped,

    /// No request arrived within the read timeout
    IdleTimeout,
}

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Notices being served
    store: Arc<dyn NoticeStore>,

    /// Where session events go
    events: EventSink,

    /// Transfer buffer size
    chunk_size: usize,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and applies the configured timeouts
    pub fn new(
        stream: TcpStream,
        store: Arc<dyn NoticeStore>,
        config: &Config,
        events: EventSink,
    ) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;
        stream.set_read_timeout(config.read_timeout())?;
        stream.set_write_timeout(config.write_timeout())?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::with_capacity(config.chunk_size.max(8 * 1024), write_stream),
            store,
            events,
            chunk_size: config.chunk_size,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Each request is answered in full, including any file transfer,
    /// before the next one is read. Returns `Ok` when the peer leaves,
    /// `Err` when the connection had to be abandoned.
    pub fn handle(&mut self) -> Result<SessionEnd> {
        tracing::debug!("Connection established from {}", self.peer_addr);
        self.events.emit(ServerEvent::Connected {
            peer: self.peer_addr.clone(),
        });

        let result = self.serve();

        match &result {
            Ok(end) => {
                tracing::debug!("Client {} finished: {:?}", self.peer_addr, end);
                self.events.emit(ServerEvent::Disconnected {
                    peer: self.peer_addr.clone(),
                });
            }
            Err(e) => {
                tracing::warn!("Abandoning connection from {}: {}", self.peer_addr, e);
                self.events.emit(ServerEvent::Failed {
                    peer: self.peer_addr.clone(),
                    error: e.to_string(),
                });
            }
        }

        result
    }

    fn serve(&mut self) -> Result<SessionEnd> {
        loop {
            let request = match read_request(&mut self.reader) {
                Ok(Some(request)) => request,
                Ok(None) => return Ok(SessionEnd::Closed),
                Err(e) if e.is_timeout() => return Ok(SessionEnd::IdleTimeout),
                Err(e) if e.is_disconnect() => return Ok(SessionEnd::Dropped),
                Err(e) => return Err(e),
            };

            tracing::trace!("Received request from {}: {:?}", self.peer_addr, request);

            // Failures past this point leave a partial reply on the wire.
            match request {
                Request::List => self.send_listing()?,
                Request::Get(name) => self.send_notice(&name)?,
            }
        }
    }

    /// Reply to LIST
    fn send_listing(&mut self) -> Result<()> {
        let names = self.store.list()?;
        let count = write_listing(&mut self.writer, &names)?;

        self.events.emit(ServerEvent::Listed {
            peer: self.peer_addr.clone(),
            count,
        });
        Ok(())
    }

    /// Reply to GET
    fn send_notice(&mut self, name: &str) -> Result<()> {
        let Some(mut notice) = self.store.open(name)? else {
            write_not_found(&mut self.writer)?;
            tracing::debug!("{} requested missing notice {:?}", self.peer_addr, name);
            self.events.emit(ServerEvent::NotFound {
                peer: self.peer_addr.clone(),
                name: name.to_string(),
            });
            return Ok(());
        };

        write_found(&mut self.writer, notice.size)?;

        // A notice that shrank after it was opened ends the connection; the
        // declared size is never padded.
        let sent = transfer(&mut notice.reader, &mut self.writer, notice.size, self.chunk_size)
            .map_err(|e| match e {
                NoticeError::Truncated { expected, received } => NoticeError::Protocol(format!(
                    "Notice {:?} shrank while sending ({} of {} bytes)",
                    name, received, expected
                )),
                other => other,
            })?;
        self.writer.flush()?;

        tracing::debug!("Sent {:?} ({} bytes) to {}", name, sent, self.peer_addr);
        self.events.emit(ServerEvent::Sent {
            peer: self.peer_addr.clone(),
            name: name.to_string(),
            bytes: sent,
        });
        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
