//! Client
//!
//! Lists and downloads notices. Every operation opens a fresh connection,
//! sends one request, reads the whole response and closes, so a failed
//! download can never leave stale bytes in front of a later listing.
//!
//! ## Session states
//! ```text
//! Disconnected ──connect──▶ Connected ──send──▶ AwaitingResponse ──▶ Done
//!        │                      │                      │
//!        └──────────────────────┴──────────────────────┴──────▶ Failed
//! ```

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::config::{Config, DEFAULT_PORT};
use crate::error::{NoticeError, Result};
use crate::protocol::{read_get_reply, read_listing, write_request, GetReply, Request};
use crate::transfer::transfer;

/// Where a client session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    AwaitingResponse,
    Done,
    Failed,
}

/// Outcome of a download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Download {
    /// The notice was received in full
    Complete { bytes: u64 },

    /// The server has no notice by that name
    NotFound,
}

/// Client for a notice server
#[derive(Debug, Clone)]
pub struct Client {
    /// Server address as given by the caller
    server: String,

    /// Timeouts and chunk size
    config: Config,
}

impl Client {
    /// Client for `server` with default settings
    ///
    /// `server` is `host:port`, or a bare host/IP for the default port.
    pub fn new(server: impl Into<String>) -> Self {
        Self::with_config(server, &Config::default())
    }

    /// Client for `server` using the timeouts and chunk size from `config`
    pub fn with_config(server: impl Into<String>, config: &Config) -> Self {
        Self {
            server: server.into(),
            config: config.clone(),
        }
    }

    /// The server address this client talks to
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Fetch the names of every notice on the server
    pub fn list_notices(&self) -> Result<Vec<String>> {
        let mut session = Session::connect(&self.server, &self.config)?;
        session.run(&Request::List, |reader| read_listing(reader))
    }

    /// Download notice `name` into `dest`
    ///
    /// On `NotFound` nothing is written to `dest`.
    pub fn download_notice<W: Write + ?Sized>(&self, name: &str, dest: &mut W) -> Result<Download> {
        let chunk_size = self.config.chunk_size;

        self.fetch(name, |reader, size| {
            let bytes = transfer(reader, &mut *dest, size, chunk_size)?;
            dest.flush()?;
            Ok(bytes)
        })
    }

    /// Download notice `name` to the file at `path`
    ///
    /// Nothing is created on disk until the server answers `FOUND`. Bytes are
    /// then staged in a temporary file beside `path` and moved into place only
    /// once the transfer is complete. `NotFound` or an error leaves `path` and
    /// its parent directories untouched.
    pub fn download_to_path(&self, name: &str, path: &Path) -> Result<Download> {
        let chunk_size = self.config.chunk_size;

        self.fetch(name, |reader, size| {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            fs::create_dir_all(dir)?;

            let mut staged = NamedTempFile::new_in(dir)?;
            let bytes = {
                let mut writer = BufWriter::new(staged.as_file_mut());
                let bytes = transfer(reader, &mut writer, size, chunk_size)?;
                writer.flush()?;
                bytes
            };

            staged.persist(path).map_err(|e| NoticeError::Io(e.error))?;
            Ok(bytes)
        })
    }

    /// Send `GET name` and hand the body to `on_found` once `FOUND` arrives
    ///
    /// `on_found` receives the reader positioned at the first content byte and
    /// the declared size, and returns how many bytes it stored.
    fn fetch<F>(&self, name: &str, on_found: F) -> Result<Download>
    where
        F: FnOnce(&mut BufReader<&TcpStream>, u64) -> Result<u64>,
    {
        let mut session = Session::connect(&self.server, &self.config)?;

        session.run(&Request::Get(name.to_string()), |reader| {
            match read_get_reply(&mut *reader)? {
                GetReply::Found { size } => {
                    let bytes = on_found(reader, size)?;
                    Ok(Download::Complete { bytes })
                }
                GetReply::NotFound => Ok(Download::NotFound),
            }
        })
    }
}

// =============================================================================
// Session
// =============================================================================

/// One connection carrying one request
struct Session {
    stream: TcpStream,
    state: SessionState,
    peer: SocketAddr,
}

impl Session {
    /// Disconnected → Connected
    fn connect(server: &str, config: &Config) -> Result<Self> {
        let connect_err = |source| NoticeError::Connect {
            addr: server.to_string(),
            source,
        };

        let mut last_err = None;
        for addr in resolve(server).map_err(connect_err)? {
            let attempt = match config.connect_timeout() {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };

            match attempt {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_read_timeout(config.read_timeout())?;
                    stream.set_write_timeout(config.write_timeout())?;

                    tracing::trace!("Session {}: Disconnected -> Connected", addr);
                    return Ok(Self {
                        stream,
                        state: SessionState::Connected,
                        peer: addr,
                    });
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(connect_err(last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "address resolved to nothing")
        })))
    }

    /// Connected → AwaitingResponse → Done, or Failed on any error
    fn run<T, F>(&mut self, request: &Request, read_reply: F) -> Result<T>
    where
        F: FnOnce(&mut BufReader<&TcpStream>) -> Result<T>,
    {
        let result = self.exchange(request, read_reply);

        let next = if result.is_ok() {
            SessionState::Done
        } else {
            SessionState::Failed
        };
        self.transition(next);

        let _ = self.stream.shutdown(Shutdown::Both);
        result
    }

    fn exchange<T, F>(&mut self, request: &Request, read_reply: F) -> Result<T>
    where
        F: FnOnce(&mut BufReader<&TcpStream>) -> Result<T>,
    {
        {
            let mut writer = BufWriter::new(&self.stream);
            write_request(&mut writer, request)?;
        }
        self.transition(SessionState::AwaitingResponse);

        let mut reader = BufReader::new(&self.stream);
        read_reply(&mut reader)
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!("Session {}: {:?} -> {:?}", self.peer, self.state, next);
        self.state = next;
    }
}

/// Resolve `server`, falling back to the default port for a bare host
fn resolve(server: &str) -> std::io::Result<Vec<SocketAddr>> {
    match server.to_socket_addrs() {
        Ok(addrs) => Ok(addrs.collect()),
        Err(_) => Ok((server, DEFAULT_PORT).to_socket_addrs()?.collect()),
    }
}
