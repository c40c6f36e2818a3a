//! TCP Server
//!
//! Accepts connections and dispatches them to a fixed pool of worker
//! threads.
//!
//! ## Admission
//! Accepted connections go into a bounded queue. When every worker is busy
//! they wait there; when the queue is full the accept loop waits for room,
//! leaving further clients in the kernel backlog. That wait still observes
//! shutdown, so a saturated server stops accepting promptly.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender};

use crate::config::Config;
use crate::error::Result;
use crate::events::{EventSink, ServerEvent};
use crate::store::NoticeStore;

use super::Connection;

/// How often the accept loop checks for shutdown while idle
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for Noticeboard
pub struct Server {
    /// Server configuration
    config: Config,

    /// Notices being served (shared, read-only during requests)
    store: Arc<dyn NoticeStore>,

    /// Bound listener (non-blocking so shutdown can be observed)
    listener: TcpListener,

    /// Event sink cloned into every connection
    events: EventSink,

    /// Set to stop the accept loop
    shutdown: Arc<AtomicBool>,
}

/// Cloneable handle that stops a running server
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the server to stop accepting and wind down
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Server {
    /// Bind the listening socket
    pub fn bind(config: Config, store: Arc<dyn NoticeStore>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            store,
            listener,
            events: EventSink::disabled(),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Publish server events to `events`
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping `run` from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Start the server (blocking)
    ///
    /// Accepts until shutdown is requested, then lets the workers finish
    /// every connection already accepted and joins them.
    pub fn run(&self) -> Result<()> {
        let addr = self.local_addr()?;
        tracing::info!(
            "Serving {} on {} with {} workers",
            self.config.notice_dir.display(),
            addr,
            self.config.worker_count
        );
        self.events.emit(ServerEvent::Listening { addr });

        let (queue, backlog) = channel::bounded::<TcpStream>(self.config.queue_capacity);
        let workers = self.spawn_workers(&backlog)?;
        drop(backlog);

        let result = self.accept_loop(&queue);

        // Closing the queue lets idle workers exit once it drains
        drop(queue);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked outside a connection");
            }
        }

        tracing::info!("Server on {} stopped", addr);
        result
    }

    fn spawn_workers(&self, backlog: &Receiver<TcpStream>) -> Result<Vec<JoinHandle<()>>> {
        (0..self.config.worker_count)
            .map(|id| {
                let backlog = backlog.clone();
                let store = Arc::clone(&self.store);
                let config = self.config.clone();
                let events = self.events.clone();

                thread::Builder::new()
                    .name(format!("noticeboard-worker-{}", id))
                    .spawn(move || worker_loop(backlog, store, config, events))
                    .map_err(Into::into)
            })
            .collect()
    }

    fn accept_loop(&self, queue: &Sender<TcpStream>) -> Result<()> {
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    tracing::trace!("Accepted connection from {}", peer);

                    // Accepted sockets inherit non-blocking mode on some
                    // platforms; workers expect blocking I/O with timeouts.
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", peer, e);
                        continue;
                    }

                    if !self.enqueue(queue, stream, peer) {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Per-connection accept failures (e.g. aborted handshakes,
                    // fd exhaustion) must not stop the server.
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        Ok(())
    }

    /// Hand `stream` to the worker pool, waiting while the queue is full
    ///
    /// Returns `false` when the accept loop should stop: either shutdown was
    /// requested while waiting (the stream is dropped unserved) or every
    /// worker is gone.
    fn enqueue(&self, queue: &Sender<TcpStream>, mut stream: TcpStream, peer: SocketAddr) -> bool {
        if queue.is_full() {
            tracing::debug!("Connection queue full; {} waits for a free worker", peer);
        }

        loop {
            match queue.send_timeout(stream, ACCEPT_POLL_INTERVAL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(pending)) => {
                    if self.shutdown.load(Ordering::SeqCst) {
                        tracing::debug!("Shutting down; dropping queued connection from {}", peer);
                        return false;
                    }
                    stream = pending;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    // Every worker is gone; nothing can serve new clients
                    tracing::error!("Worker pool has shut down");
                    return false;
                }
            }
        }
    }
}

/// Serve connections from the queue until it is closed and drained
fn worker_loop(
    backlog: Receiver<TcpStream>,
    store: Arc<dyn NoticeStore>,
    config: Config,
    events: EventSink,
) {
    for stream in backlog.iter() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut connection = Connection::new(stream, Arc::clone(&store), &config, events.clone())?;
            connection.handle()
        }));

        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::debug!("Connection ended with error: {}", e),
            Err(_) => tracing::error!("Connection handler panicked; worker continues"),
        }
    }
}
