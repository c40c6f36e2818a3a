//! Tests for the TCP server
//!
//! These tests verify:
//! - Several requests on one persistent connection
//! - Malformed requests abandon only that connection
//! - Peers vanishing mid-transfer do not affect the server
//! - Worker pool saturation queues connections instead of dropping them
//! - Idle timeout, handler panics, shutdown
//! - Server events

use std::io::{BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::Receiver;
use noticeboard::events::{EventSink, ServerEvent};
use noticeboard::network::{Server, ShutdownHandle};
use noticeboard::protocol::{
    read_get_reply, read_listing, write_request, write_utf, GetReply, Request,
};
use noticeboard::store::{MemoryStore, NoticeStore, OpenNotice};
use noticeboard::{Config, Result};

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<Result<()>>>,
}

impl TestServer {
    fn start(store: Arc<dyn NoticeStore>, config: Config, events: EventSink) -> Self {
        let server = Server::bind(config, store).unwrap().with_events(events);
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let thread = thread::spawn(move || server.run());

        Self {
            addr,
            shutdown,
            thread: Some(thread),
        }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream
    }

    fn stop(mut self) -> Result<()> {
        self.shutdown.shutdown();
        self.thread.take().unwrap().join().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn test_config() -> Config {
    Config::builder()
        .listen_addr("127.0.0.1:0")
        .worker_count(4)
        .build()
        .unwrap()
}

fn sample_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.insert("a.txt", &b"hello"[..]).unwrap();
    store.insert("b.txt", &b""[..]).unwrap();
    store.insert("big.bin", vec![7u8; 512 * 1024]).unwrap();
    Arc::new(store)
}

fn start_sample() -> TestServer {
    TestServer::start(sample_store(), test_config(), EventSink::disabled())
}

fn get(stream: &TcpStream, reader: &mut BufReader<&TcpStream>, name: &str) -> Option<Vec<u8>> {
    let mut writer = stream;
    write_request(&mut writer, &Request::Get(name.to_string())).unwrap();

    match read_get_reply(reader).unwrap() {
        GetReply::Found { size } => {
            let mut body = vec![0u8; size as usize];
            reader.read_exact(&mut body).unwrap();
            Some(body)
        }
        GetReply::NotFound => None,
    }
}

fn list(stream: &TcpStream, reader: &mut BufReader<&TcpStream>) -> Vec<String> {
    let mut writer = stream;
    write_request(&mut writer, &Request::List).unwrap();
    read_listing(reader).unwrap()
}

/// Wait until the server has closed its side of `stream`
fn assert_closed_by_server(mut stream: TcpStream) {
    let mut buf = [0u8; 64];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return,
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => return,
            Err(e) => panic!("Expected the server to close the connection, got {}", e),
        }
    }
}

fn collect_events(rx: &Receiver<ServerEvent>, until: impl Fn(&ServerEvent) -> bool) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.recv_timeout(Duration::from_secs(5)) {
        let done = until(&event);
        events.push(event);
        if done {
            break;
        }
    }
    events
}

/// Store whose `open` always panics
struct PanickingStore;

impl NoticeStore for PanickingStore {
    fn list(&self) -> Result<Vec<String>> {
        Ok(vec!["boom.txt".to_string()])
    }

    fn open(&self, _name: &str) -> Result<Option<OpenNotice>> {
        panic!("store exploded");
    }
}

// =============================================================================
// Request Handling Tests
// =============================================================================

#[test]
fn test_list_and_get_on_one_connection() {
    let server = start_sample();
    let stream = server.connect();
    let mut reader = BufReader::new(&stream);

    assert_eq!(list(&stream, &mut reader), vec!["a.txt", "b.txt", "big.bin"]);
    assert_eq!(get(&stream, &mut reader, "a.txt").unwrap(), b"hello");
    assert_eq!(get(&stream, &mut reader, "b.txt").unwrap(), b"");
    assert_eq!(get(&stream, &mut reader, "missing.txt"), None);
    assert_eq!(get(&stream, &mut reader, "big.bin").unwrap().len(), 512 * 1024);
    // Stream is still in sync after all of the above
    assert_eq!(list(&stream, &mut reader).len(), 3);
}

#[test]
fn test_found_reply_wire_bytes() {
    let server = start_sample();
    let mut stream = server.connect();

    let mut request = Vec::new();
    write_utf(&mut request, "GET a.txt").unwrap();
    stream.write_all(&request).unwrap();

    let mut reply = [0u8; 2 + 5 + 8 + 5];
    stream.read_exact(&mut reply).unwrap();
    assert_eq!(&reply[..7], b"\x00\x05FOUND");
    assert_eq!(&reply[7..15], &5u64.to_be_bytes());
    assert_eq!(&reply[15..], b"hello");
}

#[test]
fn test_malformed_request_abandons_connection() {
    let server = start_sample();
    let mut stream = server.connect();

    let mut request = Vec::new();
    write_utf(&mut request, "DELETE a.txt").unwrap();
    stream.write_all(&request).unwrap();
    assert_closed_by_server(stream);

    // Other connections are unaffected
    let stream = server.connect();
    let mut reader = BufReader::new(&stream);
    assert_eq!(list(&stream, &mut reader).len(), 3);
}

#[test]
fn test_peer_gone_mid_transfer() {
    let server = start_sample();

    {
        let mut stream = server.connect();
        let mut request = Vec::new();
        write_utf(&mut request, "GET big.bin").unwrap();
        stream.write_all(&request).unwrap();

        let mut first = [0u8; 32];
        stream.read_exact(&mut first).unwrap();
        // Dropped with most of the file unread
    }

    let stream = server.connect();
    let mut reader = BufReader::new(&stream);
    assert_eq!(get(&stream, &mut reader, "a.txt").unwrap(), b"hello");
}

#[test]
fn test_clean_close_between_requests() {
    let (events, rx) = EventSink::channel();
    let server = TestServer::start(sample_store(), test_config(), events);

    {
        let stream = server.connect();
        let mut reader = BufReader::new(&stream);
        list(&stream, &mut reader);
    }

    let events = collect_events(&rx, |e| matches!(e, ServerEvent::Disconnected { .. }));
    assert!(events.iter().any(|e| matches!(e, ServerEvent::Disconnected { .. })));
    assert!(!events.iter().any(|e| matches!(e, ServerEvent::Failed { .. })));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_saturated_pool_queues_connections() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .worker_count(1)
        .queue_capacity(4)
        .build()
        .unwrap();
    let server = TestServer::start(sample_store(), config, EventSink::disabled());

    // Occupies the only worker without sending anything
    let blocker = server.connect();
    thread::sleep(Duration::from_millis(200));

    let waiting = server.connect();
    let mut writer = &waiting;
    write_request(&mut writer, &Request::List).unwrap();

    waiting.set_read_timeout(Some(Duration::from_millis(300))).unwrap();
    let mut probe = [0u8; 1];
    assert!(
        (&waiting).read(&mut probe).is_err(),
        "queued connection was served while the pool was full"
    );

    drop(blocker);

    waiting.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut reader = BufReader::new(&waiting);
    assert_eq!(read_listing(&mut reader).unwrap(), vec!["a.txt", "b.txt", "big.bin"]);
}

#[test]
fn test_parallel_connections() {
    let server = start_sample();
    let addr = server.addr;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let stream = TcpStream::connect(addr).unwrap();
                stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
                let mut reader = BufReader::new(&stream);
                let name = if i % 2 == 0 { "a.txt" } else { "big.bin" };
                get(&stream, &mut reader, name).unwrap().len()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let expected = if i % 2 == 0 { 5 } else { 512 * 1024 };
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_handler_panic_keeps_worker() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .worker_count(1)
        .build()
        .unwrap();
    let server = TestServer::start(Arc::new(PanickingStore), config, EventSink::disabled());

    let mut stream = server.connect();
    let mut request = Vec::new();
    write_utf(&mut request, "GET boom.txt").unwrap();
    stream.write_all(&request).unwrap();
    assert_closed_by_server(stream);

    // The single worker must still be alive
    let stream = server.connect();
    let mut reader = BufReader::new(&stream);
    assert_eq!(list(&stream, &mut reader), vec!["boom.txt"]);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_idle_connection_times_out() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .read_timeout_ms(200)
        .build()
        .unwrap();
    let server = TestServer::start(sample_store(), config, EventSink::disabled());

    let stream = server.connect();
    assert_closed_by_server(stream);
}

#[test]
fn test_shutdown_stops_run() {
    let server = start_sample();
    {
        let stream = server.connect();
        let mut reader = BufReader::new(&stream);
        list(&stream, &mut reader);
    }
    assert!(server.stop().is_ok());
}

#[test]
fn test_shutdown_while_queue_full_drops_waiting_connection() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .worker_count(1)
        .queue_capacity(1)
        .read_timeout_ms(1_000)
        .build()
        .unwrap();
    let server = TestServer::start(sample_store(), config, EventSink::disabled());

    // One connection holds the worker, one fills the queue
    let _busy = server.connect();
    thread::sleep(Duration::from_millis(200));
    let _queued = server.connect();
    thread::sleep(Duration::from_millis(200));

    // Accepted, but there is no room for it anywhere
    let overflow = server.connect();
    let mut writer = &overflow;
    write_request(&mut writer, &Request::List).unwrap();
    thread::sleep(Duration::from_millis(200));

    assert!(server.stop().is_ok());

    let mut reader = BufReader::new(&overflow);
    assert!(
        read_listing(&mut reader).is_err(),
        "connection accepted during shutdown was still served"
    );
}

#[test]
fn test_event_sequence() {
    let (events, rx) = EventSink::channel();
    let server = TestServer::start(sample_store(), test_config(), events);

    match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
        ServerEvent::Listening { addr } => assert_eq!(addr, server.addr),
        other => panic!("Expected Listening first, got {:?}", other),
    }

    {
        let stream = server.connect();
        let mut reader = BufReader::new(&stream);
        list(&stream, &mut reader);
        get(&stream, &mut reader, "a.txt");
        get(&stream, &mut reader, "nope.txt");
    }

    let events = collect_events(&rx, |e| matches!(e, ServerEvent::Disconnected { .. }));
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            ServerEvent::Listening { .. } => "listening",
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::Listed { count: 3, .. } => "listed",
            ServerEvent::Listed { .. } => "listed-wrong-count",
            ServerEvent::Sent { bytes: 5, .. } => "sent",
            ServerEvent::Sent { .. } => "sent-wrong-size",
            ServerEvent::NotFound { .. } => "not-found",
            ServerEvent::Disconnected { .. } => "disconnected",
            ServerEvent::Failed { .. } => "failed",
        })
        .collect();

    assert_eq!(kinds, vec!["connected", "listed", "sent", "not-found", "disconnected"]);
}
