//! Noticeboard Server Binary
//!
//! Publishes a notice directory over TCP.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use noticeboard::events::{EventSink, ServerEvent};
use noticeboard::{Config, DirectoryStore, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// Noticeboard Server
#[derive(Parser, Debug)]
#[command(name = "noticeboard-server")]
#[command(about = "Publish a directory of notices over TCP")]
#[command(version)]
struct Args {
    /// Notice directory
    #[arg(short, long, default_value = "notices")]
    dir: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:12345")]
    listen: String,

    /// Worker threads serving connections
    #[arg(short, long, default_value = "10")]
    workers: usize,

    /// Accepted connections allowed to wait for a worker
    #[arg(short, long, default_value = "64")]
    queue: usize,

    /// Socket read timeout in milliseconds (0 disables)
    #[arg(long, default_value = "30000")]
    read_timeout_ms: u64,

    /// Socket write timeout in milliseconds (0 disables)
    #[arg(long, default_value = "30000")]
    write_timeout_ms: u64,

    /// Copy a file into the notice directory before serving (repeatable)
    #[arg(short, long = "add", value_name = "FILE")]
    add: Vec<PathBuf>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,noticeboard=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Noticeboard Server v{}", noticeboard::VERSION);
    tracing::info!("Notice directory: {}", args.dir.display());
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = match Config::builder()
        .notice_dir(&args.dir)
        .listen_addr(&args.listen)
        .worker_count(args.workers)
        .queue_capacity(args.queue)
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    let store = DirectoryStore::new(&config.notice_dir);
    for file in &args.add {
        match store.add_file(file) {
            Ok(name) => println!("File added to notices: {}", name),
            Err(e) => {
                tracing::error!("Failed to add {}: {}", file.display(), e);
                std::process::exit(1);
            }
        }
    }

    let (events, event_rx) = EventSink::channel();
    let server = match Server::bind(config, Arc::new(store)) {
        Ok(s) => s.with_events(events),
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    // Presentation: one line per event on stdout
    std::thread::spawn(move || {
        for event in event_rx.iter() {
            println!("{}", describe(&event));
        }
    });

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

fn describe(event: &ServerEvent) -> String {
    match event {
        ServerEvent::Listening { addr } => format!("Server started on {}", addr),
        ServerEvent::Connected { peer } => format!("{} connected", peer),
        ServerEvent::Listed { peer, count } => format!("Sent list of {} notices to {}", count, peer),
        ServerEvent::Sent { peer, name, bytes } => format!("Sent {} ({} bytes) to {}", name, bytes, peer),
        ServerEvent::NotFound { peer, name } => format!("{} asked for missing notice {}", peer, name),
        ServerEvent::Disconnected { peer } => format!("{} disconnected", peer),
        ServerEvent::Failed { peer, error } => format!("Connection from {} failed: {}", peer, error),
    }
}
