//! Noticeboard CLI Client
//!
//! Command-line interface for listing and downloading notices.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use noticeboard::{Client, Config, Download};
use tracing_subscriber::{fmt, EnvFilter};

/// Noticeboard CLI
#[derive(Parser, Debug)]
#[command(name = "noticeboard-cli")]
#[command(about = "List and download notices from a Noticeboard server")]
#[command(version)]
struct Args {
    /// Server address (host or host:port, default port 12345)
    #[arg(short, long, default_value = "127.0.0.1")]
    server: String,

    /// Connect timeout in milliseconds (0 disables)
    #[arg(long, default_value = "5000")]
    connect_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the notices on the server
    List,

    /// Download a notice
    Get {
        /// Notice name
        name: String,

        /// Where to save it (defaults to the notice name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    let config = match Config::builder().connect_timeout_ms(args.connect_timeout_ms).build() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };
    let client = Client::with_config(&args.server, &config);

    let code = match args.command {
        Commands::List => match client.list_notices() {
            Ok(names) => {
                for name in names {
                    println!("{}", name);
                }
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Commands::Get { name, output } => {
            let path = output.unwrap_or_else(|| PathBuf::from(&name));
            match client.download_to_path(&name, &path) {
                Ok(Download::Complete { bytes }) => {
                    println!("File {} downloaded successfully ({} bytes).", name, bytes);
                    0
                }
                Ok(Download::NotFound) => {
                    eprintln!("File {} not found on the server.", name);
                    3
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }
    };

    std::process::exit(code);
}
