//! Chatroom server - Entry Point
//!
//! Parses the port, starts the listener and ChatServer actor, and runs
//! until interrupted.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chatroom::{listener, Args, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chatroom=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatroom=info")),
        )
        .init();

    let args = match Args::from_env() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = ServerConfig::with_port(args.port);

    tokio::select! {
        result = listener::run(config) => {
            if let Err(e) = result {
                error!("Server failed: {}", e);
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    ExitCode::SUCCESS
}
