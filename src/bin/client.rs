//! Chatroom client - Entry Point
//!
//! Collects name and password from the operator, performs the handshake,
//! then runs the send and receive loops until `exit`, Ctrl+C, or the
//! server closes the connection.

use std::net::{Ipv4Addr, SocketAddr};
use std::process::ExitCode;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use chatroom::{duplex, Args, ChatError, DisplayName};

/// Print `prompt` and read one line from the operator
async fn ask<I>(input: &mut I, prompt: &str) -> std::io::Result<String>
where
    I: AsyncBufRead + Unpin,
{
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    input.read_line(&mut line).await?;
    Ok(line.trim_end_matches(|c: char| c == '\n' || c == '\r').to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so they never mix with the chat on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatroom=warn")),
        )
        .init();

    let args = match Args::from_env() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut input = BufReader::new(tokio::io::stdin());

    let name = match ask(&mut input, "Please enter your name: ").await {
        Ok(line) => match DisplayName::parse(line) {
            Ok(name) => name,
            Err(_) => {
                println!("Name must be less than 30 and more than 2 characters.");
                return ExitCode::FAILURE;
            }
        },
        Err(e) => {
            eprintln!("ERROR: reading name: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let server_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, args.port));
    let mut stream = match TcpStream::connect(server_addr).await {
        Ok(stream) => stream,
        Err(e) => {
            println!("ERROR: connect");
            tracing::debug!("connect to {} failed: {}", server_addr, e);
            return ExitCode::FAILURE;
        }
    };

    let password = match ask(&mut input, "Enter the password: ").await {
        Ok(password) => password,
        Err(e) => {
            eprintln!("ERROR: reading password: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match duplex::authenticate(&mut stream, &password, &name, server_addr).await {
        Ok(()) => {}
        Err(ChatError::Auth { .. }) => {
            println!("Incorrect password. Connection terminated.");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return ExitCode::FAILURE;
        }
    }

    println!("=== WELCOME TO THE CHATROOM ===");

    let shutdown = CancellationToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let (reader, writer) = stream.into_split();
    duplex::run(
        reader,
        writer,
        input,
        tokio::io::stdout(),
        tokio::io::stdout(),
        name,
        shutdown,
    )
    .await;

    println!("\nBye");

    // A pending stdin read lives on a blocking thread the runtime would wait for
    std::process::exit(0)
}
