//! Client duplex I/O
//!
//! The client runs two loops at once over one connection: operator input to
//! the socket, and socket to the display. They share nothing but the
//! connection and a `CancellationToken`. Whichever loop ends first cancels
//! the token; the other observes it and stops.

use std::net::SocketAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ChatError;
use crate::message::{
    chat_frames, encode_name_slot, trim_line, ACK_OK, EXIT_TOKEN, PASSWORD_BUFFER, RELAY_BUFFER,
    REPLY_BUFFER,
};
use crate::types::DisplayName;

/// Input prompt shown to the operator
pub const PROMPT: &[u8] = b"> ";

/// Client half of the handshake: send the password, wait for `OK`, send the name slot
///
/// The password always goes out newline-terminated, so even an empty one
/// reaches the server and gets a reply.
pub async fn authenticate<S>(
    stream: &mut S,
    password: &str,
    name: &DisplayName,
    server_addr: SocketAddr,
) -> Result<(), ChatError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let password = trim_line(password.as_bytes());
    let password = &password[..password.len().min(PASSWORD_BUFFER - 1)];
    let mut line = Vec::with_capacity(password.len() + 1);
    line.extend_from_slice(password);
    line.push(b'\n');
    stream.write_all(&line).await?;
    stream.flush().await?;

    let mut reply = [0u8; REPLY_BUFFER];
    let n = stream.read(&mut reply).await?;
    if trim_line(&reply[..n]) != ACK_OK {
        return Err(ChatError::auth(server_addr));
    }

    stream.write_all(&encode_name_slot(name)).await?;
    stream.flush().await?;
    Ok(())
}

/// Read operator lines and send them as `name: text\n` frames
///
/// A line reading `exit`, or the end of input, ends the loop.
pub async fn send_loop<I, P, W>(
    mut input: I,
    mut prompt: P,
    mut writer: W,
    name: DisplayName,
    shutdown: CancellationToken,
) -> Result<(), ChatError>
where
    I: AsyncBufRead + Unpin,
    P: AsyncWrite + Unpin,
    W: AsyncWrite + Unpin,
{
    let _cancel_on_exit = shutdown.clone().drop_guard();
    let mut line = String::new();

    loop {
        prompt.write_all(PROMPT).await?;
        prompt.flush().await?;

        line.clear();
        let n = tokio::select! {
            _ = shutdown.cancelled() => break,
            read = input.read_line(&mut line) => read?,
        };

        let text = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
        if n == 0 || text == EXIT_TOKEN {
            break;
        }

        for frame in chat_frames(&name, text) {
            writer.write_all(frame.as_bytes()).await?;
        }
        writer.flush().await?;
    }

    debug!("Send loop finished");
    Ok(())
}

/// Copy whatever the server sends to the display, re-issuing the prompt
///
/// A zero-byte read means the server closed the connection; a read error
/// is handled the same way.
pub async fn recv_loop<R, D>(
    mut reader: R,
    mut display: D,
    shutdown: CancellationToken,
) -> Result<(), ChatError>
where
    R: AsyncRead + Unpin,
    D: AsyncWrite + Unpin,
{
    let _cancel_on_exit = shutdown.clone().drop_guard();
    let mut buf = vec![0u8; RELAY_BUFFER];

    loop {
        let n = tokio::select! {
            _ = shutdown.cancelled() => break,
            read = reader.read(&mut buf) => read?,
        };
        if n == 0 {
            debug!("Server closed the connection");
            break;
        }

        display.write_all(&buf[..n]).await?;
        display.write_all(PROMPT).await?;
        display.flush().await?;
    }

    debug!("Receive loop finished");
    Ok(())
}

/// Run both loops until either finishes or `shutdown` is cancelled
///
/// Returns once both loops have stopped; dropping the halves they owned
/// closes the connection.
pub async fn run<R, W, I, P, D>(
    reader: R,
    writer: W,
    input: I,
    prompt: P,
    display: D,
    name: DisplayName,
    shutdown: CancellationToken,
) where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    I: AsyncBufRead + Unpin + Send + 'static,
    P: AsyncWrite + Unpin + Send + 'static,
    D: AsyncWrite + Unpin + Send + 'static,
{
    let send = tokio::spawn(send_loop(input, prompt, writer, name, shutdown.clone()));
    let recv = tokio::spawn(recv_loop(reader, display, shutdown.clone()));

    shutdown.cancelled().await;

    let (send, recv) = tokio::join!(send, recv);
    for (label, result) in [("send", send), ("receive", recv)] {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("{} loop ended with error: {}", label, e),
            Err(e) => debug!("{} loop task failed: {}", label, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{duplex, BufReader, ReadBuf};

    fn alice() -> DisplayName {
        DisplayName::parse("alice").unwrap()
    }

    /// Reader whose every read fails as if the peer reset the connection
    struct ResetReader;

    impl AsyncRead for ResetReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::ErrorKind::ConnectionReset.into()))
        }
    }

    #[tokio::test]
    async fn test_send_loop_frames_and_exits() {
        let input = BufReader::new(&b"hello\nhow are you\nexit\nnever sent\n"[..]);
        let mut prompt = Vec::new();
        let mut sent = Vec::new();
        let shutdown = CancellationToken::new();

        send_loop(input, &mut prompt, &mut sent, alice(), shutdown.clone())
            .await
            .unwrap();

        assert_eq!(sent, b"alice: hello\nalice: how are you\n");
        assert_eq!(prompt, b"> > > ");
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_send_loop_eof_is_exit() {
        let input = BufReader::new(&b"bye"[..]);
        let mut sent = Vec::new();
        let shutdown = CancellationToken::new();

        send_loop(input, tokio::io::sink(), &mut sent, alice(), shutdown.clone())
            .await
            .unwrap();

        assert_eq!(sent, b"alice: bye\n");
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_recv_loop_displays_until_close() {
        let (mut server, client) = duplex(256);
        let shutdown = CancellationToken::new();

        server.write_all(b"bob has joined\n").await.unwrap();
        drop(server);

        let mut display = Vec::new();
        recv_loop(client, &mut display, shutdown.clone()).await.unwrap();

        assert_eq!(display, b"bob has joined\n> ");
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_recv_loop_stops_on_cancel() {
        let (_server, client) = duplex(256);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let mut display = Vec::new();
        recv_loop(client, &mut display, shutdown).await.unwrap();
        assert!(display.is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_ok() {
        let (mut client, mut server) = duplex(256);
        let addr = "127.0.0.1:9".parse().unwrap();

        let server_task = tokio::spawn(async move {
            let mut password = [0u8; PASSWORD_BUFFER];
            let n = server.read(&mut password).await.unwrap();
            server.write_all(ACK_OK).await.unwrap();
            let mut slot = [0u8; 32];
            server.read_exact(&mut slot).await.unwrap();
            (password[..n].to_vec(), slot)
        });

        authenticate(&mut client, "12345\n", &alice(), addr).await.unwrap();

        let (password, slot) = server_task.await.unwrap();
        assert_eq!(password, b"12345\n");
        assert_eq!(slot, encode_name_slot(&alice()));
    }

    #[tokio::test]
    async fn test_authenticate_fail() {
        let (mut client, mut server) = duplex(256);
        let addr = "127.0.0.1:9".parse().unwrap();
        server.write_all(b"FAIL").await.unwrap();

        let result = authenticate(&mut client, "wrong", &alice(), addr).await;
        assert!(matches!(result, Err(ChatError::Auth { .. })));
    }

    #[tokio::test]
    async fn test_authenticate_empty_password_gets_reply() {
        let (mut client, mut server) = duplex(256);
        let addr = "127.0.0.1:9".parse().unwrap();

        let server_task = tokio::spawn(async move {
            let (mut rd, mut wr) = tokio::io::split(server);
            crate::handshake::perform(&mut rd, &mut wr, "12345", addr).await
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            authenticate(&mut client, "", &alice(), addr),
        )
        .await
        .expect("no reply to an empty password");

        assert!(matches!(result, Err(ChatError::Auth { .. })));
        let server_result = server_task.await.unwrap();
        assert!(matches!(server_result, Err(ChatError::Auth { .. })));
    }

    #[tokio::test]
    async fn test_recv_loop_read_error_cancels() {
        let shutdown = CancellationToken::new();
        let mut display = Vec::new();

        let result = recv_loop(ResetReader, &mut display, shutdown.clone()).await;

        assert!(matches!(result, Err(ChatError::Transport(_))));
        assert!(shutdown.is_cancelled());
        assert!(display.is_empty());
    }

    #[tokio::test]
    async fn test_run_ends_when_operator_exits() {
        let (server_side, client_side) = duplex(1024);
        let (reader, writer) = tokio::io::split(client_side);
        let (mut server_rd, _server_wr) = tokio::io::split(server_side);
        let input = BufReader::new(&b"hi\nexit\n"[..]);
        let shutdown = CancellationToken::new();

        tokio::time::timeout(
            Duration::from_secs(5),
            run(
                reader,
                writer,
                input,
                tokio::io::sink(),
                tokio::io::sink(),
                alice(),
                shutdown.clone(),
            ),
        )
        .await
        .expect("duplex run did not stop");

        assert!(shutdown.is_cancelled());
        let mut sent = Vec::new();
        server_rd.read_to_end(&mut sent).await.unwrap();
        assert_eq!(sent, b"alice: hi\n");
    }
}
