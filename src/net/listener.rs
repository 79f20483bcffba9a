//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Resolve Go-style addresses (":8080") to bindable ones
//! - Bind to the configured address
//! - Enforce max_connections limit via semaphore
//! - Graceful handling of accept errors

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ServerError;

/// Expand a bare `:port` into an all-interfaces address.
pub fn resolve_bind_address(address: &str) -> String {
    let address = address.trim();
    if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    }
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// accepting waits until a connection closes and returns its slot.
pub struct BoundedListener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    max_connections: usize,
}

impl BoundedListener {
    /// Bind to `address` with the given connection limit.
    pub async fn bind(address: &str, max_connections: usize) -> Result<Self, ServerError> {
        let resolved = resolve_bind_address(address);

        let inner = TcpListener::bind(resolved.as_str())
            .await
            .map_err(|source| ServerError::Bind {
                address: resolved.clone(),
                source,
            })?;

        let local_addr = inner.local_addr().map_err(|source| ServerError::Bind {
            address: resolved.clone(),
            source,
        })?;

        tracing::info!(
            address = %local_addr,
            max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Get configured maximum connections.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

impl axum::serve::Listener for BoundedListener {
    type Io = LimitedStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            // Acquire permit first (backpressure)
            let permit = self
                .connection_limit
                .clone()
                .acquire_owned()
                .await
                .expect("connection semaphore is never closed");

            match self.inner.accept().await {
                Ok((stream, addr)) => {
                    tracing::debug!(
                        peer_addr = %addr,
                        available_permits = self.connection_limit.available_permits(),
                        "Connection accepted"
                    );
                    return (
                        LimitedStream {
                            stream,
                            _permit: permit,
                        },
                        addr,
                    );
                }
                Err(e) => {
                    drop(permit);
                    handle_accept_error(e).await;
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

async fn handle_accept_error(e: io::Error) {
    if is_connection_error(&e) {
        return;
    }

    // Typically EMFILE; back off so the loop doesn't spin.
    tracing::error!(error = %e, "Failed to accept connection");
    tokio::time::sleep(Duration::from_secs(1)).await;
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// An accepted TCP stream holding one connection slot.
///
/// The slot is released when the stream is dropped, so backpressure holds
/// even if the connection task panics.
#[derive(Debug)]
pub struct LimitedStream {
    stream: TcpStream,
    _permit: OwnedSemaphorePermit,
}

impl AsyncRead for LimitedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for LimitedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.stream.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::serve::Listener;

    #[test]
    fn bare_port_binds_all_interfaces() {
        assert_eq!(resolve_bind_address(":8080"), "0.0.0.0:8080");
        assert_eq!(resolve_bind_address(" :9000 "), "0.0.0.0:9000");
        assert_eq!(resolve_bind_address("127.0.0.1:3000"), "127.0.0.1:3000");
    }

    #[tokio::test]
    async fn bind_conflict_is_bind_error() {
        let first = BoundedListener::bind("127.0.0.1:0", 4).await.unwrap();
        let taken = first.local_addr().unwrap().to_string();

        match BoundedListener::bind(&taken, 4).await {
            Err(ServerError::Bind { address, source }) => {
                assert_eq!(address, taken);
                assert_eq!(source.kind(), io::ErrorKind::AddrInUse);
            }
            Err(other) => panic!("expected bind error, got {other}"),
            Ok(_) => panic!("second bind on {taken} succeeded"),
        }
    }

    #[tokio::test]
    async fn garbage_address_is_bind_error() {
        let result = BoundedListener::bind("not an address", 4).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn accepted_stream_holds_a_slot() {
        let mut listener = BoundedListener::bind("127.0.0.1:0", 2).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_eq!(listener.max_connections(), 2);

        let _client = TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await;
        assert_eq!(listener.available_permits(), 1);

        drop(stream);
        assert_eq!(listener.available_permits(), 2);
    }
}
