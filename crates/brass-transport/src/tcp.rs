//! TCP line transport.

use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::{Instant, timeout};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tracing::{debug, info, warn};

use crate::error::{TransportError, TransportResult};
use crate::observer::{Direction, SharedObserver, tracing_observer};
use crate::{LineTransport, TransportOptions, prepare_outbound};

/// A plain-text TCP connection framed on `\n`.
///
/// Inbound bytes are decoded lossily so that a stray non-UTF-8 byte from the
/// network never tears the connection down. A trailing `\r` is stripped.
pub struct TcpTransport {
    addr: String,
    reader: FramedRead<OwnedReadHalf, AnyDelimiterCodec>,
    writer: Option<OwnedWriteHalf>,
    options: TransportOptions,
    observer: SharedObserver,
    last_activity: Instant,
    connected: bool,
}

impl TcpTransport {
    /// Opens a connection to `host:port`.
    pub async fn connect(
        host: &str,
        port: u16,
        options: TransportOptions,
    ) -> TransportResult<Self> {
        let addr = format!("{host}:{port}");
        info!(addr = %addr, "Connecting to IRC server");

        let stream = match timeout(options.connect_timeout, TcpStream::connect((host, port))).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(TransportError::ConnectionFailed {
                    addr,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(TransportError::ConnectionFailed {
                    addr,
                    reason: format!("timed out after {:?}", options.connect_timeout),
                });
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
        }

        info!(addr = %addr, "Connected");
        Ok(Self::from_stream(addr, stream, options))
    }

    /// Wraps an already-connected stream.
    pub fn from_stream(addr: String, stream: TcpStream, options: TransportOptions) -> Self {
        let (read_half, write_half) = stream.into_split();
        let codec = AnyDelimiterCodec::new_with_max_length(
            b"\n".to_vec(),
            b"\n".to_vec(),
            options.max_line_length,
        );

        Self {
            addr,
            reader: FramedRead::new(read_half, codec),
            writer: Some(write_half),
            options,
            observer: tracing_observer(),
            last_activity: Instant::now(),
            connected: true,
        }
    }

    /// Replaces the wire observer.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    fn lost(&mut self, err: TransportError) -> TransportError {
        if self.connected {
            warn!(addr = %self.addr, error = %err, "Connection lost");
        }
        self.connected = false;
        err
    }
}

#[async_trait]
impl LineTransport for TcpTransport {
    fn read_line(&mut self) -> TransportResult<Option<String>> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        match self.reader.next().now_or_never() {
            None => {
                let idle = self.last_activity.elapsed();
                if idle >= self.options.read_timeout {
                    return Err(self.lost(TransportError::Timeout { idle }));
                }
                Ok(None)
            }
            Some(None) => Err(self.lost(TransportError::ConnectionClosed {
                reason: "end of stream".to_string(),
            })),
            Some(Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded))) => {
                Err(self.lost(TransportError::Io(format!(
                    "inbound line exceeds {} bytes",
                    self.options.max_line_length
                ))))
            }
            Some(Some(Err(AnyDelimiterCodecError::Io(e)))) => Err(self.lost(e.into())),
            Some(Some(Ok(bytes))) => {
                self.last_activity = Instant::now();
                let mut line = String::from_utf8_lossy(&bytes).into_owned();
                if line.ends_with('\r') {
                    line.pop();
                }
                self.observer.observe(Direction::Inbound, &line);
                Ok(Some(line))
            }
        }
    }

    async fn write_line(&mut self, line: &str) -> TransportResult<()> {
        let line = prepare_outbound(line)?;
        let writer = self.writer.as_mut().ok_or(TransportError::NotConnected)?;

        self.observer.observe(Direction::Outbound, line);

        let mut buf = Vec::with_capacity(line.len() + 2);
        buf.extend_from_slice(line.as_bytes());
        buf.extend_from_slice(b"\r\n");

        writer
            .write_all(&buf)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) {
        self.connected = false;
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                debug!(addr = %self.addr, error = %e, "Error while shutting down socket");
            }
            info!(addr = %self.addr, "Connection closed");
        }
    }

    fn peer(&self) -> String {
        self.addr.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;

    async fn pair(options: TransportOptions) -> (TcpTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (client, server) = tokio::join!(
            TcpTransport::connect("127.0.0.1", port, options),
            listener.accept()
        );
        (client.unwrap(), server.unwrap().0)
    }

    async fn next_line(transport: &mut TcpTransport) -> TransportResult<String> {
        for _ in 0..200 {
            if let Some(line) = transport.read_line()? {
                return Ok(line);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no line received");
    }

    #[tokio::test]
    async fn test_read_strips_crlf() {
        let (mut transport, mut server) = pair(TransportOptions::default()).await;
        server.write_all(b"PING :server1\r\n:a!b@c PRIVMSG #x :hi\n").await.unwrap();

        assert_eq!(next_line(&mut transport).await.unwrap(), "PING :server1");
        assert_eq!(
            next_line(&mut transport).await.unwrap(),
            ":a!b@c PRIVMSG #x :hi"
        );
        assert_eq!(transport.read_line().unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_appends_crlf() {
        let (mut transport, server) = pair(TransportOptions::default()).await;
        transport.write_line("  NICK brass  ").await.unwrap();

        let mut reader = BufReader::new(server);
        let mut received = String::new();
        reader.read_line(&mut received).await.unwrap();
        assert_eq!(received, "NICK brass\r\n");
    }

    #[tokio::test]
    async fn test_eof_is_reported() {
        let (mut transport, server) = pair(TransportOptions::default()).await;
        drop(server);

        let err = next_line(&mut transport).await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed { .. }));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let options = TransportOptions::default().with_read_timeout(Duration::from_millis(20));
        let (mut transport, _server) = pair(options).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        let err = transport.read_line().unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = TcpTransport::connect("127.0.0.1", port, TransportOptions::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
    }

    #[tokio::test]
    async fn test_write_after_close() {
        let (mut transport, _server) = pair(TransportOptions::default()).await;
        transport.close().await;
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.write_line("QUIT").await,
            Err(TransportError::NotConnected)
        ));
    }
}
