//! Opening the raw frame connection.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::error::{TransportError, TransportResult};

/// Engine.IO protocol revision spoken by this client.
pub const ENGINE_IO_VERSION: u8 = 4;

/// A live text-frame connection.
///
/// `incoming` ends when the peer goes away; dropping `outgoing` closes the
/// socket.
pub struct Connection {
    /// Frames received from the server.
    pub incoming: mpsc::UnboundedReceiver<String>,
    /// Frames to send to the server.
    pub outgoing: mpsc::UnboundedSender<String>,
}

/// Opens connections to the backend.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open one connection to `endpoint`.
    ///
    /// # Errors
    /// Returns an error if the server cannot be reached.
    async fn connect(&self, endpoint: &Url) -> TransportResult<Connection>;
}

/// Connector speaking Engine.IO over WebSocket.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &Url) -> TransportResult<Connection> {
        let ws_url = socket_io_url(endpoint)?;
        tracing::debug!(url = %ws_url, "Opening websocket");

        let (stream, _) = connect_async(ws_url.as_str()).await?;
        let (mut sink, mut source) = stream.split();

        let (incoming_tx, incoming) = mpsc::unbounded_channel::<String>();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                if let Err(err) = sink.send(Message::Text(frame)).await {
                    tracing::debug!(%err, "Websocket write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if incoming_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::debug!(%err, "Websocket read failed");
                        break;
                    }
                }
            }
        });

        Ok(Connection { incoming, outgoing })
    }
}

/// Build the Engine.IO WebSocket URL for a server origin.
///
/// `http`/`https` become `ws`/`wss`; an empty path becomes `/socket.io/`.
///
/// # Errors
/// Returns an error for schemes other than http, https, ws and wss.
pub fn socket_io_url(endpoint: &Url) -> TransportResult<Url> {
    let mut url = endpoint.clone();
    let scheme = match endpoint.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TransportError::InvalidEndpoint(format!(
                "unsupported scheme {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| TransportError::InvalidEndpoint(endpoint.to_string()))?;

    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/socket.io/");
    }
    url.set_query(Some(&format!(
        "EIO={ENGINE_IO_VERSION}&transport=websocket"
    )));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_io_url_from_http_origin() {
        let url = socket_io_url(&Url::parse("http://localhost:5000").unwrap()).unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_io_url_keeps_custom_path() {
        let url = socket_io_url(&Url::parse("https://helix.dev/realtime/").unwrap()).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://helix.dev/realtime/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_io_url_rejects_other_schemes() {
        assert!(socket_io_url(&Url::parse("ftp://helix.dev").unwrap()).is_err());
    }
}
