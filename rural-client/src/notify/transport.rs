//! Transport du canal de notifications

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

/// Erreurs réseau du canal, récupérées localement par la reconnexion
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid socket URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("socket error: {0}")]
    Socket(String),
}

/// Ajoute le jeton en paramètre de requête (seul mécanisme d'auth du canal)
pub fn url_with_token(base: &str, token: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// Connexion ouverte, orientée trames texte
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Prochaine trame texte; `None` quand le serveur a fermé la connexion
    async fn recv_text(&mut self) -> Option<Result<String, TransportError>>;
}

/// Ouvre des connexions vers une URL
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError>;
}

/// Connecteur WebSocket (ws:// et wss:// via rustls)
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError> {
        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }

    async fn recv_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => debug!("Ignoring non UTF-8 binary frame"),
                },
                // Les pings sont répondus par tungstenite
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Close frame received");
                    return None;
                }
                Err(e) => return Some(Err(TransportError::Socket(e.to_string()))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_with_token() {
        let url = url_with_token("wss://ws.example.com/prod", "abc.def.ghi").unwrap();
        assert_eq!(url.as_str(), "wss://ws.example.com/prod?token=abc.def.ghi");
    }

    #[test]
    fn test_url_with_token_keeps_existing_query() {
        let url = url_with_token("ws://localhost:3001/?stage=dev", "t").unwrap();
        assert_eq!(url.query(), Some("stage=dev&token=t"));
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            url_with_token("not a url", "t"),
            Err(TransportError::InvalidUrl(_))
        ));
    }
}
