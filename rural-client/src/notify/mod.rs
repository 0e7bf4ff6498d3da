//! Canal de notifications temps réel (WebSocket) avec reconnexion
//!
//! - `backoff`: délais de reconnexion exponentiels, plafonnés
//! - `message`: décodage des messages serveur en variantes typées
//! - `transport`: abstraction du socket, implémentation tungstenite
//! - `client`: machine à états et compteur de génération

pub mod backoff;
pub mod client;
pub mod message;
pub mod transport;

pub use backoff::{Backoff, ChannelConfig};
pub use client::{ChannelState, Envelope, NotificationClient};
pub use message::{Notification, OutboundMessage};
pub use transport::{Connection, Connector, TransportError, WsConnector};
