//! Client de notifications avec reconnexion exponentielle
//!
//! Une seule connexion à la fois. Chaque `connect()` ou `close()` incrémente
//! le compteur de génération et annule la tâche précédente (socket et timer
//! de reconnexion compris). Les notifications sont livrées dans une
//! `Envelope` portant leur génération: le consommateur écarte celles dont la
//! génération n'est plus la génération courante.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::backoff::{Backoff, ChannelConfig};
use super::message::{decode, Decoded, Notification, OutboundMessage};
use super::transport::{url_with_token, Connection, Connector, TransportError, WsConnector};

/// État du canal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

/// Notification étiquetée avec la génération de la connexion qui l'a reçue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub generation: u64,
    pub notification: Notification,
}

/// État partagé entre le client et sa tâche de connexion.
/// Le verrou n'est jamais tenu à travers un `.await`.
#[derive(Default)]
struct Shared {
    generation: u64,
    attempts: u32,
    task: Option<JoinHandle<()>>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    topics: BTreeSet<String>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Client du canal de notifications
pub struct NotificationClient<C: Connector = WsConnector> {
    connector: Arc<C>,
    config: ChannelConfig,
    shared: Arc<Mutex<Shared>>,
    state_tx: Arc<watch::Sender<ChannelState>>,
    events_tx: mpsc::UnboundedSender<Envelope>,
}

impl<C: Connector> NotificationClient<C> {
    /// Crée un client déconnecté et le récepteur de ses notifications
    pub fn new(connector: C, config: ChannelConfig) -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ChannelState::Disconnected);

        let client = Self {
            connector: Arc::new(connector),
            config,
            shared: Arc::new(Mutex::new(Shared::default())),
            state_tx: Arc::new(state_tx),
            events_tx,
        };
        (client, events_rx)
    }

    pub fn state(&self) -> ChannelState {
        *self.state_tx.borrow()
    }

    /// Récepteur des changements d'état
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state_tx.subscribe()
    }

    /// Génération courante; toute `Envelope` d'une autre génération est périmée
    pub fn generation(&self) -> u64 {
        lock(&self.shared).generation
    }

    /// Tentatives de reconnexion consécutives depuis la dernière ouverture
    pub fn reconnect_attempts(&self) -> u32 {
        lock(&self.shared).attempts
    }

    /// Topics souscrits sur la connexion ouverte
    pub fn topics(&self) -> Vec<String> {
        lock(&self.shared).topics.iter().cloned().collect()
    }

    /// Ouvre le canal vers `url?token=<token>`.
    ///
    /// Toute connexion ou reconnexion en cours est d'abord annulée. Doit être
    /// appelé depuis un runtime tokio.
    pub fn connect(&self, url: &str, token: &str) -> Result<(), TransportError> {
        let url = url_with_token(url, token)?;

        let mut shared = lock(&self.shared);
        teardown(&mut shared);
        shared.generation += 1;
        let generation = shared.generation;

        self.state_tx.send_replace(ChannelState::Connecting);
        info!(generation, host = url.host_str().unwrap_or(""), "Connecting notification channel");

        let worker = Worker {
            generation,
            url,
            connector: Arc::clone(&self.connector),
            config: self.config.clone(),
            shared: Arc::clone(&self.shared),
            state_tx: Arc::clone(&self.state_tx),
            events_tx: self.events_tx.clone(),
        };
        shared.task = Some(tokio::spawn(worker.run()));

        Ok(())
    }

    /// Envoie un message JSON si le canal est ouvert.
    ///
    /// Retourne `false` (et journalise) sinon; les erreurs de transport ne
    /// remontent jamais à l'appelant.
    pub fn send_message<T: Serialize>(&self, payload: &T) -> bool {
        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize notification message");
                return false;
            }
        };

        let shared = lock(&self.shared);
        match (&shared.outbound, self.state()) {
            (Some(tx), ChannelState::Open) => tx.send(text).is_ok(),
            (_, state) => {
                debug!(?state, "Notification channel not open, message dropped");
                false
            }
        }
    }

    /// Fermeture explicite: annule la connexion et le timer de reconnexion
    pub fn close(&self) {
        let mut shared = lock(&self.shared);
        teardown(&mut shared);
        // Les envelopes encore en file deviennent périmées
        shared.generation += 1;
        self.state_tx.send_replace(ChannelState::Disconnected);
        info!("Notification channel closed");
    }
}

impl<C: Connector> Drop for NotificationClient<C> {
    fn drop(&mut self) {
        teardown(&mut lock(&self.shared));
    }
}

fn teardown(shared: &mut Shared) {
    if let Some(task) = shared.task.take() {
        task.abort();
    }
    shared.outbound = None;
    shared.topics.clear();
    shared.attempts = 0;
}

/// Tâche propriétaire d'une génération: connexion, lecture, reconnexion
struct Worker<C: Connector> {
    generation: u64,
    url: Url,
    connector: Arc<C>,
    config: ChannelConfig,
    shared: Arc<Mutex<Shared>>,
    state_tx: Arc<watch::Sender<ChannelState>>,
    events_tx: mpsc::UnboundedSender<Envelope>,
}

enum Step {
    Frame(Option<Result<String, TransportError>>),
    Outbound(String),
}

impl<C: Connector> Worker<C> {
    async fn run(self) {
        let mut backoff = Backoff::new(&self.config);

        loop {
            if !self.publish(ChannelState::Connecting) {
                return;
            }

            match self.connector.open(&self.url).await {
                Ok(conn) => {
                    backoff.reset();
                    self.serve(conn).await;
                }
                Err(e) => {
                    warn!(generation = self.generation, error = %e, "Notification channel failed to open");
                }
            }

            if !self.publish(ChannelState::Closed) {
                return;
            }

            let Some(delay) = backoff.next_delay() else {
                warn!(
                    attempts = backoff.attempts(),
                    "Reconnect attempts exhausted, notification channel going silent"
                );
                self.publish(ChannelState::Disconnected);
                return;
            };

            {
                let mut shared = lock(&self.shared);
                if shared.generation != self.generation {
                    return;
                }
                shared.attempts = backoff.attempts();
            }
            info!(
                attempt = backoff.attempts(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting notification channel"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Publie un état si cette génération est toujours la génération courante
    fn publish(&self, state: ChannelState) -> bool {
        let shared = lock(&self.shared);
        if shared.generation != self.generation {
            return false;
        }
        self.state_tx.send_replace(state);
        true
    }

    async fn serve(&self, mut conn: Box<dyn Connection>) {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        {
            let mut shared = lock(&self.shared);
            if shared.generation != self.generation {
                return;
            }
            shared.outbound = Some(out_tx);
            shared.attempts = 0;
            self.state_tx.send_replace(ChannelState::Open);
        }
        info!(generation = self.generation, "Notification channel open");

        self.subscribe(conn.as_mut()).await;

        loop {
            let step = tokio::select! {
                frame = conn.recv_text() => Step::Frame(frame),
                Some(text) = out_rx.recv() => Step::Outbound(text),
            };

            match step {
                Step::Frame(Some(Ok(text))) => self.dispatch(&text),
                Step::Frame(Some(Err(e))) => {
                    warn!(error = %e, "Notification channel error");
                    break;
                }
                Step::Frame(None) => {
                    info!(generation = self.generation, "Notification channel closed by server");
                    break;
                }
                Step::Outbound(text) => {
                    if let Err(e) = conn.send_text(text).await {
                        warn!(error = %e, "Failed to send notification message");
                    }
                }
            }
        }

        let mut shared = lock(&self.shared);
        if shared.generation == self.generation {
            shared.outbound = None;
            shared.topics.clear();
        }
    }

    async fn subscribe(&self, conn: &mut dyn Connection) {
        let topic = self.config.topic.clone();
        let message = OutboundMessage::Subscribe {
            topic: topic.clone(),
        };

        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize subscribe message");
                return;
            }
        };

        match conn.send_text(text).await {
            Ok(()) => {
                debug!(topic = %topic, "Subscribed");
                let mut shared = lock(&self.shared);
                if shared.generation == self.generation {
                    shared.topics.insert(topic);
                }
            }
            Err(e) => warn!(topic = %topic, error = %e, "Failed to subscribe"),
        }
    }

    fn dispatch(&self, text: &str) {
        match decode(text) {
            Decoded::Empty => warn!("Received empty notification frame"),
            Decoded::Malformed(e) => {
                warn!(error = %e, raw = text, "Malformed notification payload");
            }
            Decoded::Ignored => debug!(raw = text, "Ignoring unrecognized notification payload"),
            Decoded::Notification(notification) => {
                debug!(?notification, "Notification received");
                let envelope = Envelope {
                    generation: self.generation,
                    notification,
                };
                if self.events_tx.send(envelope).is_err() {
                    debug!("Notification receiver dropped");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Refusing;

    #[async_trait]
    impl Connector for Refusing {
        async fn open(&self, _url: &Url) -> Result<Box<dyn Connection>, TransportError> {
            Err(TransportError::Connect("refused".into()))
        }
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (client, _events) = NotificationClient::new(Refusing, ChannelConfig::default());
        assert_eq!(client.state(), ChannelState::Disconnected);
        assert_eq!(client.generation(), 0);
        assert!(client.topics().is_empty());
    }

    #[tokio::test]
    async fn test_send_message_when_not_open_is_noop() {
        let (client, _events) = NotificationClient::new(Refusing, ChannelConfig::default());
        let sent = client.send_message(&serde_json::json!({"action": "ping"}));
        assert!(!sent);
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let (client, _events) = NotificationClient::new(Refusing, ChannelConfig::default());
        assert!(client.connect("::not a url::", "tok").is_err());
        assert_eq!(client.state(), ChannelState::Disconnected);
        assert_eq!(client.generation(), 0);
    }

    #[tokio::test]
    async fn test_close_bumps_generation() {
        let (client, _events) = NotificationClient::new(Refusing, ChannelConfig::default());
        client.connect("ws://localhost:1", "tok").unwrap();
        assert_eq!(client.generation(), 1);
        assert_eq!(client.state(), ChannelState::Connecting);

        client.close();
        assert_eq!(client.generation(), 2);
        assert_eq!(client.state(), ChannelState::Disconnected);
    }
}
