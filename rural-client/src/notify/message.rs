//! Messages échangés sur le canal de notifications

use serde::{Deserialize, Serialize};

/// Message envoyé au serveur
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum OutboundMessage {
    Subscribe { topic: String },
}

/// Forme des messages serveur reconnus
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    AnalysisNotification {
        event: AnalysisEvent,
        #[serde(rename = "propertyId", default)]
        property_id: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum AnalysisEvent {
    Completed,
    #[serde(other)]
    Other,
}

/// Notification utile transmise au consommateur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    AnalysisCompleted {
        property_id: Option<String>,
        message: Option<String>,
    },
}

/// Résultat du décodage d'une trame texte
#[derive(Debug)]
pub enum Decoded {
    /// Trame vide ou blanche
    Empty,
    /// JSON illisible
    Malformed(serde_json::Error),
    /// JSON valide mais forme non reconnue
    Ignored,
    Notification(Notification),
}

/// Décode une trame texte. Ne panique jamais: toute forme inconnue est ignorée.
pub fn decode(text: &str) -> Decoded {
    if text.trim().is_empty() {
        return Decoded::Empty;
    }

    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => return Decoded::Malformed(e),
    };

    match serde_json::from_value::<ServerMessage>(value) {
        Ok(ServerMessage::AnalysisNotification {
            event: AnalysisEvent::Completed,
            property_id,
            message,
        }) => Decoded::Notification(Notification::AnalysisCompleted {
            property_id,
            message,
        }),
        Ok(ServerMessage::AnalysisNotification { .. }) | Err(_) => Decoded::Ignored,
    }
}
