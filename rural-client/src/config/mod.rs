//! Configuration du client

use serde::{Deserialize, Serialize};
use std::path::Path;

use anyhow::{Context, Result};

use crate::notify::ChannelConfig;

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// URL de base de l'API REST (ex: https://api.example.com/prod)
    pub api_base_url: String,

    /// URL du canal de notifications (ws:// ou wss://)
    pub websocket_url: String,

    /// Jeton d'accès émis par le fournisseur d'identité
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Reconnexion et topic du canal de notifications
    #[serde(default)]
    pub channel: ChannelConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".into(),
            websocket_url: "ws://localhost:3001".into(),
            token: None,
            channel: ChannelConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut channel = ChannelConfig::default();
        if let Some(max) = std::env::var("RURAL_WS_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            channel.max_attempts = max;
        }

        Self {
            api_base_url: std::env::var("RURAL_API_URL").unwrap_or(defaults.api_base_url),
            websocket_url: std::env::var("RURAL_WS_URL").unwrap_or(defaults.websocket_url),
            token: std::env::var("RURAL_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            channel,
        }
    }

    /// Charge une configuration depuis un fichier JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Fichier JSON si fourni, sinon environnement. Le jeton absent du
    /// fichier est repris de `RURAL_TOKEN`.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let mut config = Self::load(path)?;
                if config.token.is_none() {
                    config.token = Self::from_env().token;
                }
                Ok(config)
            }
            None => Ok(Self::from_env()),
        }
    }

    /// Applique les options passées en ligne de commande
    pub fn apply_overrides(
        &mut self,
        api_url: Option<String>,
        ws_url: Option<String>,
        token: Option<String>,
    ) {
        if let Some(url) = api_url {
            self.api_base_url = url;
        }
        if let Some(url) = ws_url {
            self.websocket_url = url;
        }
        if let Some(token) = token {
            self.token = Some(token);
        }
    }
}
