//! Jeton d'authentification émis par le fournisseur d'identité
//!
//! Le jeton n'est jamais émis ni rafraîchi ici: on lit seulement la charge
//! utile JWT pour connaître l'expiration et l'utilisateur.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Erreurs d'authentification, jamais réessayées automatiquement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no auth token available")]
    Missing,

    #[error("malformed auth token: {0}")]
    Malformed(String),

    #[error("auth token expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("auth token rejected by server (HTTP {0})")]
    Rejected(u16),
}

/// Champs utiles de la charge utile JWT
#[derive(Debug, Clone, Deserialize)]
struct Claims {
    exp: i64,
    #[serde(rename = "cognito:username")]
    username: Option<String>,
    email: Option<String>,
    name: Option<String>,
    sub: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    preferred_username: Option<String>,
}

/// Informations utilisateur extraites du jeton
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub username: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub sub: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub preferred_username: Option<String>,
}

impl UserInfo {
    /// Initiale pour l'avatar
    pub fn initial(&self) -> char {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.username)
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('U')
    }
}

/// Jeton JWT avec sa charge utile décodée
#[derive(Clone)]
pub struct AuthToken {
    raw: String,
    claims: Claims,
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("exp", &self.claims.exp)
            .field("sub", &self.claims.sub)
            .finish_non_exhaustive()
    }
}

impl AuthToken {
    /// Décode la charge utile (sans vérifier la signature)
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::Missing);
        }

        let payload = raw
            .split('.')
            .nth(1)
            .ok_or_else(|| AuthError::Malformed("expected three dot-separated segments".into()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::Malformed(format!("payload is not base64url: {}", e)))?;

        let claims: Claims = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::Malformed(format!("payload is not valid JSON: {}", e)))?;

        Ok(Self {
            raw: raw.to_string(),
            claims,
        })
    }

    /// Lit un jeton optionnel (variable d'environnement, argument CLI)
    pub fn from_option(raw: Option<&str>) -> Result<Self, AuthError> {
        Self::parse(raw.ok_or(AuthError::Missing)?)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.claims.exp, 0)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.claims.exp > now.timestamp()
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// `Err(AuthError::Expired)` si le jeton n'est plus valide
    pub fn ensure_valid(&self) -> Result<(), AuthError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(AuthError::Expired(
                self.expires_at().unwrap_or(DateTime::<Utc>::MIN_UTC),
            ))
        }
    }

    pub fn user_info(&self) -> UserInfo {
        let c = &self.claims;
        UserInfo {
            username: c
                .username
                .clone()
                .or_else(|| c.email.clone())
                .unwrap_or_else(|| "User".to_string()),
            email: c.email.clone(),
            name: c.name.clone(),
            sub: c.sub.clone(),
            given_name: c.given_name.clone(),
            family_name: c.family_name.clone(),
            preferred_username: c.preferred_username.clone(),
        }
    }
}
