//! Types partagés: propriété côté serveur, statut d'analyse, toasts

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rural_csv::{Coordinate, PropertyType};

/// Statut de l'analyse géospatiale d'une propriété
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
    /// Valeur inconnue renvoyée par le serveur
    #[serde(other)]
    Unknown,
}

impl AnalysisStatus {
    /// Badge affiché à côté du nom de la propriété
    pub fn badge(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "⏳ Análise pendente",
            AnalysisStatus::Processing => "🔄 Processando",
            AnalysisStatus::Completed => "✅ Análise concluída",
            AnalysisStatus::Error => "❌ Erro na análise",
            AnalysisStatus::Unknown => "",
        }
    }
}

/// Propriété telle que renvoyée par l'API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    pub name: String,

    #[serde(rename = "type", default)]
    pub property_type: PropertyType,

    #[serde(default)]
    pub description: String,

    /// Surface en hectares
    #[serde(default)]
    pub area: f64,

    /// Périmètre en mètres
    #[serde(default)]
    pub perimeter: f64,

    #[serde(default)]
    pub coordinates: Vec<Coordinate>,

    #[serde(default)]
    pub analysis_status: AnalysisStatus,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Niveau d'un message utilisateur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ToastLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Message court destiné à l'utilisateur
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self.level {
            ToastLevel::Success => "✅",
            ToastLevel::Info => "ℹ️",
            ToastLevel::Warning => "⚠️",
            ToastLevel::Error => "❌",
        };
        write!(f, "{} {}", icon, self.message)
    }
}
