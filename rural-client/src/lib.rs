//! # rural-client
//!
//! Client du Sistema Rural: propriétés, import CSV et notifications d'analyse.
//!
//! ## Features
//!
//! - Client HTTP de l'API des propriétés (jeton bearer)
//! - Import CSV avec aperçu et rapport avant envoi
//! - Canal WebSocket avec reconnexion exponentielle et compteur de génération
//! - Export GeoJSON des contours
//! - CLI simple
//!
//! ## Usage CLI
//!
//! ```bash
//! # Vérifier un fichier sans rien envoyer
//! rural import --file ./fazendas.csv --dry-run --report ./import.json
//!
//! # Importer puis suivre les analyses
//! rural import --file ./fazendas.csv
//! rural listen
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod notify;
pub mod report;
pub mod state;
pub mod types;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, AuthToken};
pub use config::ClientConfig;
pub use dashboard::{Dashboard, DashboardError};
pub use report::{ImportReport, ImportStatus};
pub use state::{AppState, DashboardStats};
pub use types::{AnalysisStatus, Property, Toast};
