//! Client HTTP de l'API des propriétés
//!
//! Chaque requête porte le jeton en `Authorization: Bearer`. Un jeton expiré
//! est refusé avant l'envoi; un 401/403 du serveur devient
//! `AuthError::Rejected`, jamais réessayé.

mod dto;

pub use dto::{
    Analysis, AnalysisResponse, AnalysisResults, Elevation, Ndvi, PropertyUpdate, ReportFile,
    Slope, Weather,
};

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use rural_csv::PropertyRecord;

use crate::auth::{AuthError, AuthToken};
use crate::types::Property;
use dto::{
    ErrorBody, ImportRequest, ImportResponse, ListResponse, PropertyResponse, ReportRequest,
    ReportResponse,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Erreurs de l'API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

/// Client de l'API REST
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: AuthToken,
}

impl ApiClient {
    pub fn new(base_url: &str, token: AuthToken) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("rural-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET /properties`
    pub async fn list_properties(&self) -> Result<Vec<Property>, ApiError> {
        let response = self.send(self.client.get(self.endpoint("properties"))).await?;
        let body: ListResponse = decode(response).await?;

        debug!(
            count = body.properties.len(),
            reported = ?body.count,
            "Properties loaded"
        );
        Ok(body.properties)
    }

    /// `POST /properties/import`; retourne le nombre de propriétés importées
    pub async fn import_properties(&self, records: &[PropertyRecord]) -> Result<usize, ApiError> {
        let request = self
            .client
            .post(self.endpoint("properties/import"))
            .json(&ImportRequest {
                properties: records,
            });
        let body: ImportResponse = decode(self.send(request).await?).await?;

        info!(submitted = records.len(), imported = body.imported, "Import submitted");
        Ok(body.imported)
    }

    /// `POST /properties`
    pub async fn create_property(&self, record: &PropertyRecord) -> Result<Property, ApiError> {
        let request = self.client.post(self.endpoint("properties")).json(record);
        let body: PropertyResponse = decode(self.send(request).await?).await?;

        info!(id = %body.property.id, name = %body.property.name, "Property created");
        Ok(body.property)
    }

    /// `PUT /properties/{id}`
    pub async fn update_property(
        &self,
        id: &str,
        update: &PropertyUpdate,
    ) -> Result<Property, ApiError> {
        let request = self
            .client
            .put(self.endpoint(&format!("properties/{}", id)))
            .json(update);
        let body: PropertyResponse = decode(self.send(request).await?).await?;

        info!(id = %id, "Property updated");
        Ok(body.property)
    }

    /// `DELETE /properties/{id}`
    pub async fn delete_property(&self, id: &str) -> Result<(), ApiError> {
        self.send(self.client.delete(self.endpoint(&format!("properties/{}", id))))
            .await?;

        info!(id = %id, "Property deleted");
        Ok(())
    }

    /// `GET /properties/{id}/analysis`
    pub async fn get_analysis(&self, id: &str) -> Result<AnalysisResponse, ApiError> {
        let request = self
            .client
            .get(self.endpoint(&format!("properties/{}/analysis", id)));
        decode(self.send(request).await?).await
    }

    /// `POST /properties/report`; le PDF arrive encodé en base64
    pub async fn generate_report(&self, property_ids: &[String]) -> Result<ReportFile, ApiError> {
        let request = self
            .client
            .post(self.endpoint("properties/report"))
            .json(&ReportRequest { property_ids });
        let body: ReportResponse = decode(self.send(request).await?).await?;

        let pdf = STANDARD
            .decode(body.pdf.trim())
            .map_err(|e| ApiError::Decode(format!("report is not valid base64: {}", e)))?;

        info!(filename = %body.filename, bytes = pdf.len(), "Report generated");
        Ok(ReportFile {
            filename: body.filename,
            pdf,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        self.token.ensure_valid()?;

        let response = request
            .bearer_auth(self.token.as_str())
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::Rejected(status.as_u16()).into());
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}
