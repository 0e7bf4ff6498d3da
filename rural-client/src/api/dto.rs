//! Corps de requête et de réponse de l'API des propriétés

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rural_csv::{metrics, Coordinate, PropertyRecord, PropertyType};

use crate::types::Property;

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    pub properties: Vec<Property>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportRequest<'a> {
    pub properties: &'a [PropertyRecord],
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImportResponse {
    pub imported: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PropertyResponse {
    pub property: Property,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportRequest<'a> {
    pub property_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportResponse {
    pub pdf: String,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}

/// Mise à jour partielle d'une propriété (`PUT /properties/{id}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub perimeter: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Vec<Coordinate>>,
}

impl PropertyUpdate {
    /// Nouveau contour: surface et périmètre sont recalculés localement.
    /// `None` si le contour a moins de 3 sommets.
    pub fn with_coordinates(mut self, coords: &[Coordinate]) -> Option<Self> {
        let m = metrics::compute(coords)?;
        self.area = Some(m.area_hectares);
        self.perimeter = Some(m.perimeter_meters);
        self.coordinates = Some(m.coordinates);
        Some(self)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Réponse de `GET /properties/{id}/analysis`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub property_id: String,
    #[serde(default)]
    pub analysis: Analysis,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(default)]
    pub analysis_results: Option<AnalysisResults>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisResults {
    pub elevation: Option<Elevation>,
    pub ndvi: Option<Ndvi>,
    pub slope: Option<Slope>,
    pub weather: Option<Weather>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Elevation {
    pub avg_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    pub min_elevation: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ndvi {
    pub avg_ndvi: Option<f64>,
    pub vegetation_coverage: Option<f64>,
    pub classification: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Slope {
    pub avg_slope: Option<f64>,
    pub max_slope: Option<f64>,
    pub slope_classification: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Weather {
    pub annual_rainfall: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub climate_zone: Option<String>,
}

/// Rapport PDF décodé
#[derive(Debug, Clone)]
pub struct ReportFile {
    pub filename: String,
    pub pdf: Vec<u8>,
}

impl ReportFile {
    /// Écrit le PDF dans `dir`; seul le dernier composant du nom renvoyé
    /// par le serveur est conservé.
    pub fn save_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let name = Path::new(&self.filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "relatorio.pdf".into());
        let path = dir.join(name);
        std::fs::write(&path, &self.pdf)?;
        Ok(path)
    }
}
