//! Types de données pour le crate rural-csv

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RowError;

/// Paire `[longitude, latitude]` en WGS84
pub type Coordinate = [f64; 2];

/// Type de propriété rurale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[default]
    Fazenda,
    Sitio,
    Chacara,
    Terreno,
    Outros,
}

impl PropertyType {
    pub const ALL: [PropertyType; 5] = [
        PropertyType::Fazenda,
        PropertyType::Sitio,
        PropertyType::Chacara,
        PropertyType::Terreno,
        PropertyType::Outros,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Fazenda => "fazenda",
            PropertyType::Sitio => "sitio",
            PropertyType::Chacara => "chacara",
            PropertyType::Terreno => "terreno",
            PropertyType::Outros => "outros",
        }
    }

    /// Libellé avec majuscule initiale pour l'affichage
    pub fn label(&self) -> String {
        let s = self.as_str();
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid property type: {}. Use: fazenda, sitio, chacara, terreno, outros",
                    s
                )
            })
    }
}

/// Propriété validée, prête à être envoyée à l'API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub name: String,

    #[serde(rename = "type")]
    pub property_type: PropertyType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Surface en hectares
    pub area: f64,

    /// Périmètre en mètres
    pub perimeter: f64,

    /// Anneau extérieur, fermeture implicite
    pub coordinates: Vec<Coordinate>,
}

/// Lot issu du parsing d'un fichier: lignes valides + erreurs par ligne
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportBatch {
    /// Propriétés valides, dans l'ordre du fichier
    pub records: Vec<PropertyRecord>,

    /// Lignes rejetées, dans l'ordre du fichier
    pub errors: Vec<RowError>,
}

impl ImportBatch {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total_area(&self) -> f64 {
        self.records.iter().map(|r| r.area).sum()
    }

    pub fn total_perimeter(&self) -> f64 {
        self.records.iter().map(|r| r.perimeter).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_roundtrip_str() {
        for t in PropertyType::ALL {
            assert_eq!(t.as_str().parse::<PropertyType>().unwrap(), t);
        }
        assert!("granja".parse::<PropertyType>().is_err());
        assert_eq!(PropertyType::Chacara.label(), "Chacara");
    }

    #[test]
    fn test_record_serializes_api_shape() {
        let record = PropertyRecord {
            name: "Sítio Boa Vista".into(),
            property_type: PropertyType::Sitio,
            description: None,
            area: 12.5,
            perimeter: 1400.0,
            coordinates: vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]],
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "sitio");
        assert_eq!(json["coordinates"][1][1], 1.0);
        assert!(json.get("description").is_none());
    }
}
