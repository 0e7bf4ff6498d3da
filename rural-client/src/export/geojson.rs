//! Export vers GeoJSON avec geozero (streaming)
//!
//! Chaque propriété devient une Feature `Polygon` en WGS84; l'anneau est
//! fermé si le contour source ne l'est pas.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geo::{Coord, Geometry, LineString, Polygon};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use serde::Serialize;

use rural_csv::metrics::close_ring;
use rural_csv::{Coordinate, PropertyRecord};

use crate::types::{AnalysisStatus, Property};

/// Attributs écrits dans `properties`
#[derive(Serialize)]
struct FeatureProperties<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    property_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    area: f64,
    perimeter: f64,
    #[serde(rename = "analysisStatus", skip_serializing_if = "Option::is_none")]
    analysis_status: Option<AnalysisStatus>,
}

/// Exporte un lot CSV validé (aperçu avant envoi)
pub fn export_records(records: &[PropertyRecord], output_path: &Path) -> Result<()> {
    write_file(output_path, |writer| {
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                write!(writer, ",")?;
            }
            let props = FeatureProperties {
                name: &record.name,
                property_type: record.property_type.as_str(),
                description: record.description.as_deref(),
                area: record.area,
                perimeter: record.perimeter,
                analysis_status: None,
            };
            write_feature(writer, None, &props, &record.coordinates)?;
        }
        Ok(())
    })
}

/// Exporte les propriétés enregistrées côté serveur
pub fn export_properties(properties: &[Property], output_path: &Path) -> Result<()> {
    write_file(output_path, |writer| {
        for (i, property) in properties.iter().enumerate() {
            if i > 0 {
                write!(writer, ",")?;
            }
            let props = FeatureProperties {
                name: &property.name,
                property_type: property.property_type.as_str(),
                description: Some(property.description.as_str()).filter(|d| !d.is_empty()),
                area: property.area,
                perimeter: property.perimeter,
                analysis_status: Some(property.analysis_status),
            };
            write_feature(writer, Some(&property.id), &props, &property.coordinates)?;
        }
        Ok(())
    })
}

fn write_file<F>(output_path: &Path, features: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    write!(writer, r#"{{"type":"FeatureCollection","features":["#)?;
    features(&mut writer)?;
    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(())
}

fn polygon(coords: &[Coordinate]) -> Geometry<f64> {
    let ring: LineString = close_ring(coords)
        .into_iter()
        .map(|[x, y]| Coord { x, y })
        .collect::<Vec<_>>()
        .into();
    Geometry::Polygon(Polygon::new(ring, vec![]))
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(
    writer: &mut W,
    id: Option<&str>,
    props: &FeatureProperties<'_>,
    coords: &[Coordinate],
) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","#)?;
    if let Some(id) = id {
        write!(writer, r#""id":"#)?;
        serde_json::to_writer(&mut *writer, id)?;
        write!(writer, ",")?;
    }

    write!(writer, r#""geometry":"#)?;
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    polygon(coords).process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(writer, r#","properties":"#)?;
    serde_json::to_writer(&mut *writer, props)?;
    write!(writer, "}}")?;

    Ok(())
}
