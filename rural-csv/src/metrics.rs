//! Surface et périmètre d'un contour de propriété
//!
//! Le calcul est délégué à `geo`: aire sphérique (Chamberlain–Duquette) et
//! longueur haversine, en WGS84.

use geo::{ChamberlainDuquetteArea, Coord, HaversineLength, LineString, Polygon};

use crate::types::Coordinate;

/// Mesures d'un contour
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// Surface en hectares, arrondie à 2 décimales
    pub area_hectares: f64,

    /// Périmètre en mètres, arrondi au mètre
    pub perimeter_meters: f64,

    /// Anneau fermé utilisé pour le calcul
    pub coordinates: Vec<Coordinate>,
}

/// Ferme l'anneau si le dernier point diffère du premier
pub fn close_ring(coords: &[Coordinate]) -> Vec<Coordinate> {
    let mut ring = coords.to_vec();
    if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
        if first != last {
            ring.push(*first);
        }
    }
    ring
}

/// Calcule surface et périmètre. `None` si moins de 3 sommets distincts.
pub fn compute(coords: &[Coordinate]) -> Option<Metrics> {
    let ring = close_ring(coords);
    if ring.len() < 4 {
        return None;
    }

    let exterior: LineString = ring
        .iter()
        .map(|&[x, y]| Coord { x, y })
        .collect::<Vec<_>>()
        .into();
    let polygon = Polygon::new(exterior, vec![]);

    let area_m2 = polygon.chamberlain_duquette_unsigned_area();
    let perimeter_m = polygon.exterior().haversine_length();

    Some(Metrics {
        area_hectares: (area_m2 / 10_000.0 * 100.0).round() / 100.0,
        perimeter_meters: perimeter_m.round(),
        coordinates: ring,
    })
}
