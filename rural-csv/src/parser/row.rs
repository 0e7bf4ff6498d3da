//! Validation et conversion d'une ligne de données

use crate::error::RowErrorKind;
use crate::parser::header::{Header, DESCRIPTION_COLUMN};
use crate::types::{Coordinate, PropertyRecord, PropertyType};

/// Nombre minimal de points pour un anneau (fermeture implicite)
pub const MIN_POINTS: usize = 4;

/// Longueur minimale du nom
pub const MIN_NAME_LEN: usize = 2;

/// Valide une ligne déjà découpée et la convertit en `PropertyRecord`.
///
/// S'arrête au premier champ invalide. Le nombre de champs doit avoir été
/// vérifié par l'appelant.
pub fn validate(header: &Header, fields: &[String]) -> Result<PropertyRecord, RowErrorKind> {
    let get = |name: &str| field(header, fields, name);

    let name = get("nome");
    if name.chars().count() < MIN_NAME_LEN {
        return Err(RowErrorKind::InvalidName);
    }

    let property_type = parse_type(get("tipo"))?;

    let area = parse_positive(get("area")).ok_or(RowErrorKind::InvalidArea)?;
    let perimeter = parse_positive(get("perimetro")).ok_or(RowErrorKind::InvalidPerimeter)?;

    let coordinates = parse_coordinates(get("coordenadas")).ok_or(RowErrorKind::InvalidCoordinates)?;

    let description = Some(get(DESCRIPTION_COLUMN))
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Ok(PropertyRecord {
        name: name.to_string(),
        property_type,
        description,
        area,
        perimeter,
        coordinates,
    })
}

fn field<'a>(header: &Header, fields: &'a [String], name: &str) -> &'a str {
    header
        .position(name)
        .and_then(|idx| fields.get(idx))
        .map(|s| s.trim())
        .unwrap_or("")
}

/// `tipo` vide → fazenda, sinon doit appartenir à l'énumération
fn parse_type(raw: &str) -> Result<PropertyType, RowErrorKind> {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return Ok(PropertyType::default());
    }
    value
        .parse::<PropertyType>()
        .map_err(|_| RowErrorKind::InvalidType(value))
}

/// Lecture d'un flottant à la manière de `parseFloat`: seul le préfixe
/// numérique compte ("10.5ha" → 10.5). Rejette NaN, l'infini et <= 0.
pub fn parse_positive(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let (value, consumed) = fast_float::parse_partial::<f64, _>(s).ok()?;
    if consumed == 0 || !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some(value)
}

/// Parse un littéral JSON `[[lng, lat], ...]` d'au moins 4 points
pub fn parse_coordinates(raw: &str) -> Option<Vec<Coordinate>> {
    let coords: Vec<Coordinate> = serde_json::from_str(raw).ok()?;
    (coords.len() >= MIN_POINTS).then_some(coords)
}
