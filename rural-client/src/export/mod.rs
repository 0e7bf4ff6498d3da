//! Export des contours de propriétés

pub mod geojson;
