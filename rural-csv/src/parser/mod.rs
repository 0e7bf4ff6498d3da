//! Parsers pour le contenu CSV (ligne, en-tête, validation des lignes)

pub mod header;
pub mod line;
pub mod row;

pub use header::{Header, REQUIRED_COLUMNS};
pub use line::split_line;
