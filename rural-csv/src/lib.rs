//! # rural-csv
//!
//! Import en masse de propriétés rurales depuis un fichier CSV.
//!
//! ## Features
//!
//! - Découpage des lignes avec `memchr` (guillemets doubles, virgules littérales)
//! - Validation stricte ligne par ligne: une ligne est valide en entier ou rejetée
//! - Erreurs par ligne collectées sans interrompre l'import
//! - Surface et périmètre des contours via `geo`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rural_csv::parse;
//!
//! let batch = parse(&content)?;
//! println!("{} propriétés valides", batch.records.len());
//!
//! for error in &batch.errors {
//!     println!("{}", error); // "Line 4: invalid area"
//! }
//! ```

pub mod error;
pub mod input;
pub mod metrics;
pub mod parser;
pub mod types;

pub use error::{FormatError, ImportError, RowError, RowErrorKind};
pub use types::{Coordinate, ImportBatch, PropertyRecord, PropertyType};

use std::path::Path;

use tracing::debug;

use crate::parser::{row, split_line, Header};

/// Parse un contenu CSV et retourne le lot de propriétés validées.
///
/// # Returns
///
/// Un `ImportBatch` contenant les propriétés valides et les erreurs par ligne
/// (numérotées à partir de 1, l'en-tête étant la ligne 1).
///
/// # Errors
///
/// `FormatError` si le fichier a moins de deux lignes, s'il manque des
/// colonnes obligatoires, ou si aucune ligne n'est valide.
pub fn parse(content: &str) -> Result<ImportBatch, FormatError> {
    let content = content.trim_start_matches('\u{feff}').trim();
    let mut lines = content.lines();

    // 1. En-tête
    let header_line = lines.next().ok_or(FormatError::TooFewLines)?;
    if lines.clone().next().is_none() {
        return Err(FormatError::TooFewLines);
    }
    let header = Header::parse(header_line)?;

    // 2. Lignes de données
    let mut batch = ImportBatch::default();

    for (idx, raw) in lines.enumerate() {
        // idx 0 = deuxième ligne du fichier
        let line_number = idx + 2;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let fields = split_line(line);
        if fields.len() != header.len() {
            batch.errors.push(RowError::new(
                line_number,
                RowErrorKind::WrongColumnCount {
                    expected: header.len(),
                    found: fields.len(),
                },
            ));
            continue;
        }

        match row::validate(&header, &fields) {
            Ok(record) => batch.records.push(record),
            Err(kind) => batch.errors.push(RowError::new(line_number, kind)),
        }
    }

    debug!(
        valid = batch.records.len(),
        rejected = batch.errors.len(),
        "CSV parsed"
    );

    // 3. Aucun enregistrement valide: échec global
    if batch.records.is_empty() {
        return Err(FormatError::NoValidRows);
    }

    Ok(batch)
}

/// Lit puis parse un fichier CSV (extension, taille, encodage vérifiés)
pub fn parse_file(path: &Path) -> Result<ImportBatch, ImportError> {
    let content = input::read(path)?;
    Ok(parse(&content)?)
}
