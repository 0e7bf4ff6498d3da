//! Types d'erreurs pour le crate rural-csv

use std::fmt;

use thiserror::Error;

/// Erreur structurelle sur l'ensemble du fichier: l'import est abandonné
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Moins de deux lignes (en-tête + au moins une ligne de données)
    #[error("CSV must have a header and at least one data row")]
    TooFewLines,

    /// Colonnes obligatoires absentes de l'en-tête
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Aucune ligne valide après traitement complet du fichier
    #[error("no valid data found in CSV")]
    NoValidRows,
}

/// Erreurs pouvant survenir lors de la lecture d'un fichier CSV
#[derive(Debug, Error)]
pub enum ImportError {
    /// Erreur d'I/O lors de la lecture du fichier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Le fichier n'a pas l'extension .csv
    #[error("not a CSV file: {0}")]
    NotCsv(String),

    /// Fichier au-delà de la taille maximale acceptée
    #[error("file too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    /// Erreur de structure du contenu
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Raison du rejet d'une ligne de données
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowErrorKind {
    /// Nombre de champs différent de celui de l'en-tête
    WrongColumnCount { expected: usize, found: usize },
    /// `nome` vide ou trop court
    InvalidName,
    /// `tipo` hors de l'énumération
    InvalidType(String),
    /// `area` non numérique ou <= 0
    InvalidArea,
    /// `perimetro` non numérique ou <= 0
    InvalidPerimeter,
    /// `coordenadas` illisible ou avec moins de 4 points
    InvalidCoordinates,
}

impl fmt::Display for RowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongColumnCount { .. } => f.write_str("wrong column count"),
            Self::InvalidName => f.write_str("invalid name"),
            Self::InvalidType(value) => write!(f, "invalid type \"{}\"", value),
            Self::InvalidArea => f.write_str("invalid area"),
            Self::InvalidPerimeter => f.write_str("invalid perimeter"),
            Self::InvalidCoordinates => {
                f.write_str("coordinates must be valid and have ≥4 points")
            }
        }
    }
}

/// Erreur non fatale sur une ligne, collectée dans le lot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Line {line}: {kind}")]
pub struct RowError {
    /// Numéro de ligne source (1 = en-tête)
    pub line: usize,
    pub kind: RowErrorKind,
}

impl RowError {
    pub fn new(line: usize, kind: RowErrorKind) -> Self {
        Self { line, kind }
    }
}
