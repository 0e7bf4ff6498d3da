//! Parser pour la ligne d'en-tête

use crate::error::FormatError;
use crate::parser::line::split_line;

/// Colonnes obligatoires, dans l'ordre utilisé pour les messages d'erreur
pub const REQUIRED_COLUMNS: [&str; 5] = ["nome", "tipo", "area", "perimetro", "coordenadas"];

/// Colonne optionnelle de description
pub const DESCRIPTION_COLUMN: &str = "descricao";

/// En-tête normalisé (trim + minuscules)
#[derive(Debug, Clone)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    /// Parse la ligne d'en-tête et vérifie les colonnes obligatoires
    pub fn parse(line: &str) -> Result<Self, FormatError> {
        let columns: Vec<String> = split_line(line)
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|required| !columns.iter().any(|c| c == *required))
            .map(|s| s.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(FormatError::MissingColumns(missing));
        }

        Ok(Self { columns })
    }

    /// Nombre de colonnes attendu sur chaque ligne
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index d'une colonne. En cas de doublon, la dernière occurrence gagne.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().rposition(|c| c == name)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}
