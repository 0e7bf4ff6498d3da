//! Lecture des fichiers CSV depuis le disque

use std::borrow::Cow;
use std::path::Path;

use tracing::warn;

use crate::error::ImportError;

/// Taille maximale acceptée pour un fichier d'import (5 Mo)
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Lit un fichier CSV en mémoire et le décode
///
/// # Arguments
///
/// * `path` - Chemin vers le fichier, extension `.csv` obligatoire
///
/// # Errors
///
/// `ImportError::NotCsv` si l'extension ne convient pas,
/// `ImportError::FileTooLarge` au-delà de `MAX_FILE_SIZE`.
pub fn read(path: &Path) -> Result<String, ImportError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(ImportError::NotCsv(path.display().to_string()));
    }

    let size = std::fs::metadata(path)?.len();
    if size > MAX_FILE_SIZE {
        return Err(ImportError::FileTooLarge {
            size,
            max: MAX_FILE_SIZE,
        });
    }

    let data = std::fs::read(path)?;
    Ok(decode(&data).into_owned())
}

/// Décode les bytes: UTF-8 (BOM retiré) sinon Windows-1252, l'encodage
/// par défaut des tableurs
pub fn decode(data: &[u8]) -> Cow<'_, str> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    match simdutf8::basic::from_utf8(data) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            warn!("CSV is not valid UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(data);
            decoded
        }
    }
}
