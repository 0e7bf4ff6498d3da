//! Découpage d'une ligne CSV en champs

use memchr::memchr2_iter;

/// Découpe une ligne en champs.
///
/// Un `"` bascule le mode « entre guillemets » et n'est pas conservé; une
/// virgule hors guillemets termine le champ. Chaque champ est trimé.
pub fn split_line(line: &str) -> Vec<String> {
    let bytes = line.as_bytes();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pos = 0;

    // Recherche SIMD des séparateurs; `"` et `,` sont ASCII donc toujours
    // sur une frontière de caractère UTF-8
    for idx in memchr2_iter(b'"', b',', bytes) {
        current.push_str(&line[pos..idx]);
        pos = idx + 1;

        if bytes[idx] == b'"' {
            in_quotes = !in_quotes;
        } else if in_quotes {
            current.push(',');
        } else {
            fields.push(current.trim().to_string());
            current.clear();
        }
    }

    current.push_str(&line[pos..]);
    fields.push(current.trim().to_string());
    fields
}
