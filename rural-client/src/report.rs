//! Rapport d'import CSV avec graceful degradation
//!
//! Le rapport est construit à partir du lot validé (aperçu avant envoi), puis
//! complété avec le résultat de la soumission à l'API.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use rural_csv::{ImportBatch, ImportError};

/// Lignes affichées dans l'aperçu
pub const PREVIEW_ROWS: usize = 5;

/// Erreurs de ligne affichées avant "... and N more"
pub const PREVIEW_ERRORS: usize = 10;

/// Statut global de l'import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportStatus {
    /// Toutes les lignes sont valides
    Success,
    /// Des lignes ont été rejetées, les autres sont importables
    PartialSuccess,
    /// Import abandonné
    Failed,
}

/// Niveau de sévérité des erreurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorLevel {
    /// Erreur fatale: import abandonné
    Fatal,
    /// Erreur: ligne ignorée
    Error,
}

/// Erreur d'import avec contexte
#[derive(Debug, Clone, Serialize)]
pub struct ReportError {
    pub level: ErrorLevel,
    /// Numéro de ligne dans le fichier source (l'en-tête est la ligne 1)
    pub line: Option<usize>,
    pub message: String,
}

/// Ligne de l'aperçu
#[derive(Debug, Clone, Serialize)]
pub struct PreviewRow {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: String,
    pub area: f64,
    pub perimeter: f64,
}

/// Statistiques par type de propriété
#[derive(Debug, Clone, Default, Serialize)]
pub struct TypeStats {
    pub count: usize,
    /// Hectares
    pub area: f64,
}

/// Rapport complet d'import
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// Fichier source
    pub source: String,
    pub duration_secs: f64,
    pub status: ImportStatus,

    pub records_valid: usize,
    pub records_rejected: usize,
    /// Renseigné après l'envoi à l'API
    pub records_imported: Option<usize>,

    /// Hectares
    pub total_area: f64,
    /// Mètres
    pub total_perimeter: f64,

    pub by_type: BTreeMap<String, TypeStats>,

    /// Premières propriétés valides
    pub preview: Vec<PreviewRow>,

    pub errors: Vec<ReportError>,
}

impl ImportReport {
    /// Rapport vide pour un fichier source
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            duration_secs: 0.0,
            status: ImportStatus::Success,
            records_valid: 0,
            records_rejected: 0,
            records_imported: None,
            total_area: 0.0,
            total_perimeter: 0.0,
            by_type: BTreeMap::new(),
            preview: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Construit le rapport d'aperçu d'un lot validé
    pub fn from_batch(source: &str, batch: &ImportBatch) -> Self {
        let mut report = Self::new(source);

        for record in &batch.records {
            let stats = report
                .by_type
                .entry(record.property_type.to_string())
                .or_default();
            stats.count += 1;
            stats.area += record.area;
        }

        report.records_valid = batch.records.len();
        report.total_area = batch.total_area();
        report.total_perimeter = batch.total_perimeter();
        report.preview = batch
            .records
            .iter()
            .take(PREVIEW_ROWS)
            .map(|r| PreviewRow {
                name: r.name.clone(),
                property_type: r.property_type.to_string(),
                area: r.area,
                perimeter: r.perimeter,
            })
            .collect();

        for error in &batch.errors {
            report.record_row_error(error.line, &error.kind.to_string());
        }

        report.finalize();
        report
    }

    /// Rapport d'un fichier rejeté en entier
    pub fn failed(source: &str, error: &ImportError) -> Self {
        let mut report = Self::new(source);
        report.record_fatal(&error.to_string());
        report.finalize();
        report
    }

    /// Enregistre une ligne rejetée
    pub fn record_row_error(&mut self, line: usize, message: &str) {
        self.records_rejected += 1;
        self.errors.push(ReportError {
            level: ErrorLevel::Error,
            line: Some(line),
            message: message.to_string(),
        });
    }

    /// Enregistre une erreur qui abandonne l'import
    pub fn record_fatal(&mut self, message: &str) {
        self.errors.push(ReportError {
            level: ErrorLevel::Fatal,
            line: None,
            message: message.to_string(),
        });
    }

    /// Enregistre la réponse de l'API à la soumission
    pub fn record_submission(&mut self, imported: usize) {
        self.records_imported = Some(imported);
    }

    /// Définit la durée de l'import
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final basé sur les erreurs
    pub fn finalize(&mut self) {
        let has_fatal = self.errors.iter().any(|e| e.level == ErrorLevel::Fatal);
        let has_errors = !self.errors.is_empty();

        self.status = if has_fatal || self.records_valid == 0 {
            ImportStatus::Failed
        } else if has_errors {
            ImportStatus::PartialSuccess
        } else {
            ImportStatus::Success
        };
    }

    /// Rendu texte du rapport
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);

        // `write!` sur une String ne peut pas échouer
        let _ = writeln!(out, "\n{}", rule);
        let _ = writeln!(out, "CSV IMPORT REPORT - {}", self.source);
        let _ = writeln!(out, "{}", rule);

        let _ = writeln!(out, "\nStatus: {:?}", self.status);
        let _ = writeln!(out, "Duration: {:.2}s", self.duration_secs);

        let _ = writeln!(out, "\n--- SUMMARY ---");
        let _ = writeln!(
            out,
            "Rows: {} valid, {} rejected",
            self.records_valid, self.records_rejected
        );
        let _ = writeln!(
            out,
            "Total: {:.2} ha, {:.2} km",
            self.total_area,
            self.total_perimeter / 1000.0
        );
        if let Some(imported) = self.records_imported {
            let _ = writeln!(out, "Imported: {}", imported);
        }

        if !self.by_type.is_empty() {
            let _ = writeln!(out, "\n--- BY TYPE ---");
            for (type_name, stats) in &self.by_type {
                let _ = writeln!(out, "  {}: {} ({:.2} ha)", type_name, stats.count, stats.area);
            }
        }

        if !self.preview.is_empty() {
            let _ = writeln!(
                out,
                "\n--- PREVIEW ({} of {}) ---",
                self.preview.len(),
                self.records_valid
            );
            for row in &self.preview {
                let _ = writeln!(
                    out,
                    "  {} | {} | {:.2} ha | {:.0} m",
                    row.name, row.property_type, row.area, row.perimeter
                );
            }
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out, "\n--- ERRORS ({}) ---", self.errors.len());
            for e in self.errors.iter().take(PREVIEW_ERRORS) {
                match e.line {
                    Some(line) => {
                        let _ = writeln!(out, "  Line {}: {}", line, e.message);
                    }
                    None => {
                        let _ = writeln!(out, "  {:?} {}", e.level, e.message);
                    }
                }
            }
            if self.errors.len() > PREVIEW_ERRORS {
                let _ = writeln!(out, "  ... and {} more", self.errors.len() - PREVIEW_ERRORS);
            }
        }

        let _ = writeln!(out, "\n{}", rule);
        out
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        print!("{}", self.render());
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{}: {} valid, {} rejected, {:.2} ha",
            self.source, self.records_valid, self.records_rejected, self.total_area
        );
        if let Some(imported) = self.records_imported {
            let _ = write!(summary, ", {} imported", imported);
        }
        summary
    }
}
