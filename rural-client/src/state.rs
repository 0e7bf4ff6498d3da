//! État applicatif du tableau de bord: propriétés chargées et sélection

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::notify::Notification;
use crate::types::{AnalysisStatus, Property, Toast};

/// Message par défaut quand le serveur n'en fournit pas
pub const DEFAULT_COMPLETION_MESSAGE: &str = "Análise concluída!";

/// Statistiques affichées en tête du tableau de bord
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_properties: usize,
    /// Hectares
    pub total_area: f64,
    /// Kilomètres
    pub total_perimeter_km: f64,
    pub selected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    properties: Vec<Property>,
    selected: BTreeSet<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Remplace la liste; la sélection est réduite aux identifiants encore présents
    pub fn replace_properties(&mut self, properties: Vec<Property>) {
        self.properties = properties;
        let ids: BTreeSet<&str> = self.properties.iter().map(|p| p.id.as_str()).collect();
        self.selected.retain(|id| ids.contains(id.as_str()));
    }

    pub fn upsert(&mut self, property: Property) {
        match self.find_mut(&property.id) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Property> {
        self.selected.remove(id);
        let index = self.properties.iter().position(|p| p.id == id)?;
        Some(self.properties.remove(index))
    }

    pub fn find(&self, id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.id == id)
    }

    /// Applique une notification d'analyse terminée.
    ///
    /// La propriété concernée passe à `Completed` si elle est connue; le toast
    /// est produit dans tous les cas.
    pub fn apply_notification(&mut self, notification: &Notification) -> Option<Toast> {
        match notification {
            Notification::AnalysisCompleted {
                property_id,
                message,
            } => {
                if let Some(id) = property_id {
                    match self.find_mut(id) {
                        Some(property) => property.analysis_status = AnalysisStatus::Completed,
                        None => debug!(id = %id, "Notification for unknown property"),
                    }
                }

                let text = message
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(DEFAULT_COMPLETION_MESSAGE);
                Some(Toast::success(text))
            }
        }
    }

    pub fn stats(&self) -> DashboardStats {
        let total_area: f64 = self.properties.iter().map(|p| p.area).sum();
        let total_perimeter: f64 = self.properties.iter().map(|p| p.perimeter).sum();

        DashboardStats {
            total_properties: self.properties.len(),
            total_area: (total_area * 100.0).round() / 100.0,
            total_perimeter_km: (total_perimeter / 1000.0 * 100.0).round() / 100.0,
            selected: self.selected.len(),
        }
    }

    /// Bascule la sélection; retourne `true` si la propriété est désormais
    /// sélectionnée. Les identifiants inconnus sont ignorés.
    pub fn toggle_selection(&mut self, id: &str) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.properties.iter().map(|p| p.id.clone()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Identifiants sélectionnés, dans l'ordre de la liste
    pub fn selected_ids(&self) -> Vec<String> {
        self.properties
            .iter()
            .filter(|p| self.selected.contains(&p.id))
            .map(|p| p.id.clone())
            .collect()
    }
}
