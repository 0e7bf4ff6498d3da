//! Contrôleur du tableau de bord
//!
//! Possède l'état applicatif, le client HTTP, le canal de notifications et
//! le lot CSV en attente de confirmation. Aucun état global.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use rural_csv::{FormatError, ImportBatch, ImportError, PropertyRecord};

use crate::api::{ApiClient, ApiError, PropertyUpdate};
use crate::auth::AuthError;
use crate::notify::{
    ChannelConfig, ChannelState, Connector, Envelope, NotificationClient, TransportError,
    WsConnector,
};
use crate::state::AppState;
use crate::types::{Property, Toast};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("no CSV import staged")]
    NothingStaged,

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct Dashboard<C: Connector = WsConnector> {
    state: AppState,
    api: ApiClient,
    notifications: NotificationClient<C>,
    events: mpsc::UnboundedReceiver<Envelope>,
    staged: Option<ImportBatch>,
}

impl Dashboard<WsConnector> {
    pub fn new(api: ApiClient, channel: ChannelConfig) -> Self {
        Self::with_connector(api, WsConnector, channel)
    }
}

impl<C: Connector> Dashboard<C> {
    pub fn with_connector(api: ApiClient, connector: C, channel: ChannelConfig) -> Self {
        let (notifications, events) = NotificationClient::new(connector, channel);
        Self {
            state: AppState::new(),
            api,
            notifications,
            events,
            staged: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn notifications(&self) -> &NotificationClient<C> {
        &self.notifications
    }

    pub fn channel_state(&self) -> ChannelState {
        self.notifications.state()
    }

    /// Recharge la liste des propriétés
    pub async fn refresh(&mut self) -> Result<usize, DashboardError> {
        let properties = self.api.list_properties().await?;
        let count = properties.len();
        self.state.replace_properties(properties);
        Ok(count)
    }

    /// Parse un contenu CSV et le met en attente de confirmation
    pub fn stage_csv(&mut self, content: &str) -> Result<&ImportBatch, DashboardError> {
        let batch = rural_csv::parse(content)?;
        Ok(self.staged.insert(batch))
    }

    /// Met en attente un lot déjà validé
    pub fn stage(&mut self, batch: ImportBatch) -> &ImportBatch {
        self.staged.insert(batch)
    }

    pub fn staged(&self) -> Option<&ImportBatch> {
        self.staged.as_ref()
    }

    pub fn discard_import(&mut self) -> Option<ImportBatch> {
        self.staged.take()
    }

    /// Recharge la liste après une écriture acceptée par l'API.
    /// Un échec ici ne remet pas l'écriture en cause.
    async fn reload(&mut self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Property list reload failed");
        }
    }

    /// Envoie le lot en attente puis recharge la liste.
    ///
    /// En cas d'échec de l'envoi, le lot reste en attente. Une fois l'envoi
    /// accepté, le nombre importé est retourné même si le rechargement échoue.
    pub async fn submit_import(&mut self) -> Result<usize, DashboardError> {
        let batch = self.staged.take().ok_or(DashboardError::NothingStaged)?;

        let imported = match self.api.import_properties(&batch.records).await {
            Ok(n) => n,
            Err(e) => {
                self.staged = Some(batch);
                return Err(e.into());
            }
        };

        info!(imported, "Import accepted");
        self.reload().await;
        Ok(imported)
    }

    /// Crée une propriété et l'ajoute à la liste locale
    pub async fn create_property(
        &mut self,
        record: &PropertyRecord,
    ) -> Result<Property, DashboardError> {
        let property = self.api.create_property(record).await?;
        self.state.upsert(property.clone());
        Ok(property)
    }

    /// Met à jour une propriété puis recharge la liste
    pub async fn update_property(
        &mut self,
        id: &str,
        update: &PropertyUpdate,
    ) -> Result<Property, DashboardError> {
        let property = self.api.update_property(id, update).await?;
        self.reload().await;
        Ok(property)
    }

    /// Supprime une propriété et la retire de la liste et de la sélection
    pub async fn delete_property(&mut self, id: &str) -> Result<(), DashboardError> {
        self.api.delete_property(id).await?;
        self.state.remove(id);
        Ok(())
    }

    /// Sélectionne toutes les propriétés chargées et retourne leurs identifiants
    pub fn select_all(&mut self) -> Vec<String> {
        self.state.select_all();
        self.state.selected_ids()
    }

    /// Ouvre le canal de notifications avec le jeton du client HTTP.
    ///
    /// Un jeton expiré est refusé ici: le canal ne tente rien.
    pub fn connect_notifications(&self, websocket_url: &str) -> Result<(), DashboardError> {
        let token = self.api.token();
        token.ensure_valid()?;
        self.notifications.connect(websocket_url, token.as_str())?;
        Ok(())
    }

    /// Applique une notification si elle provient de la génération courante
    pub fn handle_envelope(&mut self, envelope: Envelope) -> Option<Toast> {
        let current = self.notifications.generation();
        if envelope.generation != current {
            debug!(
                generation = envelope.generation,
                current, "Discarding notification from superseded connection"
            );
            return None;
        }
        self.state.apply_notification(&envelope.notification)
    }

    /// Attend la prochaine notification applicable et retourne son toast.
    /// `None` quand le canal d'événements est fermé.
    pub async fn next_toast(&mut self) -> Option<Toast> {
        loop {
            let envelope = self.events.recv().await?;
            if let Some(toast) = self.handle_envelope(envelope) {
                info!(toast = %toast, "Notification applied");
                return Some(toast);
            }
        }
    }

    /// Traite les notifications déjà reçues sans attendre
    pub fn drain_notifications(&mut self) -> Vec<Toast> {
        let mut toasts = Vec::new();
        while let Ok(envelope) = self.events.try_recv() {
            toasts.extend(self.handle_envelope(envelope));
        }
        toasts
    }

    pub fn close(&self) {
        self.notifications.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::make_token;
    use crate::auth::AuthToken;
    use crate::notify::{Connection, Notification};
    use async_trait::async_trait;
    use url::Url;

    struct NeverConnects;

    #[async_trait]
    impl Connector for NeverConnects {
        async fn open(&self, _url: &Url) -> Result<Box<dyn Connection>, TransportError> {
            Err(TransportError::Connect("offline".into()))
        }
    }

    fn dashboard(exp: i64) -> Dashboard<NeverConnects> {
        let token = AuthToken::parse(&make_token(serde_json::json!({ "exp": exp }))).unwrap();
        let api = ApiClient::new("http://127.0.0.1:9", token).unwrap();
        Dashboard::with_connector(api, NeverConnects, ChannelConfig::default())
    }

    const CSV: &str = "nome,tipo,area,perimetro,coordenadas\n\
                       Fazenda A,fazenda,10,400,\"[[0,0],[0,1],[1,1],[1,0]]\"\n\
                       X,fazenda,10,400,\"[[0,0],[0,1],[1,1],[1,0]]\"";

    #[test]
    fn test_stage_and_discard() {
        let mut dashboard = dashboard(4_102_444_800);

        let batch = dashboard.stage_csv(CSV).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.errors.len(), 1);
        assert!(dashboard.staged().is_some());

        assert!(dashboard.discard_import().is_some());
        assert!(dashboard.staged().is_none());
    }

    #[test]
    fn test_stage_rejects_bad_header() {
        let mut dashboard = dashboard(4_102_444_800);
        let err = dashboard.stage_csv("nome,tipo\nA,fazenda").unwrap_err();
        assert!(matches!(err, DashboardError::Format(FormatError::MissingColumns(_))));
        assert!(dashboard.staged().is_none());
    }

    #[tokio::test]
    async fn test_submit_without_staged_batch() {
        let mut dashboard = dashboard(4_102_444_800);
        assert!(matches!(
            dashboard.submit_import().await,
            Err(DashboardError::NothingStaged)
        ));
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_batch_staged() {
        // Jeton expiré: l'envoi échoue avant toute requête
        let mut dashboard = dashboard(1_000);
        dashboard.stage_csv(CSV).unwrap();

        let err = dashboard.submit_import().await.unwrap_err();
        assert!(matches!(err, DashboardError::Api(ApiError::Auth(AuthError::Expired(_)))));
        assert!(dashboard.staged().is_some());
    }

    #[tokio::test]
    async fn test_expired_token_never_opens_channel() {
        let dashboard = dashboard(1_000);
        let err = dashboard
            .connect_notifications("ws://localhost:3001")
            .unwrap_err();

        assert!(matches!(err, DashboardError::Auth(AuthError::Expired(_))));
        assert_eq!(dashboard.channel_state(), ChannelState::Disconnected);
        assert_eq!(dashboard.notifications().generation(), 0);
    }

    #[tokio::test]
    async fn test_stale_envelope_is_discarded() {
        let mut dashboard = dashboard(4_102_444_800);
        dashboard
            .state_mut()
            .replace_properties(vec![crate::state::tests::property("p1", 1.0, 1.0)]);

        dashboard.connect_notifications("ws://localhost:3001").unwrap();
        let stale = dashboard.notifications().generation();
        dashboard.connect_notifications("ws://localhost:3001").unwrap();

        let notification = Notification::AnalysisCompleted {
            property_id: Some("p1".into()),
            message: None,
        };
        let toast = dashboard.handle_envelope(Envelope {
            generation: stale,
            notification: notification.clone(),
        });
        assert!(toast.is_none());
        assert_eq!(
            dashboard.state().find("p1").unwrap().analysis_status,
            crate::types::AnalysisStatus::Pending
        );

        let current = dashboard.notifications().generation();
        let toast = dashboard.handle_envelope(Envelope {
            generation: current,
            notification,
        });
        assert!(toast.is_some());
        assert_eq!(
            dashboard.state().find("p1").unwrap().analysis_status,
            crate::types::AnalysisStatus::Completed
        );

        dashboard.close();
    }
}
