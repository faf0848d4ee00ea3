use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::TokenKeys;
use crate::config::AppConfig;
use crate::db::{PgBalanceLedger, PgInvoiceRepository, PgNotificationRepository, PgOrderRepository};
use crate::notifications::{NatsPublisher, NoopPublisher, NotificationPublisher, Notifier};
use crate::services::{OrderWorkflow, PaymentService};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub tokens: TokenKeys,
    pub notifier: Notifier,
    pub workflow: OrderWorkflow,
    pub payments: PaymentService,
}

impl AppState {
    /// Wires the Postgres repositories and the push transport into the services.
    pub fn new(db: PgPool, nats: Option<async_nats::Client>, config: AppConfig) -> Self {
        let publisher: Arc<dyn NotificationPublisher> = match nats {
            Some(client) => Arc::new(NatsPublisher::new(client)),
            None => Arc::new(NoopPublisher),
        };
        let notifier = Notifier::new(Arc::new(PgNotificationRepository::new(db.clone())), publisher);
        let workflow = OrderWorkflow::new(
            Arc::new(PgOrderRepository::new(db.clone())), Arc::new(PgBalanceLedger::new(db.clone())),
            notifier.clone(), config.app_base_url.clone(),
        );
        let payments = PaymentService::new(Arc::new(PgInvoiceRepository::new(db.clone())), workflow.clone(), config.payment_server_key.clone());
        let tokens = TokenKeys::new(&config.jwt_secret, config.jwt_ttl_minutes);
        Self { db, config: Arc::new(config), tokens, notifier, workflow, payments }
    }

    /// Deep link into the storefront.
    pub fn link(&self, path: &str) -> Option<String> { Some(self.config.link(path)) }
}
