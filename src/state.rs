use std::sync::Arc;

use crate::clients::{email::Mailer, images::ImageStore, payments::PaymentGateway};
use crate::db::{DbPool, OrmConn};

/// Shared request state. External collaborators are injected as trait objects
/// so tests can swap them out without touching the services.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub payments: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
    pub images: Arc<dyn ImageStore>,
}
