use std::sync::Arc;

use crate::accounts_client::AccountApi;
use crate::config::Config;
use crate::signup::persistence::WizardStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Session-scoped wizard storage. Redis in production, in-memory otherwise.
    pub store: Arc<dyn WizardStore>,
    /// External account backend. Swap for a fake in tests.
    pub accounts: Arc<dyn AccountApi>,
    pub config: Config,
}
