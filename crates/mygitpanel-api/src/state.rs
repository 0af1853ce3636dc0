use std::sync::Arc;

use mygitpanel_core::store::Store;
use mygitpanel_poller::RefreshSender;
use mygitpanel_provider::ClientProvider;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub refresh_tx: RefreshSender,
    pub client_provider: Arc<ClientProvider>,
}
