//! Application wiring
//!
//! All session state lives here, passed by handle to whoever needs it;
//! nothing is a process-wide singleton.

use std::sync::Arc;

use wabulk_core::AppConfig;

use crate::api::SenderClient;
use crate::contacts::ContactStore;
use crate::dispatch::Dispatcher;
use crate::log::SendingLog;
use crate::settings::SettingsStore;

pub struct App {
    pub config: AppConfig,
    pub client: Arc<SenderClient>,
    pub log: Arc<SendingLog>,
    pub settings: Arc<SettingsStore>,
    pub contacts: ContactStore,
    pub dispatcher: Dispatcher,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let client = Arc::new(SenderClient::new(&config));
        let log = Arc::new(SendingLog::new());
        let settings = Arc::new(SettingsStore::default());
        let contacts = ContactStore::new(client.clone());
        let dispatcher = Dispatcher::new(
            client.clone(),
            log.clone(),
            settings.clone(),
            config.whatsapp_token.clone().unwrap_or_default(),
        );
        Self {
            config,
            client,
            log,
            settings,
            contacts,
            dispatcher,
        }
    }
}
