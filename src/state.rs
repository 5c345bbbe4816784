use crate::config::Config;
use crate::service::WalletService;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub service: Arc<WalletService>,
}
