use std::sync::Arc;

use crate::{cli::Cli, db::PlantCareStore};

/// Tunables the routes read on every request.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub allowed_origins: Vec<String>,
    pub page_size_new_plants: i64,
    pub upcoming_window_days: u32,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            page_size_new_plants: 8,
            upcoming_window_days: 3,
        }
    }
}

impl From<&Cli> for GatewaySettings {
    fn from(cli: &Cli) -> Self {
        Self {
            allowed_origins: cli
                .allowed_origins
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            page_size_new_plants: i64::from(cli.page_size_new_plants),
            upcoming_window_days: cli.upcoming_window_days,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PlantCareStore>,
    pub settings: Arc<GatewaySettings>,
}

impl AppState {
    pub fn new(store: Arc<dyn PlantCareStore>, settings: GatewaySettings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
        }
    }
}
