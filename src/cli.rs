use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;

/// Longest upcoming-watering window, in days, the server accepts.
pub const MAX_UPCOMING_WINDOW_DAYS: u32 = 3650;

#[derive(Parser, Debug, Clone)]
#[command(name = "plant-care-tracker")]
#[command(about = "REST server for tracking plants, their owners and watering schedules")]
pub struct Cli {
    /// Port the HTTP listener binds on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// MongoDB connection string
    #[arg(long = "db-uri", env = "DB_URI")]
    pub db_uri: String,

    /// Database holding the plants, users, feedback and contact collections
    #[arg(long = "db-name", env = "DB_NAME", default_value = "plantCareDB")]
    pub db_name: String,

    /// Origins allowed by CORS, comma separated. Empty allows every origin.
    #[arg(long = "allowed-origins", env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// How many plants `GET /newplants` returns
    #[arg(long = "page-size-new-plants", env = "PAGE_SIZE_NEW_PLANTS", default_value_t = 8)]
    pub page_size_new_plants: u32,

    /// Days after today still counted as upcoming by `GET /upcoming-plants/:email`
    #[arg(
        long = "upcoming-window-days",
        env = "UPCOMING_WINDOW_DAYS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_UPCOMING_WINDOW_DAYS))
    )]
    pub upcoming_window_days: u32,

    /// Seconds to wait for a usable MongoDB server before failing an operation
    #[arg(long = "store-timeout-secs", env = "STORE_TIMEOUT_SECS", default_value_t = 10)]
    pub store_timeout_secs: u64,
}

impl Cli {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn listen_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// Loads `KEY=value` pairs from a `.env` file, overriding variables already
/// set in the process. Without an explicit path the file is searched for from
/// the working directory upwards. Returns the file that was read, if any.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path_override(path)
            .ok()
            .map(|()| path.to_path_buf()),
        None => dotenvy::dotenv_override().ok(),
    }
}
