//! Plant care tracker server.
//!
//! A thin HTTP gateway over four MongoDB collections (`plants`, `users`,
//! `feedback`, `contact`). Every route extracts its parameters, performs one
//! logical store operation through [`PlantCareStore`] and writes the result
//! back as JSON. Failures surface as `{"error": ...}` bodies via [`AppError`].
//!
//! # Running
//!
//! ```sh
//! DB_URI=mongodb://localhost:27017 RUST_LOG=info cargo run
//! ```
//!
//! See [`cli::Cli`] for every flag and its environment variable.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use tokio::{net::TcpListener, signal::ctrl_c};
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

pub mod care;
pub mod cli;
pub mod db;
pub mod error;
pub mod json;
pub mod memory;
pub mod models;
pub mod routes;
pub mod state;

pub use cli::Cli;
pub use db::{MongoStore, PlantCareStore};
pub use error::{AppError, StoreError};
pub use memory::MemoryStore;
pub use state::{AppState, GatewaySettings};

use routes::*;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.allowed_origins);

    Router::new()
        .route("/", get(root_handler))
        .route("/user", post(create_user_handler))
        .route("/user/{email}", get(get_user_handler))
        .route("/users/{email}", put(update_user_handler))
        .route("/plant/{id}", get(get_plant_handler))
        .route("/myplants/{email}", get(my_plants_handler))
        .route("/plants", get(list_plants_handler).post(create_plant_handler))
        .route("/newplants", get(new_plants_handler))
        .route("/updateplant/{id}", put(update_plant_handler))
        .route("/plantdelate/{id}", delete(delete_plant_handler))
        .route("/upcoming-plants/{email}", get(upcoming_plants_handler))
        .route("/feedback", get(list_feedback_handler).post(create_feedback_handler))
        .route("/contact-info", post(contact_handler))
        .route("/dashboard-stats", get(dashboard_stats_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// An empty allow-list permits every origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| warn!(%origin, "Ignoring invalid CORS origin: {e}"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

pub async fn start_server(cli: Cli) -> Result<()> {
    info!("Connecting to MongoDB...");
    let store = MongoStore::connect(&cli.db_uri, &cli.db_name, cli.store_timeout())
        .await
        .context("Failed to connect to MongoDB")?;

    if let Err(e) = store.ensure_indexes().await {
        warn!(error = %e, "Could not create email indexes, continuing without them");
    }

    let state = AppState::new(Arc::new(store), GatewaySettings::from(&cli));
    let app = build_router(state);

    let address = cli.listen_address();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("plant-care-tracker-server running on {}", cli.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
