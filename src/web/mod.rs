//! HTTP surface: server-rendered pages, form posts, JSON series and the PDF
//! download.

pub mod error;
pub mod flash;
pub mod forms;
pub mod handlers;
pub mod views;

use crate::config::{DEFAULT_SECRET_KEY, ServeConfig};
use crate::db::Db;
use crate::error::Result;
use axum::Router;
use axum::routing::{get, post};
use flash::FlashKey;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub flash: FlashKey,
}

impl AppState {
    pub fn new(db: Db, secret_key: &str) -> Self {
        Self {
            db,
            flash: FlashKey::new(secret_key),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/informe-pdf", get(handlers::informe_pdf))
        // JSON series
        .route("/api/serie", get(handlers::api_serie))
        .route("/api/evolucion", get(handlers::api_evolucion))
        // monthly records
        .route("/records", get(handlers::records_list))
        .route("/records/new", post(handlers::records_new))
        .route("/records/:id/edit", post(handlers::records_edit))
        .route("/records/:id/delete", post(handlers::records_delete))
        // evolución de la bolsa
        .route("/evolucion", get(handlers::evolucion_list))
        .route("/evolucion/new", post(handlers::evolucion_new))
        .route("/evolucion/recompute", post(handlers::evolucion_recompute))
        .route("/evolucion/:id/edit", post(handlers::evolucion_edit))
        .route("/evolucion/:id/delete", post(handlers::evolucion_delete))
        // prepagado
        .route("/prepagado", get(handlers::prepagado_list))
        .route("/prepagado/new", post(handlers::prepagado_new))
        .route("/prepagado/:id/edit", post(handlers::prepagado_edit))
        .route("/prepagado/:id/delete", post(handlers::prepagado_delete))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &ServeConfig, db: Db) -> Result<()> {
    if config.secret_key == DEFAULT_SECRET_KEY {
        tracing::warn!("SECRET_KEY not set; flash cookies are signed with the development key");
    }
    let state = AppState::new(db, &config.secret_key);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "control económico listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
