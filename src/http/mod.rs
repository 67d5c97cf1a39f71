//! REST transport over `ContactApi`.

pub mod error;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::http::{header::AUTHORIZATION, header::CONTENT_TYPE, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use error::AppError;
pub use state::AppState;

use routes::*;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_origin(Any)
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/login", post(login_handler))
        .route("/api/register", post(register_handler))
        .route(
            "/api/contacts",
            get(list_contacts_handler)
                .post(create_contact_handler)
                .delete(bulk_delete_handler),
        )
        .route(
            "/api/contacts/{mobileno}",
            get(get_contact_handler)
                .patch(update_contact_handler)
                .delete(delete_contact_handler),
        )
        .route("/api/contacts/{mobileno}/exists", get(contact_exists_handler))
        .route("/api/import", post(import_handler))
        .route("/api/import/logs", get(import_logs_handler))
        .route("/api/export/csv", get(export_csv_handler))
        .route("/api/export/xlsx", get(export_xlsx_handler))
        .route("/api/backup", get(list_backups_handler).post(backup_handler))
        .route("/api/backup/data", get(backup_data_handler))
        .route(
            "/api/backup/{file_name}",
            get(download_backup_handler).delete(delete_backup_handler),
        )
        .route("/api/backup/{file_name}/restore", post(restore_backup_handler))
        .route("/api/trash", get(list_trash_handler))
        .route("/api/trash/{mobileno}/restore", post(restore_trash_handler))
        .route("/api/trash/{mobileno}", delete(purge_trash_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> std::io::Result<()> {
    let app = build_router(state);

    let address = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
