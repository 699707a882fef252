use std::path::Path;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use eyre::{Result, WrapErr};
use log::{error, info};
use tower_http::services::ServeDir;

use types::domain::{LoginRequest, SignupRequest};
use types::error::Error;
use types::model::ModelArtifact;

use crate::config::Config;
use crate::domain::report::TablePreview;
use crate::extensions::ExtractSession;
use crate::repository::credentials::CredentialRepository;
use crate::repository::history::HistoryRepository;
use crate::repository::sessions::SessionRepository;
use crate::routes::Api;
use crate::service::auth::AuthService;
use crate::service::reporting::{DOWNLOAD_FILE_NAME, PREVIEW_ROWS};
use crate::service::scan::ScanService;

mod config;
mod domain;
mod extensions;
mod repository;
mod routes;
mod service;

#[tokio::main]
async fn main() -> Result<()> {
    // setup log
    env_logger::init();
    let config = Config::from_env();
    info!("server starts with {:?}", config);

    let model = ModelArtifact::load(&config.model_path).wrap_err_with(|| {
        format!(
            "Failed to load model from {}; run the trainer first",
            config.model_path.display()
        )
    })?;

    // repositories
    let credential_repository = CredentialRepository::new(config.users_path.clone());
    let session_repository = SessionRepository::new();
    let history_repository = HistoryRepository::new(config.history_dir.clone());

    // API
    let api = Api {
        auth_service: AuthService {
            credential_repository,
            session_repository,
        },
        scan_service: ScanService {
            model: Arc::new(model),
            history_repository,
        },
    };

    let router = app(api, &config.static_dir, config.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}

fn app(api: Api, static_dir: &Path, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(get_session))
        .route("/upload", post(upload))
        .route("/history", get(get_history))
        .route("/download", get(download))
        .fallback_service(ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(Extension(api))
}

async fn signup(
    Extension(api): Extension<Api>,
    Json(payload): Json<SignupRequest>,
) -> impl IntoResponse {
    match api.signup(payload).await {
        Ok(_) => StatusCode::CREATED.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn login(
    Extension(api): Extension<Api>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    match api.login(payload).await {
        Ok(token) => (StatusCode::OK, token.to_string()),
        Err(e) => report_into_response(e),
    }
}

async fn logout(
    Extension(api): Extension<Api>,
    ExtractSession { token, .. }: ExtractSession,
) -> impl IntoResponse {
    api.logout(token).await;
    StatusCode::NO_CONTENT
}

async fn get_session(ExtractSession { session, .. }: ExtractSession) -> impl IntoResponse {
    (StatusCode::OK, Json(session))
}

async fn upload(
    Extension(api): Extension<Api>,
    ExtractSession { session, .. }: ExtractSession,
    body: Bytes,
) -> impl IntoResponse {
    match api.upload(session, body).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn get_history(
    Extension(api): Extension<Api>,
    ExtractSession { session, .. }: ExtractSession,
) -> impl IntoResponse {
    match api.history(&session).await {
        Ok(Some(table)) => {
            (StatusCode::OK, Json(TablePreview::of(&table, PREVIEW_ROWS))).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn download(
    Extension(api): Extension<Api>,
    ExtractSession { session, .. }: ExtractSession,
) -> impl IntoResponse {
    match api.download(&session).await {
        Ok(Some(bytes)) => (
            StatusCode::OK,
            [
                (CONTENT_TYPE, "text/csv".to_string()),
                (
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
                ),
            ],
            bytes,
        )
            .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

fn report_into_response(e: eyre::Report) -> (StatusCode, String) {
    error!("Error occurred: {:?}", e);
    match e.downcast::<Error>() {
        Ok(error) => error.into_response_tuple(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "".to_string()),
    }
}
