// Route exports
pub mod matches;
pub mod status_updates;
pub mod students;
pub mod teachers;

use actix_web::{error, http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;

use crate::core::Suggester;
use crate::error::AppError;
use crate::models::{ErrorResponse, HealthResponse};
use crate::services::{StatusCache, StatusTransitionHandler, Store};

/// Application state shared across all handlers
pub struct AppState<S: Store> {
    pub store: Arc<S>,
    pub transitions: StatusTransitionHandler<S>,
    pub suggester: Suggester,
}

impl<S: Store> AppState<S> {
    pub fn new(store: Arc<S>, statuses: StatusCache, suggester: Suggester) -> Self {
        Self {
            transitions: StatusTransitionHandler::new(Arc::clone(&store), statuses),
            store,
            suggester,
        }
    }

    pub fn statuses(&self) -> &StatusCache {
        self.transitions.statuses()
    }
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            transitions: self.transitions.clone(),
            suggester: self.suggester,
        }
    }
}

pub fn configure_routes<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health_check::<S>))
            .route("/statuses", web::get().to(list_statuses::<S>))
            .configure(students::configure::<S>)
            .configure(teachers::configure::<S>)
            .configure(status_updates::configure::<S>)
            .configure(matches::configure::<S>),
    );
}

/// Health check endpoint
async fn health_check<S: Store>(state: web::Data<AppState<S>>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

async fn list_statuses<S: Store>(state: web::Data<AppState<S>>) -> Result<HttpResponse, AppError> {
    let statuses = state.store.list_statuses().await?;
    Ok(HttpResponse::Ok().json(statuses))
}

fn bad_request(error: &str, message: String) -> actix_web::Error {
    error::InternalError::from_response(
        message.clone(),
        HttpResponse::build(StatusCode::BAD_REQUEST).json(ErrorResponse {
            error: error.to_string(),
            message,
            status_code: StatusCode::BAD_REQUEST.as_u16(),
        }),
    )
    .into()
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    bad_request("invalid_json", format!("Invalid JSON: {}", err))
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    bad_request("invalid_query", format!("Invalid query: {}", err))
}

/// Handle path parameter errors
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    bad_request("invalid_path", format!("Invalid path: {}", err))
}
