use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::models::{StatusUpdateRequest, StatusUpdatesQuery, TransitionResponse};
use crate::routes::AppState;
use crate::services::Store;

/// Configure status transition routes
pub fn configure<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/status-updates")
            .route(web::post().to(create_status_update::<S>))
            .route(web::get().to(list_status_updates::<S>)),
    );
}

/// Status transition endpoint
///
/// POST /api/status-updates
///
/// Request body:
/// ```json
/// {
///   "TeacherID": 4,
///   "PreviousStatusString": "MATCHED",
///   "NextStatusString": "UNMATCHED",
///   "UpdatedBy": "coordinator",
///   "ReasonString": "on leave"
/// }
/// ```
///
/// Responds before any scheduled unmatch completes.
async fn create_status_update<S: Store>(
    state: web::Data<AppState<S>>,
    req: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let transition = req.into_inner().into_transition().map_err(|e| {
        tracing::info!("Rejected status update request: {}", e);
        e
    })?;

    let outcome = state.transitions.transition(transition).await?;

    // The task logs its own failures; the response does not wait for it
    let unmatch_scheduled = outcome.unmatch.is_some();

    Ok(HttpResponse::Ok().json(TransitionResponse {
        entity: outcome.entity,
        status_update: outcome.status_update,
        unmatch_scheduled,
    }))
}

/// GET /api/status-updates?teacherId={id} or ?studentId={id}
async fn list_status_updates<S: Store>(
    state: web::Data<AppState<S>>,
    query: web::Query<StatusUpdatesQuery>,
) -> Result<HttpResponse, AppError> {
    let entity = query.entity()?;
    let updates = state.store.status_updates_for(entity).await?;
    Ok(HttpResponse::Ok().json(updates))
}
