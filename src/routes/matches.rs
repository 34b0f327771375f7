use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::AppError;
use crate::models::{CreateMatchRequest, UnmatchResponse, UnmatchTeacherRequest};
use crate::routes::AppState;
use crate::services::{roster, Store};

/// Configure all match-related routes
pub fn configure<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/matches")
            .route(web::get().to(list_matches::<S>))
            .route(web::post().to(create_match::<S>)),
    )
    .route("/matches/unmatch-teacher", web::post().to(unmatch_teacher::<S>));
}

async fn list_matches<S: Store>(state: web::Data<AppState<S>>) -> Result<HttpResponse, AppError> {
    let matches = state.store.list_matches().await?;
    Ok(HttpResponse::Ok().json(matches))
}

/// POST /api/matches
///
/// Request body:
/// ```json
/// { "StudentID": 12, "TeacherID": 4 }
/// ```
async fn create_match<S: Store>(
    state: web::Data<AppState<S>>,
    req: web::Json<CreateMatchRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let created = roster::create_match(state.store.as_ref(), req.student_id, req.teacher_id).await?;
    Ok(HttpResponse::Ok().json(created))
}

/// Remove a teacher's matches
///
/// POST /api/matches/unmatch-teacher
///
/// Request body:
/// ```json
/// { "TeacherID": 4, "NextStatusString": "UNMATCHED" }
/// ```
///
/// Safe to repeat: a teacher without matches reports zero removals.
async fn unmatch_teacher<S: Store>(
    state: web::Data<AppState<S>>,
    req: web::Json<UnmatchTeacherRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let removed = roster::unmatch_teacher(
        state.store.as_ref(),
        state.statuses(),
        req.teacher_id,
        &req.next_status_string,
    )
    .await?;

    tracing::info!("Unmatched teacher {}: {} match(es) removed", req.teacher_id, removed);

    Ok(HttpResponse::Ok().json(UnmatchResponse {
        teacher_id: req.teacher_id,
        removed,
    }))
}
