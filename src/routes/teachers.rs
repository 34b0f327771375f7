use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::AppError;
use crate::models::{CreateTeacherRequest, PatchTeacherRequest};
use crate::routes::AppState;
use crate::services::{roster, Store};

pub fn configure<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/teachers")
            .route(web::get().to(list_teachers::<S>))
            .route(web::post().to(create_teacher::<S>)),
    )
    .service(
        web::resource("/teachers/{id}")
            .route(web::get().to(get_teacher::<S>))
            .route(web::patch().to(patch_teacher::<S>)),
    );
}

async fn list_teachers<S: Store>(state: web::Data<AppState<S>>) -> Result<HttpResponse, AppError> {
    let teachers = state.store.list_teachers().await?;
    Ok(HttpResponse::Ok().json(teachers))
}

async fn create_teacher<S: Store>(
    state: web::Data<AppState<S>>,
    req: web::Json<CreateTeacherRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let new_teacher = roster::prepare_new_teacher(state.store.as_ref(), state.statuses(), req.into_inner()).await?;
    let teacher = state.store.create_teacher(new_teacher).await?;

    tracing::info!("Created teacher {}", teacher.teacher_id);
    Ok(HttpResponse::Ok().json(teacher))
}

async fn get_teacher<S: Store>(
    state: web::Data<AppState<S>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let teacher = state.store.get_teacher(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(teacher))
}

/// PATCH /api/teachers/{id}
///
/// Edits languages only; a differing status is rejected.
async fn patch_teacher<S: Store>(
    state: web::Data<AppState<S>>,
    path: web::Path<i32>,
    req: web::Json<PatchTeacherRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let teacher_id = path.into_inner();

    let changes =
        roster::prepare_teacher_changes(state.store.as_ref(), state.statuses(), teacher_id, req.into_inner()).await?;
    let teacher = state.store.update_teacher(teacher_id, changes).await?;

    tracing::info!("Updated teacher {}", teacher_id);
    Ok(HttpResponse::Ok().json(teacher))
}
