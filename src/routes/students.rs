use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::AppError;
use crate::models::{
    CreateStudentRequest, EntityRef, EntityStatusResponse, PatchStudentRequest, StudentListQuery,
    SuggestionsResponse,
};
use crate::routes::AppState;
use crate::services::{roster, Store};

/// Configure all student routes
pub fn configure<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/students")
            .route(web::get().to(list_students::<S>))
            .route(web::post().to(create_student::<S>)),
    )
    .service(
        web::resource("/students/{id}")
            .route(web::get().to(get_student::<S>))
            .route(web::patch().to(patch_student::<S>)),
    )
    .route("/students/{id}/status", web::get().to(get_student_status::<S>))
    .route(
        "/students/{id}/suggested-teachers",
        web::get().to(suggested_teachers::<S>),
    );
}

/// GET /api/students?status={description}
async fn list_students<S: Store>(
    state: web::Data<AppState<S>>,
    query: web::Query<StudentListQuery>,
) -> Result<HttpResponse, AppError> {
    let students = state.store.list_students(query.status.as_deref()).await?;
    Ok(HttpResponse::Ok().json(students))
}

/// GET /api/students/{id}
async fn get_student<S: Store>(
    state: web::Data<AppState<S>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let student = state.store.get_student(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(student))
}

/// GET /api/students/{id}/status
async fn get_student_status<S: Store>(
    state: web::Data<AppState<S>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let student_id = path.into_inner();
    let status = state.store.entity_status(EntityRef::Student(student_id)).await?;

    Ok(HttpResponse::Ok().json(EntityStatusResponse { student_id, status }))
}

/// POST /api/students
///
/// Request body:
/// ```json
/// {
///   "NativeLanguageString": "Spanish",
///   "EnglishProficiency": "beginner",
///   "PhoneNumber": "555-0100",
///   "StatusString": "UNMATCHED"
/// }
/// ```
async fn create_student<S: Store>(
    state: web::Data<AppState<S>>,
    req: web::Json<CreateStudentRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let new_student = roster::prepare_new_student(state.store.as_ref(), state.statuses(), req.into_inner()).await?;
    let student = state.store.create_student(new_student).await?;

    tracing::info!("Created student {}", student.student_id);
    Ok(HttpResponse::Ok().json(student))
}

/// PATCH /api/students/{id}
///
/// Blank fields are left as they are. Status changes are rejected here and
/// must go through `/api/status-updates`.
async fn patch_student<S: Store>(
    state: web::Data<AppState<S>>,
    path: web::Path<i32>,
    req: web::Json<PatchStudentRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let student_id = path.into_inner();

    let changes =
        roster::prepare_student_changes(state.store.as_ref(), state.statuses(), student_id, req.into_inner()).await?;
    let student = state.store.update_student(student_id, changes).await?;

    tracing::info!("Updated student {}", student_id);
    Ok(HttpResponse::Ok().json(student))
}

/// GET /api/students/{id}/suggested-teachers
///
/// Returns at most five teachers. An unknown student gets an empty list.
async fn suggested_teachers<S: Store>(
    state: web::Data<AppState<S>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let student_id = path.into_inner();
    let result = roster::suggest_teachers(state.store.as_ref(), &state.suggester, student_id).await?;

    tracing::info!(
        "Returning {} suggested teachers for student {} (from {} candidates)",
        result.teachers.len(),
        student_id,
        result.total_candidates
    );

    Ok(HttpResponse::Ok().json(SuggestionsResponse {
        student_id,
        teachers: result.teachers,
    }))
}
