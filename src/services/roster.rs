use crate::core::{releases_matches, Suggester, SuggestionResult};
use crate::error::AppError;
use crate::models::requests::non_empty;
use crate::models::{
    CreateStudentRequest, CreateTeacherRequest, EntityRef, Match, NewStudent, NewTeacher,
    PatchStudentRequest, PatchTeacherRequest, StatusRef, Student, StudentChanges, TeacherChanges,
    UNMATCHED,
};
use crate::services::cache::StatusCache;
use crate::services::store::Store;

/// Resolve a student creation request into concrete ids
///
/// Ids win over names. A missing status defaults to UNMATCHED; a missing
/// language is a validation error. Blank proficiency is stored as absent.
pub async fn prepare_new_student<S: Store>(
    store: &S,
    statuses: &StatusCache,
    request: CreateStudentRequest,
) -> Result<NewStudent, AppError> {
    let status_ref = match (request.status_id, non_empty(request.status_string)) {
        (Some(id), _) => StatusRef::Id(id),
        (None, Some(name)) => StatusRef::Name(name),
        (None, None) => StatusRef::Name(UNMATCHED.to_string()),
    };
    let status = statuses.resolve(store, &status_ref).await?;

    let native_language_id = resolve_language(
        store,
        request.native_language_id,
        request.native_language_string,
    )
    .await?
    .ok_or_else(|| {
        AppError::Validation("NativeLanguageID or NativeLanguageString is required".to_string())
    })?;

    Ok(NewStudent {
        native_language_id,
        english_proficiency: non_empty(request.english_proficiency),
        phone_number: non_empty(request.phone_number),
        status_id: status.status_id,
    })
}

/// Resolve a teacher registration request; a missing status defaults to UNMATCHED
pub async fn prepare_new_teacher<S: Store>(
    store: &S,
    statuses: &StatusCache,
    request: CreateTeacherRequest,
) -> Result<NewTeacher, AppError> {
    let status_ref = match (request.status_id, non_empty(request.status_string)) {
        (Some(id), _) => StatusRef::Id(id),
        (None, Some(name)) => StatusRef::Name(name),
        (None, None) => StatusRef::Name(UNMATCHED.to_string()),
    };
    let status = statuses.resolve(store, &status_ref).await?;

    Ok(NewTeacher {
        native_language_id: request.native_language_id,
        second_language_id: request.second_language_id,
        status_id: status.status_id,
    })
}

/// Resolve an optional language given by id or by name; the id wins
async fn resolve_language<S: Store>(
    store: &S,
    id: Option<i32>,
    name: Option<String>,
) -> Result<Option<i32>, AppError> {
    match (id, non_empty(name)) {
        (Some(id), _) => Ok(Some(id)),
        (None, Some(name)) => store
            .language_by_name(&name)
            .await?
            .map(|language| Some(language.language_id))
            .ok_or_else(|| AppError::Validation(format!("unknown language '{}'", name))),
        (None, None) => Ok(None),
    }
}

/// Reject a profile edit that would change the entity's status
///
/// Status changes must leave an audit record, so they only go through
/// [`crate::services::StatusTransitionHandler`].
async fn ensure_status_unchanged<S: Store>(
    store: &S,
    statuses: &StatusCache,
    entity: EntityRef,
    status_id: Option<i32>,
    status_string: Option<String>,
) -> Result<(), AppError> {
    let requested = match (status_id, non_empty(status_string)) {
        (Some(id), _) => StatusRef::Id(id),
        (None, Some(name)) => StatusRef::Name(name),
        (None, None) => return Ok(()),
    };
    let requested = statuses.resolve(store, &requested).await?;
    let current = store.entity_status(entity).await?;

    if requested.status_id != current.status_id {
        return Err(AppError::Validation(format!(
            "{} is {}; use /api/status-updates to move it to {}",
            entity, current.description, requested.description
        )));
    }
    Ok(())
}

/// Resolve a student profile edit into concrete ids
pub async fn prepare_student_changes<S: Store>(
    store: &S,
    statuses: &StatusCache,
    student_id: i32,
    request: PatchStudentRequest,
) -> Result<StudentChanges, AppError> {
    store.get_student(student_id).await?;
    ensure_status_unchanged(
        store,
        statuses,
        EntityRef::Student(student_id),
        request.status_id,
        request.status_string,
    )
    .await?;

    Ok(StudentChanges {
        native_language_id: resolve_language(
            store,
            request.native_language_id,
            request.native_language_string,
        )
        .await?,
        english_proficiency: non_empty(request.english_proficiency),
        phone_number: non_empty(request.phone_number),
    })
}

/// Resolve a teacher profile edit into concrete ids
pub async fn prepare_teacher_changes<S: Store>(
    store: &S,
    statuses: &StatusCache,
    teacher_id: i32,
    request: PatchTeacherRequest,
) -> Result<TeacherChanges, AppError> {
    store.get_teacher(teacher_id).await?;
    ensure_status_unchanged(
        store,
        statuses,
        EntityRef::Teacher(teacher_id),
        request.status_id,
        request.status_string,
    )
    .await?;

    Ok(TeacherChanges {
        native_language_id: resolve_language(
            store,
            request.native_language_id,
            request.native_language_string,
        )
        .await?,
        second_language_id: resolve_language(
            store,
            request.second_language_id,
            request.second_language_string,
        )
        .await?,
    })
}

/// Pair a student with a teacher
///
/// Only a teacher currently holding the MATCHED status may be paired.
pub async fn create_match<S: Store>(
    store: &S,
    student_id: i32,
    teacher_id: i32,
) -> Result<Match, AppError> {
    store.get_student(student_id).await?;
    let teacher = store.get_teacher(teacher_id).await?;

    if !teacher.status.is_matched() {
        return Err(AppError::Validation(format!(
            "teacher {} is {}, only MATCHED teachers can be paired",
            teacher_id, teacher.status.description
        )));
    }

    let created = store.create_match(student_id, teacher_id).await?;
    tracing::info!("Matched student {} with teacher {}", student_id, teacher_id);
    Ok(created)
}

/// Remove a teacher's matches if their next status no longer holds a match
///
/// Idempotent: a teacher without matches yields `Ok(0)`.
pub async fn unmatch_teacher<S: Store>(
    store: &S,
    statuses: &StatusCache,
    teacher_id: i32,
    next_status: &str,
) -> Result<u64, AppError> {
    let next = statuses
        .resolve(store, &StatusRef::Name(next_status.to_string()))
        .await?;
    store.get_teacher(teacher_id).await?;

    if !releases_matches(&next) {
        tracing::debug!("Teacher {} stays {}, keeping matches", teacher_id, next.description);
        return Ok(0);
    }

    store.remove_matches(EntityRef::Teacher(teacher_id)).await
}

/// Load a fresh snapshot and compute suggestions for a student
pub async fn suggest_teachers<S: Store>(
    store: &S,
    suggester: &Suggester,
    student_id: i32,
) -> Result<SuggestionResult, AppError> {
    let students: Vec<Student> = store.list_students(None).await?;
    let teachers = store.list_teachers().await?;

    Ok(suggester.suggest(student_id, &students, &teachers))
}
