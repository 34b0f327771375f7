// Integration tests for Tandem Admin

use actix_web::{http::StatusCode, test, web, App};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tandem_admin::core::Suggester;
use tandem_admin::models::{
    EntityRef, EntityState, Language, Match, NewStudent, NewTeacher, Status, StatusRef,
    StatusTransition, StatusUpdate, Student, StudentChanges, Teacher, TeacherChanges, MATCHED,
    UNMATCHED,
};
use tandem_admin::routes::{self, AppState};
use tandem_admin::services::{
    roster, InMemoryStore, NewStatusUpdate, StatusCache, StatusTransitionHandler, Store,
};
use tandem_admin::AppError;
use tokio::sync::Barrier;
use tokio_test::{assert_err, assert_ok};

async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    let teachers = [
        (1, 2, None, Status::new(1, MATCHED), 30),
        (2, 2, Some(3), Status::new(2, UNMATCHED), 10),
        (3, 5, None, Status::new(2, UNMATCHED), 20),
    ];
    for (teacher_id, native, second, status, age_days) in teachers {
        store
            .insert_teacher(&Teacher {
                teacher_id,
                native_language_id: native,
                second_language_id: second,
                status,
                created_at: Utc::now() - Duration::days(age_days),
            })
            .await
            .unwrap();
    }
    store
}

fn handler(store: &Arc<InMemoryStore>) -> StatusTransitionHandler<InMemoryStore> {
    StatusTransitionHandler::new(Arc::clone(store), StatusCache::new(64, 60))
}

fn transition(entity: EntityRef, previous: &str, next: &str) -> StatusTransition {
    StatusTransition {
        entity,
        previous: StatusRef::Name(previous.to_string()),
        next: StatusRef::Name(next.to_string()),
        updated_by: "coordinator".to_string(),
        reason: None,
    }
}

async fn create_student(store: &InMemoryStore, language: &str) -> i32 {
    let cache = StatusCache::new(16, 60);
    let request = tandem_admin::models::CreateStudentRequest {
        native_language_string: Some(language.to_string()),
        ..Default::default()
    };
    let new_student = roster::prepare_new_student(store, &cache, request).await.unwrap();
    store.create_student(new_student).await.unwrap().student_id
}

#[tokio::test]
async fn test_matched_to_unmatched_removes_match() {
    let store = seeded_store().await;
    let student_id = create_student(&store, "Spanish").await;
    assert_ok!(roster::create_match(store.as_ref(), student_id, 1).await);

    let outcome = handler(&store)
        .transition(transition(EntityRef::Teacher(1), MATCHED, UNMATCHED))
        .await
        .unwrap();

    let removed = outcome.unmatch.expect("unmatch scheduled").wait().await.unwrap();
    assert_eq!(removed, 1);
    assert!(store.list_matches().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_unmatch_is_noop() {
    let store = seeded_store().await;
    let cache = StatusCache::new(16, 60);
    let student_id = create_student(&store, "Spanish").await;
    assert_ok!(roster::create_match(store.as_ref(), student_id, 1).await);

    let outcome = handler(&store)
        .transition(transition(EntityRef::Teacher(1), MATCHED, UNMATCHED))
        .await
        .unwrap();
    assert_eq!(outcome.unmatch.expect("unmatch scheduled").wait().await.unwrap(), 1);

    let again = roster::unmatch_teacher(store.as_ref(), &cache, 1, UNMATCHED).await;

    assert_eq!(again.unwrap(), 0);
    assert!(store.list_matches().await.unwrap().is_empty());
    assert!(store.get_teacher(1).await.unwrap().status.is_unmatched());
}

#[tokio::test]
async fn test_student_leaving_matched_releases_matches() {
    let store = seeded_store().await;
    let handler = handler(&store);
    let student_id = create_student(&store, "Spanish").await;
    assert_ok!(roster::create_match(store.as_ref(), student_id, 1).await);

    let entered = handler
        .transition(transition(EntityRef::Student(student_id), UNMATCHED, MATCHED))
        .await
        .unwrap();
    assert!(entered.unmatch.is_none());
    assert_eq!(store.list_matches().await.unwrap().len(), 1);

    let left = handler
        .transition(transition(EntityRef::Student(student_id), MATCHED, "ARCHIVED"))
        .await
        .unwrap();
    let removed = left.unmatch.expect("unmatch scheduled").wait().await.unwrap();

    assert_eq!(removed, 1);
    assert!(store.list_matches().await.unwrap().is_empty());
    // The teacher keeps its own status
    assert!(store.get_teacher(1).await.unwrap().status.is_matched());
}

/// Holds every `entity_status` read until two callers have made one, so both
/// transitions plan against the same snapshot before either writes
struct InterleavedStore {
    inner: InMemoryStore,
    gate: Barrier,
}

impl Store for InterleavedStore {
    async fn list_students(&self, status: Option<&str>) -> Result<Vec<Student>, AppError> {
        self.inner.list_students(status).await
    }

    async fn get_student(&self, student_id: i32) -> Result<Student, AppError> {
        self.inner.get_student(student_id).await
    }

    async fn create_student(&self, student: NewStudent) -> Result<Student, AppError> {
        self.inner.create_student(student).await
    }

    async fn update_student(&self, student_id: i32, changes: StudentChanges) -> Result<Student, AppError> {
        self.inner.update_student(student_id, changes).await
    }

    async fn create_teacher(&self, teacher: NewTeacher) -> Result<Teacher, AppError> {
        self.inner.create_teacher(teacher).await
    }

    async fn update_teacher(&self, teacher_id: i32, changes: TeacherChanges) -> Result<Teacher, AppError> {
        self.inner.update_teacher(teacher_id, changes).await
    }

    async fn list_teachers(&self) -> Result<Vec<Teacher>, AppError> {
        self.inner.list_teachers().await
    }

    async fn get_teacher(&self, teacher_id: i32) -> Result<Teacher, AppError> {
        self.inner.get_teacher(teacher_id).await
    }

    async fn list_statuses(&self) -> Result<Vec<Status>, AppError> {
        self.inner.list_statuses().await
    }

    async fn status_by_id(&self, status_id: i32) -> Result<Option<Status>, AppError> {
        self.inner.status_by_id(status_id).await
    }

    async fn status_by_name(&self, name: &str) -> Result<Option<Status>, AppError> {
        self.inner.status_by_name(name).await
    }

    async fn language_by_name(&self, name: &str) -> Result<Option<Language>, AppError> {
        self.inner.language_by_name(name).await
    }

    async fn entity_status(&self, entity: EntityRef) -> Result<Status, AppError> {
        let status = self.inner.entity_status(entity).await?;
        self.gate.wait().await;
        Ok(status)
    }

    async fn apply_transition(
        &self,
        next: &Status,
        update: NewStatusUpdate,
    ) -> Result<(EntityState, StatusUpdate), AppError> {
        self.inner.apply_transition(next, update).await
    }

    async fn status_updates_for(&self, entity: EntityRef) -> Result<Vec<StatusUpdate>, AppError> {
        self.inner.status_updates_for(entity).await
    }

    async fn create_match(&self, student_id: i32, teacher_id: i32) -> Result<Match, AppError> {
        self.inner.create_match(student_id, teacher_id).await
    }

    async fn list_matches(&self) -> Result<Vec<Match>, AppError> {
        self.inner.list_matches().await
    }

    async fn remove_matches(&self, entity: EntityRef) -> Result<u64, AppError> {
        self.inner.remove_matches(entity).await
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        self.inner.health_check().await
    }
}

#[tokio::test]
async fn test_concurrent_transitions_from_same_status() {
    let store = Arc::new(InterleavedStore {
        inner: InMemoryStore::new(),
        gate: Barrier::new(2),
    });
    store
        .inner
        .insert_teacher(&Teacher {
            teacher_id: 1,
            native_language_id: 2,
            second_language_id: None,
            status: Status::new(1, MATCHED),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    let handler = StatusTransitionHandler::new(Arc::clone(&store), StatusCache::new(64, 60));

    let (a, b) = tokio::join!(
        handler.transition(transition(EntityRef::Teacher(1), MATCHED, UNMATCHED)),
        handler.transition(transition(EntityRef::Teacher(1), MATCHED, "ARCHIVED")),
    );

    let (won, lost) = match (a, b) {
        (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
        (a, b) => panic!("expected exactly one transition to win: {:?} / {:?}", a.is_ok(), b.is_ok()),
    };
    assert!(matches!(lost, AppError::Validation(_)));

    let trail = store.status_updates_for(EntityRef::Teacher(1)).await.unwrap();
    assert_eq!(trail, vec![won.status_update.clone()]);
    assert_eq!(trail[0].previous_status_id, 1);
    let teacher = store.get_teacher(1).await.unwrap();
    assert_eq!(teacher.status.status_id, trail[0].next_status_id);
}

#[tokio::test]
async fn test_unknown_status_mutates_nothing() {
    let store = seeded_store().await;

    let result = handler(&store)
        .transition(transition(EntityRef::Teacher(1), MATCHED, "FOO"))
        .await;

    assert!(matches!(result, Err(AppError::UnknownStatus(_))));
    assert!(store.get_teacher(1).await.unwrap().status.is_matched());
    assert!(store.status_updates_for(EntityRef::Teacher(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_previous_status_rejected() {
    let store = seeded_store().await;

    let result = handler(&store)
        .transition(transition(EntityRef::Teacher(2), MATCHED, UNMATCHED))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(store.status_updates_for(EntityRef::Teacher(2)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_audit_trail_accumulates() {
    let store = seeded_store().await;
    let handler = handler(&store);

    handler
        .transition(transition(EntityRef::Teacher(2), UNMATCHED, MATCHED))
        .await
        .unwrap();
    let outcome = handler
        .transition(transition(EntityRef::Teacher(2), MATCHED, "ARCHIVED"))
        .await
        .unwrap();
    assert_ok!(outcome.unmatch.expect("leaving MATCHED").wait().await);

    let trail = store.status_updates_for(EntityRef::Teacher(2)).await.unwrap();
    let steps: Vec<(i32, i32)> = trail
        .iter()
        .map(|u| (u.previous_status_id, u.next_status_id))
        .collect();
    assert_eq!(steps, vec![(2, 1), (1, 4)]);
}

#[tokio::test]
async fn test_entering_matched_schedules_nothing() {
    let store = seeded_store().await;

    let outcome = handler(&store)
        .transition(transition(EntityRef::Teacher(3), UNMATCHED, MATCHED))
        .await
        .unwrap();

    assert!(outcome.unmatch.is_none());
}

#[tokio::test]
async fn test_match_requires_matched_teacher() {
    let store = seeded_store().await;
    let student_id = create_student(&store, "Spanish").await;

    let result = roster::create_match(store.as_ref(), student_id, 2).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_duplicate_match_is_unique_violation() {
    let store = seeded_store().await;
    let student_id = create_student(&store, "Spanish").await;
    assert_ok!(roster::create_match(store.as_ref(), student_id, 1).await);

    let result = roster::create_match(store.as_ref(), student_id, 1).await;

    assert!(matches!(result, Err(AppError::UniqueConstraintViolation { .. })));
}

#[tokio::test]
async fn test_suggestions_reflect_transition_after_refresh() {
    let store = seeded_store().await;
    let student_id = create_student(&store, "Spanish").await;
    let suggester = Suggester::default();

    let before = roster::suggest_teachers(store.as_ref(), &suggester, student_id).await.unwrap();
    let before_ids: Vec<i32> = before.teachers.iter().map(|t| t.teacher_id).collect();
    assert_eq!(before_ids, vec![2, 1]);

    handler(&store)
        .transition(transition(EntityRef::Teacher(1), MATCHED, UNMATCHED))
        .await
        .unwrap();

    let after = roster::suggest_teachers(store.as_ref(), &suggester, student_id).await.unwrap();
    let after_ids: Vec<i32> = after.teachers.iter().map(|t| t.teacher_id).collect();
    assert_eq!(after_ids, vec![1, 2]);
}

#[tokio::test]
async fn test_transition_of_missing_student() {
    let store = seeded_store().await;

    assert_err!(
        handler(&store)
            .transition(transition(EntityRef::Student(404), UNMATCHED, MATCHED))
            .await
    );
}

// HTTP layer

macro_rules! test_app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(
                    $store,
                    StatusCache::new(64, 60),
                    Suggester::default(),
                )))
                .app_data(web::JsonConfig::default().error_handler(routes::handle_json_payload_error))
                .configure(routes::configure_routes::<InMemoryStore>),
        )
        .await
    };
}

#[actix_web::test]
async fn test_http_status_update_flow() {
    let store = seeded_store().await;
    let app = test_app!(Arc::clone(&store));

    let req = test::TestRequest::post()
        .uri("/api/status-updates")
        .set_json(json!({
            "TeacherID": 1,
            "PreviousStatusString": "MATCHED",
            "NextStatusString": "UNMATCHED",
            "UpdatedBy": "coordinator",
            "ReasonString": "on leave"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["entity"]["TeacherID"], 1);
    assert_eq!(body["entity"]["status"]["Description"], UNMATCHED);
    assert_eq!(body["statusUpdate"]["Reason"], "on leave");
    assert_eq!(body["unmatchScheduled"], true);
}

#[actix_web::test]
async fn test_http_unknown_status_is_bad_request() {
    let store = seeded_store().await;
    let app = test_app!(store);

    let req = test::TestRequest::post()
        .uri("/api/status-updates")
        .set_json(json!({
            "TeacherID": 1,
            "PreviousStatusString": "MATCHED",
            "NextStatusString": "FOO",
            "UpdatedBy": "coordinator"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "UnknownStatus");
}

#[actix_web::test]
async fn test_http_missing_teacher_is_not_found() {
    let store = seeded_store().await;
    let app = test_app!(store);

    let req = test::TestRequest::get().uri("/api/teachers/99").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_http_suggestions_for_unknown_student_are_empty() {
    let store = seeded_store().await;
    let app = test_app!(store);

    let req = test::TestRequest::get()
        .uri("/api/students/77/suggested-teachers")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["teachers"], json!([]));
}

#[actix_web::test]
async fn test_http_create_student_and_suggest() {
    let store = seeded_store().await;
    let app = test_app!(store);

    let req = test::TestRequest::post()
        .uri("/api/students")
        .set_json(json!({
            "NativeLanguageString": "Spanish",
            "EnglishProficiency": "",
            "PhoneNumber": "555-0101"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let student: Value = test::read_body_json(resp).await;
    assert_eq!(student["status"]["Description"], UNMATCHED);
    assert!(student["EnglishProficiency"].is_null());

    let uri = format!("/api/students/{}/suggested-teachers", student["StudentID"]);
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    let ids: Vec<i64> = body["teachers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["TeacherID"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 1]);
}

#[actix_web::test]
async fn test_http_duplicate_phone_is_conflict() {
    let store = seeded_store().await;
    let app = test_app!(store);
    let body = json!({ "NativeLanguageID": 1, "PhoneNumber": "555-0199" });

    let first = test::TestRequest::post().uri("/api/students").set_json(&body).to_request();
    assert_eq!(test::call_service(&app, first).await.status(), StatusCode::OK);

    let second = test::TestRequest::post().uri("/api/students").set_json(&body).to_request();
    assert_eq!(test::call_service(&app, second).await.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_http_malformed_json_is_bad_request() {
    let store = seeded_store().await;
    let app = test_app!(store);

    let req = test::TestRequest::post()
        .uri("/api/status-updates")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_http_unmatch_teacher_is_idempotent() {
    let store = seeded_store().await;
    let app = test_app!(store);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/matches/unmatch-teacher")
            .set_json(json!({ "TeacherID": 3, "NextStatusString": "UNMATCHED" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["removed"], 0);
    }
}

#[actix_web::test]
async fn test_http_patch_student_resolves_language() {
    let store = seeded_store().await;
    let student_id = create_student(&store, "English").await;
    let app = test_app!(store);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/students/{}", student_id))
        .set_json(json!({
            "NativeLanguageString": "Spanish",
            "EnglishProficiency": "",
            "StatusString": "UNMATCHED"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["NativeLanguageID"], 2);
    assert_eq!(body["status"]["Description"], UNMATCHED);
}

#[actix_web::test]
async fn test_http_patch_cannot_change_status() {
    let store = seeded_store().await;
    let student_id = create_student(&store, "Spanish").await;
    let app = test_app!(Arc::clone(&store));

    let req = test::TestRequest::patch()
        .uri(&format!("/api/students/{}", student_id))
        .set_json(json!({ "StatusString": "MATCHED" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(store.get_student(student_id).await.unwrap().status.is_unmatched());
    assert!(store
        .status_updates_for(EntityRef::Student(student_id))
        .await
        .unwrap()
        .is_empty());
}

#[actix_web::test]
async fn test_http_patch_missing_student_is_not_found() {
    let store = seeded_store().await;
    let app = test_app!(store);

    let req = test::TestRequest::patch()
        .uri("/api/students/404")
        .set_json(json!({ "PhoneNumber": "555-0123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_http_create_and_patch_teacher() {
    let store = seeded_store().await;
    let app = test_app!(store);

    let req = test::TestRequest::post()
        .uri("/api/teachers")
        .set_json(json!({ "NativeLanguageID": 5 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let teacher: Value = test::read_body_json(resp).await;
    assert_eq!(teacher["status"]["Description"], UNMATCHED);

    let uri = format!("/api/teachers/{}", teacher["TeacherID"]);
    let req = test::TestRequest::patch()
        .uri(&uri)
        .set_json(json!({ "SecondLanguageString": "Spanish" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["NativeLanguageID"], 5);
    assert_eq!(body["SecondLanguageID"], 2);
}

#[actix_web::test]
async fn test_http_lists_statuses() {
    let store = seeded_store().await;
    let app = test_app!(store);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/statuses").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body.as_array().map(Vec::len), Some(4));
}
