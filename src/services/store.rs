use std::future::Future;

use crate::error::AppError;
use crate::models::{
    EntityRef, EntityState, Language, Match, NewStudent, NewTeacher, Status, StatusUpdate, Student,
    StudentChanges, Teacher, TeacherChanges,
};

/// Audit fields written together with a status change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatusUpdate {
    pub entity: EntityRef,
    pub previous_status_id: i32,
    pub next_status_id: i32,
    pub updated_by: String,
    pub reason: Option<String>,
}

/// Persistence collaborator for students, teachers, statuses and matches
///
/// Missing records are reported as [`AppError::NotFound`] and duplicate keys
/// as [`AppError::UniqueConstraintViolation`].
pub trait Store: Send + Sync + 'static {
    /// List students, optionally only those whose status has the given description
    fn list_students(
        &self,
        status: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Student>, AppError>> + Send;

    fn get_student(&self, student_id: i32) -> impl Future<Output = Result<Student, AppError>> + Send;

    fn create_student(
        &self,
        student: NewStudent,
    ) -> impl Future<Output = Result<Student, AppError>> + Send;

    /// Apply profile edits to a student; the status is never touched here
    fn update_student(
        &self,
        student_id: i32,
        changes: StudentChanges,
    ) -> impl Future<Output = Result<Student, AppError>> + Send;

    fn create_teacher(
        &self,
        teacher: NewTeacher,
    ) -> impl Future<Output = Result<Teacher, AppError>> + Send;

    /// Apply profile edits to a teacher; the status is never touched here
    fn update_teacher(
        &self,
        teacher_id: i32,
        changes: TeacherChanges,
    ) -> impl Future<Output = Result<Teacher, AppError>> + Send;

    fn list_teachers(&self) -> impl Future<Output = Result<Vec<Teacher>, AppError>> + Send;

    fn get_teacher(&self, teacher_id: i32) -> impl Future<Output = Result<Teacher, AppError>> + Send;

    fn list_statuses(&self) -> impl Future<Output = Result<Vec<Status>, AppError>> + Send;

    fn status_by_id(
        &self,
        status_id: i32,
    ) -> impl Future<Output = Result<Option<Status>, AppError>> + Send;

    /// Look up a status by description, ignoring case
    fn status_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Status>, AppError>> + Send;

    /// Look up a language by name, ignoring case
    fn language_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Language>, AppError>> + Send;

    /// Current status of a teacher or student
    fn entity_status(&self, entity: EntityRef) -> impl Future<Output = Result<Status, AppError>> + Send;

    /// Set the entity's status and append the audit record in one atomic step
    ///
    /// The write only happens while the entity still holds
    /// `update.previous_status_id`; otherwise nothing is written and a
    /// [`AppError::Validation`] is returned.
    fn apply_transition(
        &self,
        next: &Status,
        update: NewStatusUpdate,
    ) -> impl Future<Output = Result<(EntityState, StatusUpdate), AppError>> + Send;

    /// Audit trail of an entity, oldest first
    fn status_updates_for(
        &self,
        entity: EntityRef,
    ) -> impl Future<Output = Result<Vec<StatusUpdate>, AppError>> + Send;

    fn create_match(
        &self,
        student_id: i32,
        teacher_id: i32,
    ) -> impl Future<Output = Result<Match, AppError>> + Send;

    fn list_matches(&self) -> impl Future<Output = Result<Vec<Match>, AppError>> + Send;

    /// Remove every match of the entity, returning how many were removed
    ///
    /// Removing nothing is not an error.
    fn remove_matches(&self, entity: EntityRef) -> impl Future<Output = Result<u64, AppError>> + Send;

    fn health_check(&self) -> impl Future<Output = Result<bool, AppError>> + Send;
}
