use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    EntityRef, EntityState, Language, Match, NewStudent, NewTeacher, Status, StatusUpdate, Student,
    StudentChanges, Teacher, TeacherChanges, MATCHED, UNMATCHED,
};
use crate::services::store::{NewStatusUpdate, Store};

/// Statuses every store starts with
pub fn default_statuses() -> Vec<Status> {
    vec![
        Status::new(1, MATCHED),
        Status::new(2, UNMATCHED),
        Status::new(3, "PENDING"),
        Status::new(4, "ARCHIVED"),
    ]
}

/// Languages every store starts with
pub fn default_languages() -> Vec<Language> {
    ["English", "Spanish", "Arabic", "Mandarin", "French", "Vietnamese", "Farsi"]
        .iter()
        .zip(1..)
        .map(|(name, language_id)| Language {
            language_id,
            name: name.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone)]
struct StudentRow {
    native_language_id: i32,
    english_proficiency: Option<String>,
    phone_number: Option<String>,
    status_id: i32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct TeacherRow {
    native_language_id: i32,
    second_language_id: Option<i32>,
    status_id: i32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    statuses: Vec<Status>,
    languages: Vec<Language>,
    students: BTreeMap<i32, StudentRow>,
    teachers: BTreeMap<i32, TeacherRow>,
    status_updates: Vec<StatusUpdate>,
    matches: BTreeMap<i32, Match>,
    next_match_id: i32,
}

impl Tables {
    fn check_language(&self, language_id: i32) -> Result<(), AppError> {
        if self.languages.iter().any(|l| l.language_id == language_id) {
            Ok(())
        } else {
            Err(AppError::Validation(format!("language #{} does not exist", language_id)))
        }
    }

    fn check_phone(&self, phone: &str, owner: Option<i32>) -> Result<(), AppError> {
        let taken = self
            .students
            .iter()
            .any(|(id, s)| Some(*id) != owner && s.phone_number.as_deref() == Some(phone));
        if taken {
            return Err(AppError::UniqueConstraintViolation {
                message: format!("phone number {} already registered", phone),
                constraint: Some("students_phone_number_key".to_string()),
                table: Some("students".to_string()),
            });
        }
        Ok(())
    }

    fn status(&self, status_id: i32) -> Result<Status, AppError> {
        self.statuses
            .iter()
            .find(|s| s.status_id == status_id)
            .cloned()
            .ok_or_else(|| AppError::Validation(format!("status #{} does not exist", status_id)))
    }

    fn student(&self, student_id: i32) -> Result<Student, AppError> {
        let row = self
            .students
            .get(&student_id)
            .ok_or_else(|| AppError::NotFound(format!("student {}", student_id)))?;

        Ok(Student {
            student_id,
            native_language_id: row.native_language_id,
            english_proficiency: row.english_proficiency.clone(),
            phone_number: row.phone_number.clone(),
            status: self.status(row.status_id)?,
            created_at: row.created_at,
        })
    }

    fn teacher(&self, teacher_id: i32) -> Result<Teacher, AppError> {
        let row = self
            .teachers
            .get(&teacher_id)
            .ok_or_else(|| AppError::NotFound(format!("teacher {}", teacher_id)))?;

        Ok(Teacher {
            teacher_id,
            native_language_id: row.native_language_id,
            second_language_id: row.second_language_id,
            status: self.status(row.status_id)?,
            created_at: row.created_at,
        })
    }

    fn entity(&self, entity: EntityRef) -> Result<EntityState, AppError> {
        match entity {
            EntityRef::Teacher(id) => self.teacher(id).map(EntityState::Teacher),
            EntityRef::Student(id) => self.student(id).map(EntityState::Student),
        }
    }
}

/// In-process store backed by ordered maps
///
/// Used when `database.url` is `memory` and by the test suites. Seeded with
/// [`default_statuses`] and [`default_languages`].
#[derive(Debug)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    fail_unmatch: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                statuses: default_statuses(),
                languages: default_languages(),
                next_match_id: 1,
                ..Default::default()
            }),
            fail_unmatch: AtomicBool::new(false),
        }
    }

    /// Insert a teacher with an explicit id and join date
    pub async fn insert_teacher(&self, teacher: &Teacher) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        tables.status(teacher.status_id())?;
        if tables.teachers.contains_key(&teacher.teacher_id) {
            return Err(AppError::UniqueConstraintViolation {
                message: format!("teacher {} already exists", teacher.teacher_id),
                constraint: Some("teachers_pkey".to_string()),
                table: Some("teachers".to_string()),
            });
        }
        tables.teachers.insert(
            teacher.teacher_id,
            TeacherRow {
                native_language_id: teacher.native_language_id,
                second_language_id: teacher.second_language_id,
                status_id: teacher.status_id(),
                created_at: teacher.created_at,
            },
        );
        Ok(())
    }

    /// Make every following match removal fail, to exercise side-effect reporting
    pub fn set_unmatch_failure(&self, fail: bool) {
        self.fail_unmatch.store(fail, Ordering::SeqCst);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for InMemoryStore {
    async fn list_students(&self, status: Option<&str>) -> Result<Vec<Student>, AppError> {
        let tables = self.tables.read().await;
        let mut students = Vec::with_capacity(tables.students.len());
        for id in tables.students.keys() {
            let student = tables.student(*id)?;
            let keep = status
                .map(|name| student.status.description.eq_ignore_ascii_case(name))
                .unwrap_or(true);
            if keep {
                students.push(student);
            }
        }
        Ok(students)
    }

    async fn get_student(&self, student_id: i32) -> Result<Student, AppError> {
        self.tables.read().await.student(student_id)
    }

    async fn create_student(&self, student: NewStudent) -> Result<Student, AppError> {
        let mut tables = self.tables.write().await;
        tables.status(student.status_id)?;
        tables.check_language(student.native_language_id)?;
        if let Some(phone) = &student.phone_number {
            tables.check_phone(phone, None)?;
        }

        let student_id = tables.students.keys().next_back().map(|id| id + 1).unwrap_or(1);
        tables.students.insert(
            student_id,
            StudentRow {
                native_language_id: student.native_language_id,
                english_proficiency: student.english_proficiency,
                phone_number: student.phone_number,
                status_id: student.status_id,
                created_at: Utc::now(),
            },
        );
        tables.student(student_id)
    }

    async fn update_student(&self, student_id: i32, changes: StudentChanges) -> Result<Student, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.students.contains_key(&student_id) {
            return Err(AppError::NotFound(format!("student {}", student_id)));
        }
        if let Some(language_id) = changes.native_language_id {
            tables.check_language(language_id)?;
        }
        if let Some(phone) = &changes.phone_number {
            tables.check_phone(phone, Some(student_id))?;
        }

        if let Some(row) = tables.students.get_mut(&student_id) {
            if let Some(language_id) = changes.native_language_id {
                row.native_language_id = language_id;
            }
            if changes.english_proficiency.is_some() {
                row.english_proficiency = changes.english_proficiency;
            }
            if changes.phone_number.is_some() {
                row.phone_number = changes.phone_number;
            }
        }
        tables.student(student_id)
    }

    async fn create_teacher(&self, teacher: NewTeacher) -> Result<Teacher, AppError> {
        let mut tables = self.tables.write().await;
        tables.status(teacher.status_id)?;
        tables.check_language(teacher.native_language_id)?;
        if let Some(second) = teacher.second_language_id {
            tables.check_language(second)?;
        }

        let teacher_id = tables.teachers.keys().next_back().map(|id| id + 1).unwrap_or(1);
        tables.teachers.insert(
            teacher_id,
            TeacherRow {
                native_language_id: teacher.native_language_id,
                second_language_id: teacher.second_language_id,
                status_id: teacher.status_id,
                created_at: Utc::now(),
            },
        );
        tables.teacher(teacher_id)
    }

    async fn update_teacher(&self, teacher_id: i32, changes: TeacherChanges) -> Result<Teacher, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.teachers.contains_key(&teacher_id) {
            return Err(AppError::NotFound(format!("teacher {}", teacher_id)));
        }
        for language_id in [changes.native_language_id, changes.second_language_id]
            .into_iter()
            .flatten()
        {
            tables.check_language(language_id)?;
        }

        if let Some(row) = tables.teachers.get_mut(&teacher_id) {
            if let Some(language_id) = changes.native_language_id {
                row.native_language_id = language_id;
            }
            if changes.second_language_id.is_some() {
                row.second_language_id = changes.second_language_id;
            }
        }
        tables.teacher(teacher_id)
    }

    async fn list_teachers(&self) -> Result<Vec<Teacher>, AppError> {
        let tables = self.tables.read().await;
        tables.teachers.keys().map(|id| tables.teacher(*id)).collect()
    }

    async fn get_teacher(&self, teacher_id: i32) -> Result<Teacher, AppError> {
        self.tables.read().await.teacher(teacher_id)
    }

    async fn list_statuses(&self) -> Result<Vec<Status>, AppError> {
        Ok(self.tables.read().await.statuses.clone())
    }

    async fn status_by_id(&self, status_id: i32) -> Result<Option<Status>, AppError> {
        Ok(self.tables.read().await.status(status_id).ok())
    }

    async fn status_by_name(&self, name: &str) -> Result<Option<Status>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .statuses
            .iter()
            .find(|s| s.description.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn language_by_name(&self, name: &str) -> Result<Option<Language>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .languages
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn entity_status(&self, entity: EntityRef) -> Result<Status, AppError> {
        let tables = self.tables.read().await;
        tables.entity(entity).map(|state| state.status().clone())
    }

    async fn apply_transition(
        &self,
        next: &Status,
        update: NewStatusUpdate,
    ) -> Result<(EntityState, StatusUpdate), AppError> {
        let mut tables = self.tables.write().await;
        tables.status(next.status_id)?;

        let current = match update.entity {
            EntityRef::Teacher(id) => tables
                .teachers
                .get_mut(&id)
                .map(|row| &mut row.status_id)
                .ok_or_else(|| AppError::NotFound(format!("teacher {}", id)))?,
            EntityRef::Student(id) => tables
                .students
                .get_mut(&id)
                .map(|row| &mut row.status_id)
                .ok_or_else(|| AppError::NotFound(format!("student {}", id)))?,
        };
        if *current != update.previous_status_id {
            let held = *current;
            return Err(AppError::Validation(format!(
                "{} is currently {}, the transition was based on an older status",
                update.entity,
                tables.status(held)?.description
            )));
        }
        *current = next.status_id;

        let record = StatusUpdate {
            status_update_id: Uuid::new_v4(),
            entity_kind: update.entity.kind(),
            entity_id: update.entity.id(),
            previous_status_id: update.previous_status_id,
            next_status_id: update.next_status_id,
            updated_by: update.updated_by,
            reason: update.reason,
            created_at: Utc::now(),
        };
        tables.status_updates.push(record.clone());

        Ok((tables.entity(update.entity)?, record))
    }

    async fn status_updates_for(&self, entity: EntityRef) -> Result<Vec<StatusUpdate>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .status_updates
            .iter()
            .filter(|u| u.entity_kind == entity.kind() && u.entity_id == entity.id())
            .cloned()
            .collect())
    }

    async fn create_match(&self, student_id: i32, teacher_id: i32) -> Result<Match, AppError> {
        let mut tables = self.tables.write().await;
        tables.student(student_id)?;
        tables.teacher(teacher_id)?;
        if tables
            .matches
            .values()
            .any(|m| m.student_id == student_id && m.teacher_id == teacher_id)
        {
            return Err(AppError::UniqueConstraintViolation {
                message: format!("student {} is already matched with teacher {}", student_id, teacher_id),
                constraint: Some("matches_student_id_teacher_id_key".to_string()),
                table: Some("matches".to_string()),
            });
        }

        let match_id = tables.next_match_id;
        tables.next_match_id += 1;
        let record = Match {
            match_id,
            student_id,
            teacher_id,
            created_at: Utc::now(),
        };
        tables.matches.insert(match_id, record.clone());
        Ok(record)
    }

    async fn list_matches(&self) -> Result<Vec<Match>, AppError> {
        Ok(self.tables.read().await.matches.values().cloned().collect())
    }

    async fn remove_matches(&self, entity: EntityRef) -> Result<u64, AppError> {
        if self.fail_unmatch.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("match table unavailable".to_string()));
        }

        let mut tables = self.tables.write().await;
        let before = tables.matches.len();
        tables.matches.retain(|_, m| match entity {
            EntityRef::Teacher(id) => m.teacher_id != id,
            EntityRef::Student(id) => m.student_id != id,
        });
        Ok((before - tables.matches.len()) as u64)
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_student(language: i32) -> NewStudent {
        NewStudent {
            native_language_id: language,
            english_proficiency: None,
            phone_number: Some("555-0100".to_string()),
            status_id: 2,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_student() {
        let store = InMemoryStore::new();

        let created = store.create_student(new_student(2)).await.unwrap();
        let fetched = store.get_student(created.student_id).await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.status.description, UNMATCHED);
    }

    #[tokio::test]
    async fn test_duplicate_phone_number_is_unique_violation() {
        let store = InMemoryStore::new();
        store.create_student(new_student(2)).await.unwrap();

        let result = store.create_student(new_student(3)).await;

        assert!(matches!(result, Err(AppError::UniqueConstraintViolation { .. })));
    }

    #[tokio::test]
    async fn test_list_students_filters_by_status() {
        let store = InMemoryStore::new();
        store.create_student(new_student(2)).await.unwrap();

        assert_eq!(store.list_students(Some("unmatched")).await.unwrap().len(), 1);
        assert!(store.list_students(Some(MATCHED)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_matches_without_matches_is_noop() {
        let store = InMemoryStore::new();

        assert_eq!(store.remove_matches(EntityRef::Teacher(1)).await.unwrap(), 0);
    }

    fn audit(entity: EntityRef, previous_status_id: i32, next_status_id: i32) -> NewStatusUpdate {
        NewStatusUpdate {
            entity,
            previous_status_id,
            next_status_id,
            updated_by: "admin".to_string(),
            reason: None,
        }
    }

    #[tokio::test]
    async fn test_apply_transition_rechecks_previous_status() {
        let store = InMemoryStore::new();
        let student = store.create_student(new_student(2)).await.unwrap();
        let entity = EntityRef::Student(student.student_id);
        let archived = Status::new(4, "ARCHIVED");

        store
            .apply_transition(&Status::new(1, MATCHED), audit(entity, 2, 1))
            .await
            .unwrap();
        // Based on the UNMATCHED read taken before the first write
        let stale = store.apply_transition(&archived, audit(entity, 2, 4)).await;

        assert!(matches!(stale, Err(AppError::Validation(_))));
        assert!(store.get_student(student.student_id).await.unwrap().status.is_matched());
        let trail = store.status_updates_for(entity).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].next_status_id, 1);
    }

    #[tokio::test]
    async fn test_update_student_keeps_own_phone_number() {
        let store = InMemoryStore::new();
        let student = store.create_student(new_student(2)).await.unwrap();
        let changes = StudentChanges {
            native_language_id: Some(3),
            phone_number: Some("555-0100".to_string()),
            ..Default::default()
        };

        let updated = store.update_student(student.student_id, changes).await.unwrap();

        assert_eq!(updated.native_language_id, 3);
        assert_eq!(updated.status, student.status);
    }

    #[tokio::test]
    async fn test_update_student_rejects_taken_phone_number() {
        let store = InMemoryStore::new();
        store.create_student(new_student(2)).await.unwrap();
        let mut other = new_student(2);
        other.phone_number = Some("555-0111".to_string());
        let other = store.create_student(other).await.unwrap();
        let changes = StudentChanges {
            phone_number: Some("555-0100".to_string()),
            ..Default::default()
        };

        let result = store.update_student(other.student_id, changes).await;

        assert!(matches!(result, Err(AppError::UniqueConstraintViolation { .. })));
    }

    #[tokio::test]
    async fn test_update_missing_teacher_is_not_found() {
        let store = InMemoryStore::new();

        let result = store.update_teacher(9, TeacherChanges::default()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
