use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Description of the status held by a teacher or student with an active match
pub const MATCHED: &str = "MATCHED";
/// Description of the status held by a teacher or student free to be matched
pub const UNMATCHED: &str = "UNMATCHED";

/// Lifecycle status shared by teachers and students
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(rename = "StatusID")]
    pub status_id: i32,
    #[serde(rename = "Description")]
    pub description: String,
}

impl Status {
    pub fn new(status_id: i32, description: impl Into<String>) -> Self {
        Self {
            status_id,
            description: description.into(),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.description.eq_ignore_ascii_case(MATCHED)
    }

    pub fn is_unmatched(&self) -> bool {
        self.description.eq_ignore_ascii_case(UNMATCHED)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    #[serde(rename = "LanguageID")]
    pub language_id: i32,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Student enrolled in the program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(rename = "StudentID")]
    pub student_id: i32,
    #[serde(rename = "NativeLanguageID")]
    pub native_language_id: i32,
    #[serde(rename = "EnglishProficiency", default)]
    pub english_proficiency: Option<String>,
    #[serde(rename = "PhoneNumber", default)]
    pub phone_number: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

/// Volunteer teacher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(rename = "TeacherID")]
    pub teacher_id: i32,
    #[serde(rename = "NativeLanguageID")]
    pub native_language_id: i32,
    #[serde(rename = "SecondLanguageID", default)]
    pub second_language_id: Option<i32>,
    pub status: Status,
    /// When the teacher joined the program
    pub created_at: DateTime<Utc>,
}

impl Teacher {
    pub fn status_id(&self) -> i32 {
        self.status.status_id
    }

    /// Whether the teacher speaks the given language natively or as a second language
    pub fn speaks(&self, language_id: i32) -> bool {
        self.native_language_id == language_id || self.second_language_id == Some(language_id)
    }
}

/// Kind of record a status transition applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Teacher,
    Student,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Teacher => "teacher",
            EntityKind::Student => "student",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a teacher or student by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Teacher(i32),
    Student(i32),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Teacher(_) => EntityKind::Teacher,
            EntityRef::Student(_) => EntityKind::Student,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            EntityRef::Teacher(id) | EntityRef::Student(id) => *id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// A status given either by its stable id or by its description
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusRef {
    Id(i32),
    Name(String),
}

impl fmt::Display for StatusRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusRef::Id(id) => write!(f, "status #{}", id),
            StatusRef::Name(name) => write!(f, "status '{}'", name),
        }
    }
}

/// Canonical status transition request, resolved from the wire format once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub entity: EntityRef,
    pub previous: StatusRef,
    pub next: StatusRef,
    pub updated_by: String,
    pub reason: Option<String>,
}

/// Append-only audit record of a status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(rename = "StatusUpdateID")]
    pub status_update_id: Uuid,
    #[serde(rename = "EntityType")]
    pub entity_kind: EntityKind,
    #[serde(rename = "EntityID")]
    pub entity_id: i32,
    #[serde(rename = "PreviousStatusID")]
    pub previous_status_id: i32,
    #[serde(rename = "NextStatusID")]
    pub next_status_id: i32,
    #[serde(rename = "UpdatedBy")]
    pub updated_by: String,
    #[serde(rename = "Reason")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Active pairing between a student and a teacher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(rename = "MatchID")]
    pub match_id: i32,
    #[serde(rename = "StudentID")]
    pub student_id: i32,
    #[serde(rename = "TeacherID")]
    pub teacher_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a student once names have been resolved to ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub native_language_id: i32,
    pub english_proficiency: Option<String>,
    pub phone_number: Option<String>,
    pub status_id: i32,
}

/// Fields needed to create a teacher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeacher {
    pub native_language_id: i32,
    pub second_language_id: Option<i32>,
    pub status_id: i32,
}

/// Profile edits to a student; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentChanges {
    pub native_language_id: Option<i32>,
    pub english_proficiency: Option<String>,
    pub phone_number: Option<String>,
}

/// Profile edits to a teacher; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeacherChanges {
    pub native_language_id: Option<i32>,
    pub second_language_id: Option<i32>,
}

/// Teacher or student as stored after a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityState {
    Teacher(Teacher),
    Student(Student),
}

impl EntityState {
    pub fn status(&self) -> &Status {
        match self {
            EntityState::Teacher(teacher) => &teacher.status,
            EntityState::Student(student) => &student.status,
        }
    }
}
