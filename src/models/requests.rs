use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::models::domain::{EntityRef, StatusRef, StatusTransition};

/// Status transition request as sent by the admin frontend
///
/// Exactly one of `TeacherID`/`StudentID` must be present. Each side of the
/// transition is given by id or by name; the id wins when both are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StatusUpdateRequest {
    #[validate(range(min = 1))]
    #[serde(rename = "TeacherID", alias = "teacherId", default)]
    pub teacher_id: Option<i32>,
    #[validate(range(min = 1))]
    #[serde(rename = "StudentID", alias = "studentId", default)]
    pub student_id: Option<i32>,
    #[serde(rename = "PreviousStatusID", default)]
    pub previous_status_id: Option<i32>,
    #[serde(rename = "PreviousStatusString", default)]
    pub previous_status_string: Option<String>,
    #[serde(rename = "NextStatusID", default)]
    pub next_status_id: Option<i32>,
    #[serde(rename = "NextStatusString", default)]
    pub next_status_string: Option<String>,
    #[validate(length(min = 1))]
    #[serde(rename = "UpdatedBy")]
    pub updated_by: String,
    #[serde(rename = "ReasonString", alias = "Reason", default)]
    pub reason: Option<String>,
}

impl StatusUpdateRequest {
    /// Validate the body and convert it into the canonical typed request
    pub fn into_transition(self) -> Result<StatusTransition, AppError> {
        self.validate()?;

        let entity = match (self.teacher_id, self.student_id) {
            (Some(id), None) => EntityRef::Teacher(id),
            (None, Some(id)) => EntityRef::Student(id),
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "only one of TeacherID and StudentID may be given".to_string(),
                ))
            }
            (None, None) => {
                return Err(AppError::Validation(
                    "one of TeacherID or StudentID is required".to_string(),
                ))
            }
        };

        let updated_by = non_empty(Some(self.updated_by))
            .ok_or_else(|| AppError::Validation("UpdatedBy must not be blank".to_string()))?;
        let previous = status_ref(self.previous_status_id, self.previous_status_string, "PreviousStatus")?;
        let next = status_ref(self.next_status_id, self.next_status_string, "NextStatus")?;

        Ok(StatusTransition {
            entity,
            previous,
            next,
            updated_by,
            reason: non_empty(self.reason),
        })
    }
}

fn status_ref(id: Option<i32>, name: Option<String>, field: &str) -> Result<StatusRef, AppError> {
    match (id, non_empty(name)) {
        (Some(id), _) => Ok(StatusRef::Id(id)),
        (None, Some(name)) => Ok(StatusRef::Name(name)),
        (None, None) => Err(AppError::Validation(format!(
            "{field}ID or {field}String is required"
        ))),
    }
}

/// Treat blank strings the same as missing ones
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Request to create a student
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(range(min = 1))]
    #[serde(rename = "NativeLanguageID", default)]
    pub native_language_id: Option<i32>,
    #[serde(rename = "NativeLanguageString", default)]
    pub native_language_string: Option<String>,
    #[serde(rename = "EnglishProficiency", default)]
    pub english_proficiency: Option<String>,
    #[serde(rename = "PhoneNumber", default)]
    pub phone_number: Option<String>,
    #[validate(range(min = 1))]
    #[serde(rename = "StatusID", default)]
    pub status_id: Option<i32>,
    #[serde(rename = "StatusString", default)]
    pub status_string: Option<String>,
}

/// Request to register a teacher
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateTeacherRequest {
    #[validate(range(min = 1))]
    #[serde(rename = "NativeLanguageID")]
    pub native_language_id: i32,
    #[validate(range(min = 1))]
    #[serde(rename = "SecondLanguageID", default)]
    pub second_language_id: Option<i32>,
    #[validate(range(min = 1))]
    #[serde(rename = "StatusID", default)]
    pub status_id: Option<i32>,
    #[serde(rename = "StatusString", default)]
    pub status_string: Option<String>,
}

/// Profile edit for a student
///
/// Blank strings leave the field unchanged. A status given here must equal the
/// current one; status changes go through `/api/status-updates`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PatchStudentRequest {
    #[validate(range(min = 1))]
    #[serde(rename = "NativeLanguageID", default)]
    pub native_language_id: Option<i32>,
    #[serde(rename = "NativeLanguageString", default)]
    pub native_language_string: Option<String>,
    #[serde(rename = "EnglishProficiency", default)]
    pub english_proficiency: Option<String>,
    #[serde(rename = "PhoneNumber", default)]
    pub phone_number: Option<String>,
    #[validate(range(min = 1))]
    #[serde(rename = "StatusID", default)]
    pub status_id: Option<i32>,
    #[serde(rename = "StatusString", default)]
    pub status_string: Option<String>,
}

/// Profile edit for a teacher, with the same rules as [`PatchStudentRequest`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PatchTeacherRequest {
    #[validate(range(min = 1))]
    #[serde(rename = "NativeLanguageID", default)]
    pub native_language_id: Option<i32>,
    #[serde(rename = "NativeLanguageString", default)]
    pub native_language_string: Option<String>,
    #[validate(range(min = 1))]
    #[serde(rename = "SecondLanguageID", default)]
    pub second_language_id: Option<i32>,
    #[serde(rename = "SecondLanguageString", default)]
    pub second_language_string: Option<String>,
    #[validate(range(min = 1))]
    #[serde(rename = "StatusID", default)]
    pub status_id: Option<i32>,
    #[serde(rename = "StatusString", default)]
    pub status_string: Option<String>,
}

/// Request to pair a student with a teacher
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMatchRequest {
    #[validate(range(min = 1))]
    #[serde(rename = "StudentID")]
    pub student_id: i32,
    #[validate(range(min = 1))]
    #[serde(rename = "TeacherID")]
    pub teacher_id: i32,
}

/// Explicit unmatch request for a teacher moving to a new status
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UnmatchTeacherRequest {
    #[validate(range(min = 1))]
    #[serde(rename = "TeacherID")]
    pub teacher_id: i32,
    #[validate(length(min = 1))]
    #[serde(rename = "NextStatusString")]
    pub next_status_string: String,
}

/// Query selecting the audit trail of one entity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdatesQuery {
    #[serde(rename = "teacherId", default)]
    pub teacher_id: Option<i32>,
    #[serde(rename = "studentId", default)]
    pub student_id: Option<i32>,
}

impl StatusUpdatesQuery {
    pub fn entity(&self) -> Result<EntityRef, AppError> {
        match (self.teacher_id, self.student_id) {
            (Some(id), None) => Ok(EntityRef::Teacher(id)),
            (None, Some(id)) => Ok(EntityRef::Student(id)),
            _ => Err(AppError::Validation(
                "exactly one of teacherId or studentId is required".to_string(),
            )),
        }
    }
}

/// Optional status filter for student listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentListQuery {
    #[serde(default)]
    pub status: Option<String>,
}
