use serde::{Deserialize, Serialize};

use crate::models::domain::{EntityState, Status, StatusUpdate, Teacher};

/// Response for the status transition endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionResponse {
    pub entity: EntityState,
    #[serde(rename = "statusUpdate")]
    pub status_update: StatusUpdate,
    /// Whether an unmatch was scheduled; it may complete after this response
    #[serde(rename = "unmatchScheduled")]
    pub unmatch_scheduled: bool,
}

/// Response for the suggested teachers endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    #[serde(rename = "studentId")]
    pub student_id: i32,
    pub teachers: Vec<Teacher>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStatusResponse {
    #[serde(rename = "StudentID")]
    pub student_id: i32,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmatchResponse {
    #[serde(rename = "TeacherID")]
    pub teacher_id: i32,
    pub removed: u64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
