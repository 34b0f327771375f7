// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    EntityKind, EntityRef, EntityState, Language, Match, NewStudent, NewTeacher, Status, StatusRef,
    StatusTransition, StatusUpdate, Student, StudentChanges, Teacher, TeacherChanges, MATCHED,
    UNMATCHED,
};
pub use requests::{
    CreateMatchRequest, CreateStudentRequest, CreateTeacherRequest, PatchStudentRequest,
    PatchTeacherRequest, StatusUpdateRequest, StatusUpdatesQuery, StudentListQuery,
    UnmatchTeacherRequest,
};
pub use responses::{
    EntityStatusResponse, ErrorResponse, HealthResponse, SuggestionsResponse, TransitionResponse,
    UnmatchResponse,
};
