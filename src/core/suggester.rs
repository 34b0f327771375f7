use crate::core::{filters::candidate_pool, ranking::compare_candidates};
use crate::models::{Student, Teacher};

/// Maximum number of teachers suggested for a student
pub const MAX_SUGGESTIONS: usize = 5;

/// Result of a suggestion query
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionResult {
    pub teachers: Vec<Teacher>,
    /// Size of the candidate pool before truncation
    pub total_candidates: usize,
}

/// Teacher suggestion engine
///
/// # Pipeline Stages
/// 1. Student lookup (absent student yields no suggestions)
/// 2. Language filter
/// 3. Stable sort by availability, then join date
/// 4. Truncation
///
/// Works on an explicit snapshot and never mutates it. Callers must pass a
/// fresh snapshot after any status transition.
#[derive(Debug, Clone, Copy)]
pub struct Suggester {
    limit: usize,
}

impl Suggester {
    /// Create a suggester returning at most `limit` teachers, capped at [`MAX_SUGGESTIONS`]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.min(MAX_SUGGESTIONS),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Suggest teachers for a student
    ///
    /// # Arguments
    /// * `student_id` - The student to find teachers for
    /// * `students` - Current snapshot of students
    /// * `teachers` - Current snapshot of teachers
    pub fn suggest(
        &self,
        student_id: i32,
        students: &[Student],
        teachers: &[Teacher],
    ) -> SuggestionResult {
        let Some(student) = students.iter().find(|s| s.student_id == student_id) else {
            tracing::debug!("No student {} in snapshot, no suggestions", student_id);
            return SuggestionResult {
                teachers: Vec::new(),
                total_candidates: 0,
            };
        };

        let mut pool = candidate_pool(student, teachers);
        let total_candidates = pool.len();

        // sort_by is stable, so equal keys keep snapshot order
        pool.sort_by(|a, b| compare_candidates(a, b));
        pool.truncate(self.limit);

        SuggestionResult {
            teachers: pool.into_iter().cloned().collect(),
            total_candidates,
        }
    }
}

impl Default for Suggester {
    fn default() -> Self {
        Self::new(MAX_SUGGESTIONS)
    }
}
