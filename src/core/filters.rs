use crate::models::{Student, Teacher};

/// Check if a teacher can teach a student
///
/// This is the candidate pool filter: the teacher's native or second
/// language must equal the student's native language.
#[inline]
pub fn speaks_student_language(teacher: &Teacher, student: &Student) -> bool {
    teacher.speaks(student.native_language_id)
}

/// Collect the candidate pool for a student, keeping input order
pub fn candidate_pool<'a>(student: &Student, teachers: &'a [Teacher]) -> Vec<&'a Teacher> {
    teachers
        .iter()
        .filter(|teacher| speaks_student_language(teacher, student))
        .collect()
}
