// Core algorithm exports
pub mod filters;
pub mod ranking;
pub mod suggester;
pub mod transition;

pub use filters::{candidate_pool, speaks_student_language};
pub use ranking::{compare_candidates, Availability};
pub use suggester::{Suggester, SuggestionResult, MAX_SUGGESTIONS};
pub use transition::{plan_transition, releases_matches, TransitionPlan};
