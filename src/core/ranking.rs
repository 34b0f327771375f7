use std::cmp::Ordering;

use crate::models::{Status, Teacher};

/// Availability bucket used as the primary sort key
///
/// UNMATCHED teachers come before MATCHED ones. Any other status has no
/// agreed ordering yet and is placed after both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Availability {
    Unmatched,
    Matched,
    Other,
}

impl From<&Status> for Availability {
    fn from(status: &Status) -> Self {
        if status.is_unmatched() {
            Availability::Unmatched
        } else if status.is_matched() {
            Availability::Matched
        } else {
            Availability::Other
        }
    }
}

/// Compare two candidates: availability first, then earliest join date
///
/// This is a total order, so it is safe for `sort_by`. Equal keys compare
/// `Equal` and keep their input order under a stable sort.
#[inline]
pub fn compare_candidates(a: &Teacher, b: &Teacher) -> Ordering {
    Availability::from(&a.status)
        .cmp(&Availability::from(&b.status))
        .then_with(|| a.created_at.cmp(&b.created_at))
}
