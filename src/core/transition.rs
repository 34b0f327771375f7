use crate::error::AppError;
use crate::models::{EntityRef, Status};

/// Decision taken for a resolved transition before anything is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub entity: EntityRef,
    pub previous: Status,
    pub next: Status,
    /// Whether the entity's matches must be released after the write
    pub unmatch: bool,
}

/// Check a transition against the entity's current status and plan its side effects
///
/// `current` is the status the entity holds right now. A caller that read an
/// older status gets a validation error instead of silently overwriting a
/// newer transition.
pub fn plan_transition(
    entity: EntityRef,
    current: &Status,
    previous: Status,
    next: Status,
) -> Result<TransitionPlan, AppError> {
    if current.status_id != previous.status_id {
        return Err(AppError::Validation(format!(
            "{} is currently {}, not {}",
            entity, current.description, previous.description
        )));
    }

    Ok(TransitionPlan {
        entity,
        unmatch: releases_matches(&next),
        previous,
        next,
    })
}

/// Anything other than MATCHED means the entity no longer holds a match
#[inline]
pub fn releases_matches(next: &Status) -> bool {
    !next.is_matched()
}
