use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::core::plan_transition;
use crate::error::AppError;
use crate::models::{EntityRef, EntityState, StatusTransition, StatusUpdate};
use crate::services::cache::StatusCache;
use crate::services::store::{NewStatusUpdate, Store};

/// Handle to a scheduled match removal
///
/// The removal runs on its own task. Dropping the handle does not cancel it;
/// failures are logged by the task either way.
#[derive(Debug)]
pub struct UnmatchTask {
    entity: EntityRef,
    handle: JoinHandle<Result<u64, AppError>>,
}

impl UnmatchTask {
    /// Spawn removal of every match held by `entity`
    pub fn spawn<S: Store>(store: Arc<S>, entity: EntityRef) -> Self {
        let handle = tokio::spawn(async move {
            match store.remove_matches(entity).await {
                Ok(removed) => {
                    tracing::info!("Removed {} match(es) for {}", removed, entity);
                    Ok(removed)
                }
                Err(e) => {
                    tracing::warn!("Failed to remove matches for {}: {}", entity, e);
                    Err(AppError::SideEffectFailure(format!(
                        "could not unmatch {}: {}",
                        entity, e
                    )))
                }
            }
        });

        Self { entity, handle }
    }

    /// Wait for the removal, returning the number of matches removed
    pub async fn wait(self) -> Result<u64, AppError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(AppError::SideEffectFailure(format!(
                "unmatch task for {} aborted: {}",
                self.entity, e
            ))),
        }
    }
}

/// Result of a successful transition
#[derive(Debug)]
pub struct TransitionOutcome {
    pub entity: EntityState,
    pub status_update: StatusUpdate,
    /// Present when the transition released the entity's matches
    pub unmatch: Option<UnmatchTask>,
}

/// Applies status transitions to teachers and students
///
/// The status change and its audit record are written together. Releasing
/// matches happens afterwards on a separate task and never rolls the status
/// change back, so readers may briefly see an unmatched teacher that still
/// has a match.
pub struct StatusTransitionHandler<S: Store> {
    store: Arc<S>,
    statuses: StatusCache,
}

impl<S: Store> Clone for StatusTransitionHandler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            statuses: self.statuses.clone(),
        }
    }
}

impl<S: Store> StatusTransitionHandler<S> {
    pub fn new(store: Arc<S>, statuses: StatusCache) -> Self {
        Self { store, statuses }
    }

    pub fn statuses(&self) -> &StatusCache {
        &self.statuses
    }

    /// Apply a status transition
    ///
    /// # Errors
    /// * `UnknownStatus` - either status does not resolve; nothing is written
    /// * `NotFound` - the teacher or student does not exist
    /// * `Validation` - the entity no longer holds the previous status
    /// * `Persistence` / `UniqueConstraintViolation` - the store rejected the write
    pub async fn transition(&self, request: StatusTransition) -> Result<TransitionOutcome, AppError> {
        let previous = self.statuses.resolve(self.store.as_ref(), &request.previous).await?;
        let next = self.statuses.resolve(self.store.as_ref(), &request.next).await?;

        let current = self.store.entity_status(request.entity).await?;
        let plan = plan_transition(request.entity, &current, previous, next)?;

        tracing::info!(
            "Transitioning {} from {} to {} (by {})",
            plan.entity,
            plan.previous.description,
            plan.next.description,
            request.updated_by
        );

        let (entity, status_update) = self
            .store
            .apply_transition(
                &plan.next,
                NewStatusUpdate {
                    entity: plan.entity,
                    previous_status_id: plan.previous.status_id,
                    next_status_id: plan.next.status_id,
                    updated_by: request.updated_by,
                    reason: request.reason,
                },
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to apply transition for {}: {}", plan.entity, e);
                e
            })?;

        let unmatch = plan
            .unmatch
            .then(|| UnmatchTask::spawn(Arc::clone(&self.store), plan.entity));

        if unmatch.is_some() {
            tracing::debug!("Scheduled unmatch for {}", plan.entity);
        }

        Ok(TransitionOutcome {
            entity,
            status_update,
            unmatch,
        })
    }
}
