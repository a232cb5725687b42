//! Task lifecycle rules and the write-side orchestration around them.
//!
//! Every task mutation flows through [`TaskLifecycle`]: the update is
//! normalized (status/`completed_at` coupling, annotation-decision override),
//! persisted, and the owning batch and project aggregates are recomputed.
//! The task write and the two aggregate writes are separate store
//! operations; recomputation reads a full snapshot each time, so a lost race
//! converges on the next write.

use crate::db::now_ms;
use crate::error::{ApiError, ApiResult};
use crate::metrics::{compute_batch_metrics, compute_project_progress};
use crate::store::RecordStore;
use crate::types::{
    AnnotationDecision, BatchMetrics, NewTask, Task, TaskStatus, TaskUpdate,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Pluggable status-transition check.
///
/// The default allows any transition; the observed system never enforced a
/// transition table, only the derived-field rules. Provisional until a real
/// transition graph is decided.
pub trait TransitionPolicy: Send + Sync {
    fn allows(&self, from: TaskStatus, to: TaskStatus) -> bool;
}

/// Permits every transition.
pub struct AnyTransition;

impl TransitionPolicy for AnyTransition {
    fn allows(&self, _from: TaskStatus, _to: TaskStatus) -> bool {
        true
    }
}

/// Reject an annotation decision that is missing its required parts.
/// Confidence of zero is valid; only a missing value is an error.
pub fn validate_decision(decision: &AnnotationDecision) -> ApiResult<()> {
    if decision.decision.trim().is_empty() {
        return Err(ApiError::missing_field("decision"));
    }
    if decision.confidence.is_none() {
        return Err(ApiError::missing_field("confidence"));
    }
    if decision.annotator_id.trim().is_empty() {
        return Err(ApiError::missing_field("annotator_id"));
    }
    Ok(())
}

/// Apply an update to a task under the lifecycle rules, producing the row to
/// persist. Pure; `now` is injected for testability.
///
/// Rules, in order of precedence:
/// 1. A non-null annotation decision forces status `completed` and stamps
///    `completed_at`, regardless of any requested status.
/// 2. Status set to `completed` without an explicit `completed_at` stamps it.
/// 3. Status set to anything else clears `completed_at`, even if supplied.
/// 4. Without a status change, an explicit `completed_at` is honored only
///    while the task remains completed.
pub fn normalize_update(
    current: &Task,
    update: TaskUpdate,
    now: i64,
    policy: &dyn TransitionPolicy,
) -> ApiResult<Task> {
    let mut task = current.clone();

    if let Some(task_type) = update.task_type {
        if task_type.trim().is_empty() {
            return Err(ApiError::invalid_value("task_type", "task_type cannot be empty"));
        }
        task.task_type = task_type;
    }
    if let Some(assigned_user) = update.assigned_user {
        task.assigned_user = assigned_user;
    }
    if let Some(template) = update.template {
        task.template = template;
    }
    if let Some(inputs) = update.inputs {
        task.inputs = inputs;
    }
    if let Some(outputs) = update.outputs {
        task.outputs = outputs;
    }

    let requested_status = match update.status.as_deref() {
        Some(s) => Some(TaskStatus::parse(s).ok_or_else(|| {
            ApiError::invalid_value("status", format!("Unrecognized status: {}", s))
        })?),
        None => None,
    };

    if let Some(mut decision) = update.annotation_decision {
        validate_decision(&decision)?;
        if decision.timestamp.is_none() {
            decision.timestamp = Some(now);
        }
        task.annotation_decision = Some(decision);
        task.status = TaskStatus::Completed;
        task.completed_at = Some(now);
    } else if let Some(status) = requested_status {
        if !policy.allows(current.status, status) {
            return Err(ApiError::transition_not_allowed(
                current.status.as_str(),
                status.as_str(),
            ));
        }
        task.status = status;
        if status == TaskStatus::Completed {
            task.completed_at = match update.completed_at {
                Some(Some(at)) => Some(at),
                _ => Some(now),
            };
        } else {
            task.completed_at = None;
        }
    } else if task.status == TaskStatus::Completed {
        if let Some(Some(at)) = update.completed_at {
            task.completed_at = Some(at);
        }
    }

    task.updated_at = now;
    Ok(task)
}

/// Write-side service owning the recompute triggers.
pub struct TaskLifecycle<S: RecordStore> {
    store: Arc<S>,
    policy: Arc<dyn TransitionPolicy>,
}

impl<S: RecordStore> Clone for TaskLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: Arc::clone(&self.policy),
        }
    }
}

impl<S: RecordStore> TaskLifecycle<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            policy: Arc::new(AnyTransition),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn TransitionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Create a task in an existing batch. The annotation decision is always
    /// null on creation. Triggers recomputation of both ancestor aggregates.
    pub fn create_task(&self, new: NewTask) -> ApiResult<Task> {
        if new.task_type.trim().is_empty() {
            return Err(ApiError::missing_field("task_type"));
        }
        let batch = self
            .store
            .get_batch(&new.batch_id)?
            .ok_or_else(|| ApiError::batch_not_found(&new.batch_id))?;

        let status = match new.status.as_deref() {
            Some(s) => TaskStatus::parse(s).ok_or_else(|| {
                ApiError::invalid_value("status", format!("Unrecognized status: {}", s))
            })?,
            None => TaskStatus::Pending,
        };

        let now = now_ms();
        let task = Task {
            id: Uuid::now_v7().to_string(),
            batch_id: batch.id.clone(),
            task_type: new.task_type,
            assigned_user: new.assigned_user,
            status,
            completed_at: (status == TaskStatus::Completed).then_some(now),
            annotation_decision: None,
            template: new.template,
            inputs: new.inputs.unwrap_or_default(),
            outputs: new.outputs.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_task(&task)?;
        debug!(task = %task.id, batch = %batch.id, "task created");

        self.recompute_batch(&batch.id)?;
        self.recompute_project(&batch.project_id)?;
        Ok(task)
    }

    /// Update a task through the lifecycle rules. Aggregates are recomputed
    /// only when the stored status actually changed.
    pub fn update_task(&self, id: &str, update: TaskUpdate) -> ApiResult<Task> {
        let current = self
            .store
            .get_task(id)?
            .ok_or_else(|| ApiError::task_not_found(id))?;

        let updated = normalize_update(&current, update, now_ms(), self.policy.as_ref())?;
        if !self.store.write_task(&updated)? {
            return Err(ApiError::task_not_found(id));
        }

        if current.status != updated.status {
            debug!(
                task = %id,
                from = current.status.as_str(),
                to = updated.status.as_str(),
                "task status changed"
            );
            let batch = self
                .store
                .get_batch(&updated.batch_id)?
                .ok_or_else(|| ApiError::batch_not_found(&updated.batch_id))?;
            self.recompute_batch(&batch.id)?;
            self.recompute_project(&batch.project_id)?;
        }
        Ok(updated)
    }

    /// Status-only update, validated against the four-value enum.
    pub fn update_status(&self, id: &str, status: &str) -> ApiResult<Task> {
        self.update_task(
            id,
            TaskUpdate {
                status: Some(status.to_string()),
                ..Default::default()
            },
        )
    }

    /// Record the annotator's decision; forces the task to completed.
    pub fn set_annotation(&self, id: &str, decision: AnnotationDecision) -> ApiResult<Task> {
        self.update_task(
            id,
            TaskUpdate {
                annotation_decision: Some(decision),
                ..Default::default()
            },
        )
    }

    /// Delete a task. NotFound when absent (and nothing is recomputed);
    /// otherwise both ancestor aggregates are recomputed.
    pub fn delete_task(&self, id: &str) -> ApiResult<()> {
        let task = self
            .store
            .get_task(id)?
            .ok_or_else(|| ApiError::task_not_found(id))?;
        if !self.store.delete_task(id)? {
            return Err(ApiError::task_not_found(id));
        }
        if let Some(batch) = self.store.get_batch(&task.batch_id)? {
            self.recompute_batch(&batch.id)?;
            self.recompute_project(&batch.project_id)?;
        }
        Ok(())
    }

    /// Recompute and persist one batch's derived progress and SLA status
    /// from its current task snapshot.
    pub fn recompute_batch(&self, batch_id: &str) -> ApiResult<BatchMetrics> {
        let batch = self
            .store
            .get_batch(batch_id)?
            .ok_or_else(|| ApiError::batch_not_found(batch_id))?;
        let tasks = self.store.tasks_in_batch(batch_id)?;
        let metrics = compute_batch_metrics(&tasks, batch.due_date, now_ms());
        self.store
            .set_batch_metrics(batch_id, metrics.progress, metrics.sla_status)?;
        Ok(metrics)
    }

    /// Recompute and persist one project's progress fraction from all its
    /// descendant tasks.
    pub fn recompute_project(&self, project_id: &str) -> ApiResult<f64> {
        let tasks = self.store.tasks_in_project(project_id)?;
        let progress = compute_project_progress(&tasks);
        self.store.set_project_progress(project_id, progress)?;
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::store::memory::MemoryStore;
    use crate::store::{BatchRepository, ProjectRepository, TaskRepository};
    use crate::types::{NewBatch, NewProject, SlaStatus};
    use serde_json::Map;

    fn setup() -> (TaskLifecycle<MemoryStore>, Arc<MemoryStore>, String, String) {
        let store = Arc::new(MemoryStore::new());
        let project = store
            .create_project(NewProject {
                name: "catalog".into(),
                owner: None,
            })
            .unwrap();
        let batch = store
            .create_batch(NewBatch {
                project_id: project.id.clone(),
                name: "wave 1".into(),
                due_date: None,
            })
            .unwrap();
        (
            TaskLifecycle::new(Arc::clone(&store)),
            store,
            project.id,
            batch.id,
        )
    }

    fn new_task(batch_id: &str) -> NewTask {
        NewTask {
            batch_id: batch_id.into(),
            task_type: "product_classification".into(),
            ..Default::default()
        }
    }

    fn decision(confidence: Option<f64>) -> AnnotationDecision {
        AnnotationDecision {
            decision: "category: electronics".into(),
            confidence,
            annotator_id: "ann-1".into(),
            labels: None,
            notes: None,
            quality_score: None,
            flagged: None,
            time_spent_minutes: None,
            timestamp: None,
            custom_fields: Map::new(),
        }
    }

    #[test]
    fn create_defaults_to_pending_and_recomputes() {
        let (lifecycle, store, project_id, batch_id) = setup();
        let task = lifecycle.create_task(new_task(&batch_id)).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.completed_at.is_none());
        assert!(task.annotation_decision.is_none());

        let batch = store.get_batch(&batch_id).unwrap().unwrap();
        assert_eq!(batch.progress, 0);
        let project = store.get_project(&project_id).unwrap().unwrap();
        assert_eq!(project.progress, 0.0);
    }

    #[test]
    fn create_rejects_missing_batch() {
        let (lifecycle, _, _, _) = setup();
        let err = lifecycle.create_task(new_task("nope")).unwrap_err();
        assert_eq!(err.code, ErrorCode::BatchNotFound);
    }

    #[test]
    fn create_rejects_unknown_status() {
        let (lifecycle, _, _, batch_id) = setup();
        let mut new = new_task(&batch_id);
        new.status = Some("annotation_inreview".into());
        let err = lifecycle.create_task(new).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
    }

    #[test]
    fn completing_stamps_completed_at_and_reverting_clears_it() {
        let (lifecycle, _, _, batch_id) = setup();
        let task = lifecycle.create_task(new_task(&batch_id)).unwrap();

        let done = lifecycle.update_status(&task.id, "completed").unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.completed_at.is_some());

        let back = lifecycle.update_status(&task.id, "pending").unwrap();
        assert_eq!(back.status, TaskStatus::Pending);
        assert!(back.completed_at.is_none());
    }

    #[test]
    fn supplied_completed_at_is_dropped_for_non_completed_status() {
        let (lifecycle, _, _, batch_id) = setup();
        let task = lifecycle.create_task(new_task(&batch_id)).unwrap();
        let updated = lifecycle
            .update_task(
                &task.id,
                TaskUpdate {
                    status: Some("in_progress".into()),
                    completed_at: Some(Some(123)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert!(updated.completed_at.is_none());
    }

    #[test]
    fn explicit_completed_at_is_honored_when_completing() {
        let (lifecycle, _, _, batch_id) = setup();
        let task = lifecycle.create_task(new_task(&batch_id)).unwrap();
        let updated = lifecycle
            .update_task(
                &task.id,
                TaskUpdate {
                    status: Some("completed".into()),
                    completed_at: Some(Some(1_600_000_000_000)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.completed_at, Some(1_600_000_000_000));
    }

    #[test]
    fn annotation_decision_overrides_requested_status() {
        let (lifecycle, _, _, batch_id) = setup();
        let task = lifecycle.create_task(new_task(&batch_id)).unwrap();
        let updated = lifecycle
            .update_task(
                &task.id,
                TaskUpdate {
                    status: Some("pending".into()),
                    annotation_decision: Some(decision(Some(0.9))),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert!(updated.completed_at.is_some());
        let stored = updated.annotation_decision.unwrap();
        assert!(stored.timestamp.is_some());
    }

    #[test]
    fn zero_confidence_is_valid() {
        let (lifecycle, _, _, batch_id) = setup();
        let task = lifecycle.create_task(new_task(&batch_id)).unwrap();
        let updated = lifecycle.set_annotation(&task.id, decision(Some(0.0))).unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
    }

    #[test]
    fn incomplete_decision_rejected_and_task_untouched() {
        let (lifecycle, store, _, batch_id) = setup();
        let task = lifecycle.create_task(new_task(&batch_id)).unwrap();

        let err = lifecycle.set_annotation(&task.id, decision(None)).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        assert_eq!(err.field.as_deref(), Some("confidence"));

        let stored = store.get_task(&task.id).unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
        assert!(stored.annotation_decision.is_none());
    }

    #[test]
    fn unknown_status_update_is_a_validation_error() {
        let (lifecycle, _, _, batch_id) = setup();
        let task = lifecycle.create_task(new_task(&batch_id)).unwrap();
        let err = lifecycle.update_status(&task.id, "paused").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFieldValue);
    }

    #[test]
    fn status_change_recomputes_aggregates() {
        let (lifecycle, store, project_id, batch_id) = setup();
        let t1 = lifecycle.create_task(new_task(&batch_id)).unwrap();
        let _t2 = lifecycle.create_task(new_task(&batch_id)).unwrap();

        lifecycle.update_status(&t1.id, "completed").unwrap();

        let batch = store.get_batch(&batch_id).unwrap().unwrap();
        assert_eq!(batch.progress, 50);
        assert_eq!(batch.sla_status, SlaStatus::OnTrack);
        let project = store.get_project(&project_id).unwrap().unwrap();
        assert_eq!(project.progress, 0.5);
    }

    #[test]
    fn delete_missing_task_is_not_found() {
        let (lifecycle, _, _, _) = setup();
        let err = lifecycle.delete_task("missing").unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }

    #[test]
    fn deleting_last_task_resets_batch_and_project_progress() {
        let (lifecycle, store, project_id, batch_id) = setup();
        let task = lifecycle.create_task(new_task(&batch_id)).unwrap();
        lifecycle.update_status(&task.id, "completed").unwrap();
        assert_eq!(store.get_batch(&batch_id).unwrap().unwrap().progress, 100);

        lifecycle.delete_task(&task.id).unwrap();

        let batch = store.get_batch(&batch_id).unwrap().unwrap();
        assert_eq!(batch.progress, 0);
        assert_eq!(batch.sla_status, SlaStatus::OnTrack);
        let project = store.get_project(&project_id).unwrap().unwrap();
        assert_eq!(project.progress, 0.0);
    }

    #[test]
    fn restrictive_policy_blocks_transitions() {
        struct NoReopen;
        impl TransitionPolicy for NoReopen {
            fn allows(&self, from: TaskStatus, to: TaskStatus) -> bool {
                !(from == TaskStatus::Completed && to == TaskStatus::Pending)
            }
        }

        let (lifecycle, _, _, batch_id) = setup();
        let lifecycle = lifecycle.with_policy(Arc::new(NoReopen));
        let task = lifecycle.create_task(new_task(&batch_id)).unwrap();
        lifecycle.update_status(&task.id, "completed").unwrap();

        let err = lifecycle.update_status(&task.id, "pending").unwrap_err();
        assert_eq!(err.code, ErrorCode::TransitionNotAllowed);
    }
}
