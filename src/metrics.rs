//! Derived-metric computation for batches and projects.
//!
//! Everything here is a pure function over a snapshot of tasks; persistence
//! of the results is the caller's job. Batch progress is an integer
//! percentage, project progress a fraction — the two representations are
//! deliberate and must not be unified.

use crate::types::{
    Batch, BatchMetrics, BatchStatistics, ProjectMetrics, ProjectStatistics, SlaStatus, Task,
    TaskStatistics, TaskStatus,
};

pub const DAY_MS: i64 = 86_400_000;

/// Batches due within this many days and under the progress floor are at risk.
pub const AT_RISK_WINDOW_DAYS: i64 = 2;
pub const AT_RISK_PROGRESS_FLOOR: i64 = 80;

/// Whole days until the due date, rounded up. A due date that passed earlier
/// today yields 0, not a negative count.
pub fn days_until_due(due_date: i64, now: i64) -> i64 {
    ((due_date - now) as f64 / DAY_MS as f64).ceil() as i64
}

/// Bucket counts over a task set. Legacy review sub-statuses were already
/// folded into `InProgress` when the rows were parsed.
fn count_buckets(tasks: &[Task]) -> (i64, i64, i64, i64, i64) {
    let mut pending = 0i64;
    let mut in_progress = 0i64;
    let mut completed = 0i64;
    let mut failed = 0i64;
    for task in tasks {
        match task.status {
            TaskStatus::Pending => pending += 1,
            TaskStatus::InProgress => in_progress += 1,
            TaskStatus::Completed => completed += 1,
            TaskStatus::Failed => failed += 1,
        }
    }
    (tasks.len() as i64, pending, in_progress, completed, failed)
}

/// Integer percentage, rounded half up. Zero when the set is empty.
fn percent(completed: i64, total: i64) -> i64 {
    if total > 0 {
        ((completed * 100) as f64 / total as f64).round() as i64
    } else {
        0
    }
}

/// Compute progress and SLA classification for one batch.
///
/// SLA precedence: a fully completed batch is always on track, even past its
/// due date; then overdue beats at-risk. Without a due date the deadline
/// branches are skipped entirely. An empty batch is on track.
pub fn compute_batch_metrics(tasks: &[Task], due_date: Option<i64>, now: i64) -> BatchMetrics {
    let (total, pending, in_progress, completed, failed) = count_buckets(tasks);
    let progress = percent(completed, total);

    let mut sla_status = SlaStatus::OnTrack;
    if total > 0 {
        if progress == 100 {
            sla_status = SlaStatus::OnTrack;
        } else if let Some(due) = due_date {
            let days_left = days_until_due(due, now);
            if days_left < 0 {
                sla_status = SlaStatus::Overdue;
            } else if days_left <= AT_RISK_WINDOW_DAYS && progress < AT_RISK_PROGRESS_FLOOR {
                sla_status = SlaStatus::AtRisk;
            }
        }
    }

    BatchMetrics {
        total_tasks: total,
        pending_tasks: pending,
        in_progress_tasks: in_progress,
        completed_tasks: completed,
        failed_tasks: failed,
        progress,
        sla_status,
    }
}

/// Completed/total fraction persisted on the project record after task
/// writes. 0.0 for an empty project.
pub fn compute_project_progress(tasks: &[Task]) -> f64 {
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    if tasks.is_empty() {
        0.0
    } else {
        completed as f64 / tasks.len() as f64
    }
}

fn batch_fully_completed(tasks: &[Task]) -> bool {
    !tasks.is_empty() && tasks.iter().all(|t| t.status == TaskStatus::Completed)
}

/// Compute the full project read-side metrics from its batches and their
/// tasks.
pub fn compute_project_metrics(batches: &[(Batch, Vec<Task>)], now: i64) -> ProjectMetrics {
    let all_tasks: Vec<&Task> = batches.iter().flat_map(|(_, t)| t.iter()).collect();
    let total = all_tasks.len() as i64;
    let completed = all_tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count() as i64;
    let pending = all_tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .count() as i64;
    let in_progress = all_tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count() as i64;

    let completed_batches = batches
        .iter()
        .filter(|(_, tasks)| batch_fully_completed(tasks))
        .count() as i64;

    let overdue_batches = batches
        .iter()
        .filter(|(batch, tasks)| {
            matches!(batch.due_date, Some(due) if due < now) && !batch_fully_completed(tasks)
        })
        .count() as i64;

    ProjectMetrics {
        total_tasks: total,
        completed_tasks: completed,
        pending_tasks: pending,
        in_progress_tasks: in_progress,
        progress: if total > 0 {
            completed as f64 / total as f64
        } else {
            0.0
        },
        total_batches: batches.len() as i64,
        completed_batches,
        overdue_batches,
        accuracy: None,
    }
}

/// Dashboard counters over an arbitrary task set.
pub fn compute_task_statistics(tasks: &[Task]) -> TaskStatistics {
    let (total, pending, in_progress, completed, failed) = count_buckets(tasks);
    TaskStatistics {
        total_tasks: total,
        completed_tasks: completed,
        in_progress_tasks: in_progress,
        pending_tasks: pending,
        failed_tasks: failed,
        progress: percent(completed, total),
    }
}

/// Fleet-level batch counters for the dashboard. A batch counts as
/// completed at 100% progress; overdue and at-risk follow the same deadline
/// windows as the per-batch SLA, and batches without a due date only ever
/// count as completed or on track.
pub fn compute_batch_statistics(batches: &[(Batch, Vec<Task>)], now: i64) -> BatchStatistics {
    let total = batches.len() as i64;
    let mut completed = 0i64;
    let mut overdue = 0i64;
    let mut at_risk = 0i64;

    for (batch, tasks) in batches {
        let (task_total, _, _, task_completed, _) = count_buckets(tasks);
        let progress = percent(task_completed, task_total);

        if progress == 100 {
            completed += 1;
            continue;
        }
        if let Some(due) = batch.due_date {
            if due < now {
                overdue += 1;
            } else if days_until_due(due, now) <= AT_RISK_WINDOW_DAYS
                && progress < AT_RISK_PROGRESS_FLOOR
            {
                at_risk += 1;
            }
        }
    }

    BatchStatistics {
        total_batches: total,
        completed_batches: completed,
        active_batches: total - completed,
        overdue_batches: overdue,
        at_risk_batches: at_risk,
        on_track_batches: total - completed - overdue - at_risk,
    }
}

/// Fleet-level project counters, aggregated from per-project metrics.
pub fn compute_project_statistics(projects: &[ProjectMetrics]) -> ProjectStatistics {
    let total_projects = projects.len() as i64;
    let total_tasks: i64 = projects.iter().map(|p| p.total_tasks).sum();
    let completed_tasks: i64 = projects.iter().map(|p| p.completed_tasks).sum();

    let completed_projects = projects
        .iter()
        .filter(|p| p.total_tasks > 0 && p.completed_tasks == p.total_tasks)
        .count() as i64;

    let accuracies: Vec<f64> = projects.iter().filter_map(|p| p.accuracy).collect();
    let average_accuracy = if accuracies.is_empty() {
        None
    } else {
        Some(accuracies.iter().sum::<f64>() / accuracies.len() as f64)
    };

    ProjectStatistics {
        total_projects,
        completed_projects,
        active_projects: total_projects - completed_projects,
        total_tasks,
        completed_tasks,
        pending_tasks: total_tasks - completed_tasks,
        completion_rate: percent(completed_tasks, total_tasks),
        average_accuracy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Batch, SlaStatus, Task, TaskStatus};

    const NOW: i64 = 1_700_000_000_000;

    fn task(status: TaskStatus) -> Task {
        Task {
            id: uuid::Uuid::now_v7().to_string(),
            batch_id: "b1".into(),
            task_type: "product_classification".into(),
            assigned_user: None,
            status,
            completed_at: if status == TaskStatus::Completed {
                Some(NOW)
            } else {
                None
            },
            annotation_decision: None,
            template: None,
            inputs: vec![],
            outputs: vec![],
            created_at: NOW,
            updated_at: NOW,
        }
    }

    fn tasks(completed: usize, rest: usize) -> Vec<Task> {
        let mut v: Vec<Task> = (0..completed).map(|_| task(TaskStatus::Completed)).collect();
        v.extend((0..rest).map(|_| task(TaskStatus::Pending)));
        v
    }

    fn batch(due_date: Option<i64>) -> Batch {
        Batch {
            id: "b1".into(),
            project_id: "p1".into(),
            name: "wave 1".into(),
            due_date,
            progress: 0,
            sla_status: SlaStatus::OnTrack,
            created_at: NOW,
            updated_at: NOW,
        }
    }

    #[test]
    fn empty_batch_is_on_track_with_zero_progress() {
        let m = compute_batch_metrics(&[], Some(NOW - 30 * DAY_MS), NOW);
        assert_eq!(m.progress, 0);
        assert_eq!(m.sla_status, SlaStatus::OnTrack);
    }

    #[test]
    fn fully_completed_batch_ignores_past_due_date() {
        let m = compute_batch_metrics(&tasks(3, 0), Some(NOW - 365 * DAY_MS), NOW);
        assert_eq!(m.progress, 100);
        assert_eq!(m.sla_status, SlaStatus::OnTrack);
    }

    #[test]
    fn quarter_done_past_due_is_overdue() {
        let m = compute_batch_metrics(&tasks(1, 3), Some(NOW - DAY_MS), NOW);
        assert_eq!(m.progress, 25);
        assert_eq!(m.sla_status, SlaStatus::Overdue);
    }

    #[test]
    fn seventy_percent_due_tomorrow_is_at_risk() {
        let m = compute_batch_metrics(&tasks(7, 3), Some(NOW + DAY_MS), NOW);
        assert_eq!(m.progress, 70);
        assert_eq!(m.sla_status, SlaStatus::AtRisk);
    }

    #[test]
    fn ninety_percent_due_tomorrow_is_on_track() {
        let m = compute_batch_metrics(&tasks(9, 1), Some(NOW + DAY_MS), NOW);
        assert_eq!(m.progress, 90);
        assert_eq!(m.sla_status, SlaStatus::OnTrack);
    }

    #[test]
    fn no_due_date_never_goes_overdue() {
        let m = compute_batch_metrics(&tasks(0, 5), None, NOW);
        assert_eq!(m.sla_status, SlaStatus::OnTrack);
    }

    #[test]
    fn due_earlier_today_counts_as_zero_days() {
        // Half a day past due: ceil(-0.5) == 0, so not yet overdue, but
        // inside the at-risk window when progress is low.
        let m = compute_batch_metrics(&tasks(1, 9), Some(NOW - DAY_MS / 2), NOW);
        assert_eq!(days_until_due(NOW - DAY_MS / 2, NOW), 0);
        assert_eq!(m.sla_status, SlaStatus::AtRisk);
    }

    #[test]
    fn progress_rounds_half_up() {
        // 1/8 = 12.5% -> 13
        let m = compute_batch_metrics(&tasks(1, 7), None, NOW);
        assert_eq!(m.progress, 13);
        // 1/3 = 33.33% -> 33
        let m = compute_batch_metrics(&tasks(1, 2), None, NOW);
        assert_eq!(m.progress, 33);
    }

    #[test]
    fn bucket_counts_cover_all_statuses() {
        let set = vec![
            task(TaskStatus::Pending),
            task(TaskStatus::InProgress),
            task(TaskStatus::InProgress),
            task(TaskStatus::Completed),
            task(TaskStatus::Failed),
        ];
        let m = compute_batch_metrics(&set, None, NOW);
        assert_eq!(m.total_tasks, 5);
        assert_eq!(m.pending_tasks, 1);
        assert_eq!(m.in_progress_tasks, 2);
        assert_eq!(m.completed_tasks, 1);
        assert_eq!(m.failed_tasks, 1);
    }

    #[test]
    fn project_progress_is_a_fraction() {
        assert_eq!(compute_project_progress(&[]), 0.0);
        assert_eq!(compute_project_progress(&tasks(1, 3)), 0.25);
        assert_eq!(compute_project_progress(&tasks(4, 0)), 1.0);
    }

    #[test]
    fn project_metrics_flatten_batches() {
        let data = vec![
            (batch(Some(NOW - DAY_MS)), tasks(2, 0)),
            (batch(Some(NOW - DAY_MS)), tasks(1, 3)),
            (batch(None), tasks(0, 0)),
        ];
        let m = compute_project_metrics(&data, NOW);
        assert_eq!(m.total_tasks, 6);
        assert_eq!(m.completed_tasks, 3);
        assert_eq!(m.progress, 0.5);
        assert_eq!(m.total_batches, 3);
        // Only the fully completed non-empty batch counts.
        assert_eq!(m.completed_batches, 1);
        // The half-done batch is past due; the completed and empty ones are not overdue.
        assert_eq!(m.overdue_batches, 1);
        assert_eq!(m.accuracy, None);
    }

    #[test]
    fn empty_batch_with_past_due_counts_overdue_for_project() {
        let data = vec![(batch(Some(NOW - DAY_MS)), vec![])];
        let m = compute_project_metrics(&data, NOW);
        assert_eq!(m.overdue_batches, 1); // never completed, past due
    }

    #[test]
    fn batch_statistics_partition_the_fleet() {
        let data = vec![
            (batch(Some(NOW - DAY_MS)), tasks(2, 0)),  // completed
            (batch(Some(NOW - DAY_MS)), tasks(0, 4)),  // overdue
            (batch(Some(NOW + DAY_MS)), tasks(1, 9)),  // at risk
            (batch(Some(NOW + 10 * DAY_MS)), tasks(0, 2)), // on track
            (batch(None), tasks(0, 2)),                // on track, no deadline
        ];
        let s = compute_batch_statistics(&data, NOW);
        assert_eq!(s.total_batches, 5);
        assert_eq!(s.completed_batches, 1);
        assert_eq!(s.active_batches, 4);
        assert_eq!(s.overdue_batches, 1);
        assert_eq!(s.at_risk_batches, 1);
        assert_eq!(s.on_track_batches, 2);
    }

    #[test]
    fn project_statistics_aggregate_metrics() {
        let done = compute_project_metrics(&[(batch(None), tasks(4, 0))], NOW);
        let half = compute_project_metrics(&[(batch(None), tasks(2, 2))], NOW);
        let empty = compute_project_metrics(&[], NOW);
        let s = compute_project_statistics(&[done, half, empty]);
        assert_eq!(s.total_projects, 3);
        assert_eq!(s.completed_projects, 1);
        assert_eq!(s.active_projects, 2);
        assert_eq!(s.total_tasks, 8);
        assert_eq!(s.completed_tasks, 6);
        assert_eq!(s.pending_tasks, 2);
        assert_eq!(s.completion_rate, 75);
        assert_eq!(s.average_accuracy, None);
    }
}
