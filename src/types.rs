//! Core domain types for the annotation platform.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Task status. Legacy review sub-statuses from older data fold into
/// `InProgress` when parsed leniently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Strict parse against the four canonical values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    /// Lenient parse for stored rows: review-phase sub-statuses written by
    /// earlier deployments count as in-progress.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        Self::parse(s).or(match s {
            "annotation_inprogress" | "annotation_inreview" | "in_review" => {
                Some(TaskStatus::InProgress)
            }
            _ => None,
        })
    }
}

/// Derived on-time classification for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    OnTrack,
    AtRisk,
    Overdue,
}

impl SlaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlaStatus::OnTrack => "on_track",
            SlaStatus::AtRisk => "at_risk",
            SlaStatus::Overdue => "overdue",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on_track" => Some(SlaStatus::OnTrack),
            "at_risk" => Some(SlaStatus::AtRisk),
            "overdue" => Some(SlaStatus::Overdue),
            _ => None,
        }
    }
}

/// A project groups batches. `progress` is a derived completed/total
/// fraction in [0.0, 1.0], recomputed after task writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub owner: Option<String>,
    pub progress: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A due-dated group of tasks under one project. `progress` (integer
/// percentage) and `sla_status` are derived caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub due_date: Option<i64>,
    pub progress: i64,
    pub sla_status: SlaStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A single unit of annotation work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub batch_id: String,
    pub task_type: String,
    pub assigned_user: Option<String>,
    pub status: TaskStatus,
    pub completed_at: Option<i64>,
    pub annotation_decision: Option<AnnotationDecision>,
    pub template: Option<Template>,
    // Legacy free-form payloads kept for older clients.
    #[serde(default)]
    pub inputs: Vec<Value>,
    #[serde(default)]
    pub outputs: Vec<Value>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// The annotator's recorded judgment on a task.
///
/// `confidence` is required at write time (zero is a valid value); it is
/// optional here only so that incomplete submissions can be rejected with a
/// field-level validation error instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationDecision {
    pub decision: String,
    pub confidence: Option<f64>,
    pub annotator_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Open extension map for annotation-type-specific fields.
    #[serde(default, flatten)]
    pub custom_fields: Map<String, Value>,
}

/// Work-item descriptor attached to a task. Known template kinds carry a
/// structured payload; anything else travels in `Custom`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "template_type", content = "template_data", rename_all = "snake_case")]
pub enum Template {
    ProductClassification(TemplatePayload),
    ImageQualityCheck(TemplatePayload),
    ContentModeration(TemplatePayload),
    DataVerification(TemplatePayload),
    Custom(Value),
}

/// Structured payload for the known template kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatePayload {
    pub product_name: String,
    #[serde(default)]
    pub product_images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_instructions: Option<String>,
    #[serde(default)]
    pub expected_labels: Vec<String>,
    #[serde(default)]
    pub quality_checks: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Deserialize helper distinguishing an absent field (`None`) from an
/// explicit `null` (`Some(None)`). Used on clearable update fields.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// Input for creating a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
}

/// Field updates for a project. Derived progress is not settable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub owner: Option<Option<String>>,
}

/// Input for creating a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBatch {
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub due_date: Option<i64>,
}

/// Field updates for a batch. Derived progress/SLA are not settable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<i64>>,
}

/// Input for creating a task. The annotation decision is always null on
/// creation; `status` is validated against the four-value enum.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub batch_id: String,
    pub task_type: String,
    #[serde(default)]
    pub assigned_user: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub template: Option<Template>,
    #[serde(default)]
    pub inputs: Option<Vec<Value>>,
    #[serde(default)]
    pub outputs: Option<Vec<Value>>,
}

/// Field updates for a task, normalized by the lifecycle rules before
/// persisting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub task_type: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_user: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub completed_at: Option<Option<i64>>,
    pub annotation_decision: Option<AnnotationDecision>,
    #[serde(default, deserialize_with = "double_option")]
    pub template: Option<Option<Template>>,
    pub inputs: Option<Vec<Value>>,
    pub outputs: Option<Vec<Value>>,
}

/// Derived metrics for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetrics {
    pub total_tasks: i64,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
    pub failed_tasks: i64,
    /// Integer percentage in [0, 100].
    pub progress: i64,
    pub sla_status: SlaStatus,
}

/// Derived metrics for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    /// Completed/total fraction in [0.0, 1.0] — intentionally not the
    /// integer percentage used for batches.
    pub progress: f64,
    pub total_batches: i64,
    pub completed_batches: i64,
    pub overdue_batches: i64,
    /// Populated by an external quality-scoring source when one exists;
    /// never fabricated here.
    pub accuracy: Option<f64>,
}

/// Dashboard counters over a task set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub in_progress_tasks: i64,
    pub pending_tasks: i64,
    pub failed_tasks: i64,
    pub progress: i64,
}

/// Fleet-level batch counters for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub total_batches: i64,
    pub completed_batches: i64,
    pub active_batches: i64,
    pub overdue_batches: i64,
    pub at_risk_batches: i64,
    pub on_track_batches: i64,
}

/// Fleet-level project counters for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatistics {
    pub total_projects: i64,
    pub completed_projects: i64,
    pub active_projects: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub completion_rate: i64,
    pub average_accuracy: Option<f64>,
}

/// A batch embellished with live task counts for list/detail views.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOverview {
    #[serde(flatten)]
    pub batch: Batch,
    pub total_tasks: i64,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
    pub failed_tasks: i64,
}

/// A project embellished with live aggregate metrics for list/detail views.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectOverview {
    #[serde(flatten)]
    pub project: Project,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    pub total_batches: i64,
    pub completed_batches: i64,
    pub overdue_batches: i64,
    pub accuracy: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(TaskStatus::parse("annotation_inreview"), None);
    }

    #[test]
    fn lenient_parse_folds_review_substatuses() {
        assert_eq!(
            TaskStatus::parse_lenient("annotation_inprogress"),
            Some(TaskStatus::InProgress)
        );
        assert_eq!(
            TaskStatus::parse_lenient("annotation_inreview"),
            Some(TaskStatus::InProgress)
        );
        assert_eq!(TaskStatus::parse_lenient("bogus"), None);
    }

    #[test]
    fn template_serializes_as_tagged_union() {
        let t = Template::ProductClassification(TemplatePayload {
            product_name: "USB hub".into(),
            product_images: vec!["https://img/1.jpg".into()],
            product_description: None,
            category: Some("electronics".into()),
            brand: None,
            price: Some(19.99),
            annotation_instructions: None,
            expected_labels: vec!["electronics".into(), "accessory".into()],
            quality_checks: vec![],
            metadata: Map::new(),
        });
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["template_type"], "product_classification");
        assert_eq!(v["template_data"]["product_name"], "USB hub");

        let back: Template = serde_json::from_value(v).unwrap();
        match back {
            Template::ProductClassification(p) => {
                assert_eq!(p.category.as_deref(), Some("electronics"))
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn decision_preserves_unknown_fields() {
        let json = serde_json::json!({
            "decision": "quality: good",
            "confidence": 0.0,
            "annotator_id": "ann-1",
            "bounding_boxes": [[0, 0, 10, 10]]
        });
        let d: AnnotationDecision = serde_json::from_value(json).unwrap();
        assert_eq!(d.confidence, Some(0.0));
        assert!(d.custom_fields.contains_key("bounding_boxes"));

        let v = serde_json::to_value(&d).unwrap();
        assert!(v.get("bounding_boxes").is_some());
    }

    #[test]
    fn task_update_distinguishes_null_from_absent() {
        let u: TaskUpdate = serde_json::from_str(r#"{"assigned_user": null}"#).unwrap();
        assert_eq!(u.assigned_user, Some(None));
        let u: TaskUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(u.assigned_user, None);
    }

    #[test]
    fn progress_representations_stay_distinct() {
        let p = Project {
            id: "p1".into(),
            name: "cats".into(),
            owner: None,
            progress: 0.25,
            created_at: 0,
            updated_at: 0,
        };
        let b = Batch {
            id: "b1".into(),
            project_id: "p1".into(),
            name: "wave 1".into(),
            due_date: None,
            progress: 25,
            sla_status: SlaStatus::OnTrack,
            created_at: 0,
            updated_at: 0,
        };
        let pv = serde_json::to_value(&p).unwrap();
        let bv = serde_json::to_value(&b).unwrap();
        assert!(pv["progress"].is_f64());
        assert_eq!(bv["progress"], 25);

        let p2: Project = serde_json::from_value(pv).unwrap();
        let b2: Batch = serde_json::from_value(bv).unwrap();
        assert_eq!(p2.progress, 0.25);
        assert_eq!(b2.progress, 25);
    }
}
