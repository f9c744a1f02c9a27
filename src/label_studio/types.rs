//! Label Studio API type definitions
//!
//! These types mirror the Label Studio API responses and request bodies.
//! Response types keep unknown fields in `extra` so nothing the platform
//! returns is lost when a record is dumped back to JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Label Studio project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project ID
    pub id: i64,

    /// Project title
    #[serde(default)]
    pub title: Option<String>,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// XML labeling configuration
    #[serde(default)]
    pub label_config: Option<String>,

    /// Instructions shown to labelers
    #[serde(default)]
    pub expert_instruction: Option<String>,

    /// Project color (hex string)
    #[serde(default)]
    pub color: Option<String>,

    /// Number of tasks in the project
    #[serde(default)]
    pub task_number: Option<i64>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// Every other field returned by the platform
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A Label Studio task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Task ID
    #[serde(default)]
    pub id: Option<i64>,

    /// Task data payload
    #[serde(default)]
    pub data: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Keys of the data payload, or nothing when the payload is not a mapping
    pub fn data_keys(&self) -> Vec<String> {
        match &self.data {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

/// A fully structured annotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: i64,

    /// Labeled regions and choices
    pub result: Vec<Value>,

    #[serde(default)]
    pub task: Option<i64>,

    #[serde(default)]
    pub completed_by: Option<Value>,

    #[serde(default)]
    pub was_cancelled: Option<bool>,

    #[serde(default)]
    pub ground_truth: Option<bool>,

    #[serde(default)]
    pub lead_time: Option<f64>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An annotation as returned by the platform, most structured shape first
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnnotationRecord {
    Structured(Annotation),
    Mapping(Map<String, Value>),
    Opaque(Value),
}

/// A prediction attached to a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub task: Option<Value>,

    #[serde(default)]
    pub model_version: Option<String>,

    #[serde(default)]
    pub score: Option<f64>,

    #[serde(default)]
    pub result: Option<Value>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Summary of a bulk task import
///
/// Counters the platform leaves out stay out of the dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub task_count: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_count: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions_count: Option<i64>,

    /// Seconds spent importing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_upload_ids: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of a bulk task import, most structured shape first
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImportOutcome {
    Summary(ImportSummary),
    Mapping(Map<String, Value>),
    Other(Value),
}

/// One page of a paginated listing
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Page<T> {
    /// `{"results": [...], "next": ..., "count": ...}` or `{"tasks": [...], "total": ...}`
    Envelope {
        #[serde(alias = "tasks")]
        results: Vec<T>,

        #[serde(default)]
        next: Option<String>,

        #[serde(default, alias = "total")]
        count: Option<u64>,
    },

    /// A bare array holding the whole collection
    Bare(Vec<T>),
}

impl<T> Page<T> {
    /// Split into the page items and whether another page may follow,
    /// given how many items were seen before this page
    pub fn into_parts(self, seen_before: usize) -> (Vec<T>, bool) {
        match self {
            Page::Envelope {
                results,
                next,
                count,
            } => {
                let seen = seen_before + results.len();
                let more = next.is_some() || count.is_some_and(|total| (seen as u64) < total);
                (results, more)
            }
            Page::Bare(items) => (items, false),
        }
    }
}

/// Request body for creating a project
///
/// Unset optional fields are left out of the body entirely.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateProjectRequest {
    pub title: String,

    pub label_config: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expert_instruction: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_instruction: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_skip_button: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_empty_annotation: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_annotation_history: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Request body for updating a project's labeling configuration
#[derive(Debug, Clone, Serialize)]
pub struct UpdateProjectRequest {
    pub label_config: String,
}

/// Request body for creating a prediction
#[derive(Debug, Clone, Serialize)]
pub struct CreatePredictionRequest {
    pub task: i64,

    pub result: Vec<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}
