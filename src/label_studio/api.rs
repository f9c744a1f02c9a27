//! The Label Studio operations the tools rely on
//!
//! Tools talk to the platform only through [`LabelStudioApi`], so the HTTP
//! client can be swapped for an in-memory implementation in tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::label_studio::types::{
    AnnotationRecord, CreatePredictionRequest, CreateProjectRequest, ImportOutcome, Prediction,
    Project, Task, UpdateProjectRequest,
};

#[async_trait]
pub trait LabelStudioApi: Send + Sync {
    /// List projects, returning at most `limit` of them
    async fn list_projects(&self, limit: usize) -> Result<Vec<Project>>;

    /// Fetch a single project
    async fn get_project(&self, project_id: i64) -> Result<Project>;

    /// Create a project
    async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project>;

    /// Partially update a project
    async fn update_project(
        &self,
        project_id: i64,
        request: &UpdateProjectRequest,
    ) -> Result<Project>;

    /// Bulk-import task payloads into a project
    async fn import_tasks(&self, project_id: i64, tasks: &[Value]) -> Result<ImportOutcome>;

    /// List a project's tasks, returning at most `limit` of them
    async fn list_tasks(&self, project_id: i64, limit: usize) -> Result<Vec<Task>>;

    /// Fetch a single task
    async fn get_task(&self, task_id: i64) -> Result<Task>;

    /// Fetch the annotations attached to a task
    async fn task_annotations(&self, task_id: i64) -> Result<Vec<AnnotationRecord>>;

    /// Attach a prediction to a task
    async fn create_prediction(&self, request: &CreatePredictionRequest) -> Result<Prediction>;
}
