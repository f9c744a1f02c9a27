//! MCP Tool definitions and handlers
//!
//! Defines all available tools and their implementations. Every call goes
//! through [`require_connection`], so a tool always answers with a string.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::error::{LabelStudioApiError, McpError, Result};
use crate::label_studio::serialize::{datetime_to_json, render_record, Rendered};
use crate::label_studio::types::{
    CreatePredictionRequest, CreateProjectRequest, Project, UpdateProjectRequest,
};
use crate::label_studio::LabelStudioApi;
use crate::mcp::guard::{report_remote_failure, require_connection, ToolOutput};
use crate::mcp::presence::Presence;
use crate::mcp::types::{CallToolResult, Tool};

/// Most projects returned by `list_projects`
pub const LIST_PROJECTS_LIMIT: usize = 100;

/// Most tasks returned by `list_project_tasks`
pub const LIST_TASKS_LIMIT: usize = 50;

/// Tool registry bound to one Label Studio connection
pub struct ToolRegistry {
    config: Config,
    client: Option<Arc<dyn LabelStudioApi>>,
}

impl ToolRegistry {
    /// Create a registry; `client` is `None` when no connection is available
    pub fn new(config: Config, client: Option<Arc<dyn LabelStudioApi>>) -> Self {
        Self { config, client }
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Names of every registered tool, in catalogue order
    pub fn tool_names(&self) -> Vec<String> {
        self.list_tools().into_iter().map(|tool| tool.name).collect()
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def("list_projects", "Lists available Label Studio projects (up to 100) with their task counts", empty_schema()),
            tool_def("get_project_details", "Provides details for a specific Label Studio project", project_id_schema()),
            tool_def("get_project_config", "Provides the XML labeling configuration for a Label Studio project", project_id_schema()),
            tool_def("list_project_tasks", "Lists tasks within a Label Studio project (up to 50) with the keys of each task's data", project_id_schema()),
            tool_def("get_task_data", "Provides the data payload for a specific Label Studio task", task_schema()),
            tool_def("get_task_annotations", "Provides the annotations for a specific Label Studio task", task_schema()),
            tool_def("create_project", "Creates a new Label Studio project and returns its details with a link to the data manager", create_project_schema()),
            tool_def("update_project_config", "Replaces the labeling configuration of a Label Studio project", update_project_config_schema()),
            tool_def("import_project_tasks", "Imports tasks into a Label Studio project from a JSON file containing an array of tasks", import_project_tasks_schema()),
            tool_def("create_prediction", "Creates a prediction for a specific Label Studio task", create_prediction_schema()),
        ]
    }

    /// Call a tool by name and wrap its answer as an MCP result
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        self.invoke(name, args).await.into_call_result()
    }

    /// Call a tool by name; unknown names are reported by the dispatcher
    pub async fn invoke(&self, name: &str, args: Value) -> ToolOutput {
        tracing::debug!("Invoking tool {}", name);
        require_connection(name, self.client.as_deref(), |api| {
            self.dispatch(name, api, args)
        })
        .await
    }

    async fn dispatch(&self, name: &str, api: &dyn LabelStudioApi, args: Value) -> Result<ToolOutput> {
        match name {
            "list_projects" => self.handle_list_projects(api).await,
            "get_project_details" => self.handle_get_project_details(api, args).await,
            "get_project_config" => self.handle_get_project_config(api, args).await,
            "list_project_tasks" => self.handle_list_project_tasks(api, args).await,
            "get_task_data" => self.handle_get_task_data(api, args).await,
            "get_task_annotations" => self.handle_get_task_annotations(api, args).await,
            "create_project" => self.handle_create_project(api, args).await,
            "update_project_config" => self.handle_update_project_config(api, args).await,
            "import_project_tasks" => self.handle_import_project_tasks(api, args).await,
            "create_prediction" => self.handle_create_prediction(api, args).await,
            _ => Err(McpError::UnknownTool {
                name: name.to_string(),
            }
            .into()),
        }
    }

    // ==================== Tool Handlers ====================

    async fn handle_list_projects(&self, api: &dyn LabelStudioApi) -> Result<ToolOutput> {
        let projects = api.list_projects(LIST_PROJECTS_LIMIT).await?;

        let summary: Vec<Value> = projects
            .iter()
            .take(LIST_PROJECTS_LIMIT)
            .map(|project| {
                json!({
                    "id": project.id,
                    "title": project.title.as_deref().unwrap_or("N/A"),
                    "task_count": project.task_number.unwrap_or(0),
                })
            })
            .collect();

        Ok(ToolOutput::Success(serde_json::to_string(&summary)?))
    }

    async fn handle_get_project_details(&self, api: &dyn LabelStudioApi, args: Value) -> Result<ToolOutput> {
        let args: ProjectArgs = parse_args(args)?;

        let project = api.get_project(args.project_id).await?;
        let rendered = render_record(&project)?.into_value();

        Ok(ToolOutput::Success(serde_json::to_string(&rendered)?))
    }

    async fn handle_get_project_config(&self, api: &dyn LabelStudioApi, args: Value) -> Result<ToolOutput> {
        let args: ProjectArgs = parse_args(args)?;

        let project = api.get_project(args.project_id).await?;

        // Raw XML, not JSON-encoded
        Ok(ToolOutput::Success(project.label_config.unwrap_or_default()))
    }

    async fn handle_list_project_tasks(&self, api: &dyn LabelStudioApi, args: Value) -> Result<ToolOutput> {
        let args: ProjectArgs = parse_args(args)?;

        let tasks = api.list_tasks(args.project_id, LIST_TASKS_LIMIT).await?;

        let summary: Vec<Value> = tasks
            .iter()
            .take(LIST_TASKS_LIMIT)
            .map(|task| json!({"id": task.id, "data_keys": task.data_keys()}))
            .collect();

        Ok(ToolOutput::Success(serde_json::to_string(&summary)?))
    }

    async fn handle_get_task_data(&self, api: &dyn LabelStudioApi, args: Value) -> Result<ToolOutput> {
        let args: TaskArgs = parse_args(args)?;

        let task = api.get_task(args.task_id).await?;
        let data = match task.data {
            Some(Value::Null) | None => json!({}),
            Some(data) => data,
        };

        Ok(ToolOutput::Success(serde_json::to_string(&data)?))
    }

    async fn handle_get_task_annotations(&self, api: &dyn LabelStudioApi, args: Value) -> Result<ToolOutput> {
        let args: TaskArgs = parse_args(args)?;

        let task = api.get_task(args.task_id).await?;
        let task_id = task.id.ok_or(LabelStudioApiError::MissingAttribute {
            entity: "Task",
            attribute: "annotations",
            id: args.task_id,
        })?;

        let annotations = api.task_annotations(task_id).await?;

        let mut serialized = Vec::with_capacity(annotations.len());
        for annotation in &annotations {
            serialized.push(match render_record(annotation)? {
                Rendered::Object(map) => Value::Object(map),
                Rendered::Text(details) => json!({"details": details}),
            });
        }

        Ok(ToolOutput::Success(serde_json::to_string(&serialized)?))
    }

    async fn handle_create_project(&self, api: &dyn LabelStudioApi, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            title: String,
            label_config: String,
            #[serde(default)]
            description: Presence<String>,
            #[serde(default)]
            expert_instruction: Presence<String>,
            #[serde(default)]
            show_instruction: Presence<bool>,
            #[serde(default)]
            show_skip_button: Presence<bool>,
            #[serde(default)]
            enable_empty_annotation: Presence<bool>,
            #[serde(default)]
            show_annotation_history: Presence<bool>,
            #[serde(default)]
            color: Presence<String>,
        }

        let args: Args = parse_args(args)?;

        let request = CreateProjectRequest {
            title: args.title,
            label_config: args.label_config,
            description: args.description.into_given(),
            expert_instruction: args.expert_instruction.into_given(),
            show_instruction: args.show_instruction.into_given(),
            show_skip_button: args.show_skip_button.into_given(),
            enable_empty_annotation: args.enable_empty_annotation.into_given(),
            show_annotation_history: args.show_annotation_history.into_given(),
            color: args.color.into_given(),
        };

        let project = api.create_project(&request).await?;

        let mut response = Map::new();
        response.insert("id".to_string(), json!(project.id));
        response.insert(
            "title".to_string(),
            json!(project.title.clone().unwrap_or(request.title)),
        );
        response.insert(
            "project_url".to_string(),
            json!(self.config.project_url(project.id)),
        );
        insert_project_metadata(&mut response, &project);
        if let Some(label_config) = &project.label_config {
            response.insert("label_config".to_string(), json!(label_config));
        }

        Ok(ToolOutput::Success(serde_json::to_string(&response)?))
    }

    async fn handle_update_project_config(&self, api: &dyn LabelStudioApi, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            project_id: i64,
            new_label_config: String,
        }

        let args: Args = parse_args(args)?;

        let request = UpdateProjectRequest {
            label_config: args.new_label_config,
        };

        let project = match api.update_project(args.project_id, &request).await {
            Ok(project) => project,
            Err(e) => return Ok(report_remote_failure("project config update API call", e)),
        };

        let mut response = Map::new();
        response.insert("id".to_string(), json!(project.id));
        response.insert(
            "title".to_string(),
            json!(project.title.as_deref().unwrap_or("N/A")),
        );
        response.insert(
            "label_config".to_string(),
            json!(project.label_config.as_deref().unwrap_or(&request.label_config)),
        );
        response.insert(
            "project_url".to_string(),
            json!(self.config.project_url(project.id)),
        );
        response.insert(
            "message".to_string(),
            json!("Project configuration updated successfully."),
        );
        insert_project_metadata(&mut response, &project);

        Ok(ToolOutput::Success(serde_json::to_string(&response)?))
    }

    async fn handle_import_project_tasks(&self, api: &dyn LabelStudioApi, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            project_id: i64,
            tasks_file_path: String,
        }

        let args: Args = parse_args(args)?;

        let tasks = match read_tasks_file(Path::new(&args.tasks_file_path)).await {
            Ok(tasks) => tasks,
            Err(message) => return Ok(ToolOutput::Failure(message)),
        };

        let project_url = self.config.project_url(args.project_id);

        let outcome = match api.import_tasks(args.project_id, &tasks).await {
            Ok(outcome) => outcome,
            Err(e) => return Ok(report_remote_failure("task import API call", e)),
        };
        tracing::info!(
            "Imported {} task(s) into project {}",
            tasks.len(),
            args.project_id
        );

        let mut response = match render_record(&outcome)? {
            Rendered::Object(map) => map,
            Rendered::Text(details) => {
                let mut map = Map::new();
                map.insert("message".to_string(), json!("Import initiated"));
                map.insert("details".to_string(), json!(details));
                map
            }
        };
        response.insert("project_url".to_string(), json!(project_url));

        Ok(ToolOutput::Success(serde_json::to_string(&response)?))
    }

    async fn handle_create_prediction(&self, api: &dyn LabelStudioApi, args: Value) -> Result<ToolOutput> {
        #[derive(Deserialize)]
        struct Args {
            task_id: i64,
            result: Vec<Map<String, Value>>,
            #[serde(default)]
            model_version: Presence<String>,
            #[serde(default)]
            score: Presence<f64>,
        }

        let args: Args = parse_args(args)?;

        let request = CreatePredictionRequest {
            task: args.task_id,
            result: args.result,
            model_version: args.model_version.into_given(),
            score: args.score.into_given(),
        };

        let prediction = match api.create_prediction(&request).await {
            Ok(prediction) => prediction,
            Err(e) => return Ok(report_remote_failure("prediction create/serialize", e)),
        };

        let mut response = Map::new();
        response.insert(
            "message".to_string(),
            json!("Prediction created successfully."),
        );
        response.extend(prediction.whitelisted_fields());

        Ok(ToolOutput::Success(serde_json::to_string(&response)?))
    }
}

#[derive(Deserialize)]
struct ProjectArgs {
    project_id: i64,
}

/// `project_id` is accepted for symmetry with the project tools but tasks
/// are addressed by `task_id` alone
#[derive(Deserialize)]
struct TaskArgs {
    #[allow(dead_code)]
    project_id: i64,
    task_id: i64,
}

/// Bind tool arguments, treating missing arguments as an empty object
fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() {
        Value::Object(Map::new())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| {
        McpError::InvalidArguments {
            message: e.to_string(),
        }
        .into()
    })
}

/// Copy the optional project metadata that is present on `project`
fn insert_project_metadata(response: &mut Map<String, Value>, project: &Project) {
    let text_fields = [
        ("description", &project.description),
        ("color", &project.color),
        ("expert_instruction", &project.expert_instruction),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value {
            response.insert(key.to_string(), json!(value));
        }
    }
    if let Some(created_at) = &project.created_at {
        response.insert("created_at".to_string(), datetime_to_json(created_at));
    }
}

/// Read a JSON array of tasks from disk.
///
/// Failures are returned as the message to show the caller.
async fn read_tasks_file(path: &Path) -> std::result::Result<Vec<Value>, String> {
    let display = path.display();

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            return Err(match e.kind() {
                std::io::ErrorKind::NotFound => {
                    format!("Error: Tasks file not found at path: {}", display)
                }
                std::io::ErrorKind::PermissionDenied => {
                    format!("Error: Permission denied when trying to read file: {}", display)
                }
                std::io::ErrorKind::InvalidData => {
                    format!("Error processing tasks file: '{}' is not valid UTF-8 text: {}", display, e)
                }
                _ => format!(
                    "Unexpected error reading/processing tasks file '{}': IoError - {}",
                    display, e
                ),
            })
        }
    };

    let parsed: Value = serde_json::from_str(&content)
        .map_err(|e| format!("Error: Invalid JSON format in file '{}' - {}", display, e))?;

    match parsed {
        Value::Array(tasks) => Ok(tasks),
        _ => Err(format!(
            "Error processing tasks file: JSON file '{}' must contain a valid JSON array (list).",
            display
        )),
    }
}

// ==================== Schema Definitions ====================

fn tool_def(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

fn project_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "project_id": {
                "type": "integer",
                "description": "ID of the Label Studio project"
            }
        },
        "required": ["project_id"]
    })
}

fn task_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "project_id": {
                "type": "integer",
                "description": "ID of the project the task belongs to"
            },
            "task_id": {
                "type": "integer",
                "description": "ID of the task"
            }
        },
        "required": ["project_id", "task_id"]
    })
}

fn create_project_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": {
                "type": "string",
                "description": "Title for the new project"
            },
            "label_config": {
                "type": "string",
                "description": "XML string defining the labeling interface"
            },
            "description": {
                "type": "string",
                "description": "Project description. Omit the parameter entirely to leave it unset"
            },
            "expert_instruction": {
                "type": "string",
                "description": "Instructions for labelers. Omit the parameter entirely to leave it unset"
            },
            "show_instruction": {
                "type": "boolean",
                "description": "Show instructions before labeling"
            },
            "show_skip_button": {
                "type": "boolean",
                "description": "Allow labelers to skip tasks"
            },
            "enable_empty_annotation": {
                "type": "boolean",
                "description": "Allow submitting empty annotations"
            },
            "show_annotation_history": {
                "type": "boolean",
                "description": "Show annotation history to labelers"
            },
            "color": {
                "type": "string",
                "description": "Project color as a hex string, e.g. #FF0000"
            }
        },
        "required": ["title", "label_config"]
    })
}

fn update_project_config_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "project_id": {
                "type": "integer",
                "description": "ID of the project to update"
            },
            "new_label_config": {
                "type": "string",
                "description": "The complete new XML labeling configuration; replaces the existing one"
            }
        },
        "required": ["project_id", "new_label_config"]
    })
}

fn import_project_tasks_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "project_id": {
                "type": "integer",
                "description": "ID of the target project"
            },
            "tasks_file_path": {
                "type": "string",
                "description": "Relative or absolute path to a JSON file holding an array of tasks, e.g. [{\"data\": {\"text\": \"Sentence 1\"}}]"
            }
        },
        "required": ["project_id", "tasks_file_path"]
    })
}

fn create_prediction_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "task_id": {
                "type": "integer",
                "description": "ID of the task to add the prediction to"
            },
            "result": {
                "type": "array",
                "items": {"type": "object"},
                "description": "Prediction result in Label Studio format, e.g. [{\"from_name\": \"label\", \"to_name\": \"text\", \"type\": \"choices\", \"value\": {\"choices\": [\"Positive\"]}}]"
            },
            "model_version": {
                "type": "string",
                "description": "Model version identifier"
            },
            "score": {
                "type": "number",
                "description": "Confidence score between 0.0 and 1.0"
            }
        },
        "required": ["task_id", "result"]
    })
}
