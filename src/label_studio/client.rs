//! Label Studio API client
//!
//! HTTP implementation of [`LabelStudioApi`] over `reqwest`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{Config, API_KEY_ENV};
use crate::error::{ConfigError, LabelStudioApiError, LabelStudioMcpError, Result};
use crate::label_studio::api::LabelStudioApi;
use crate::label_studio::types::*;

/// Largest page requested from list endpoints
const MAX_PAGE_SIZE: usize = 100;

/// Label Studio API client
pub struct LabelStudioClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// Endpoint configuration
    config: Config,

    /// `Authorization` header value
    auth_header: String,
}

impl LabelStudioClient {
    /// Create a new client; fails when no API key is configured
    pub fn new(config: Config) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| ConfigError::MissingEnvVar {
            var: API_KEY_ENV.to_string(),
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            config,
            auth_header: format!("Token {}", api_key),
        })
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(self.config.api_url(path))
            .header(AUTHORIZATION, &self.auth_header)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .post(self.config.api_url(path))
            .header(AUTHORIZATION, &self.auth_header)
    }

    fn patch(&self, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .patch(self.config.api_url(path))
            .header(AUTHORIZATION, &self.auth_header)
    }

    /// Decode a successful response, or map the failure status to an error
    async fn read_json<T: DeserializeOwned>(
        response: Response,
        action: &str,
        entity: Option<(&'static str, i64)>,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            return serde_json::from_str(&body).map_err(|e| {
                LabelStudioApiError::UnexpectedResponse {
                    endpoint: action.to_string(),
                    message: e.to_string(),
                }
                .into()
            });
        }

        if status == StatusCode::NOT_FOUND {
            if let Some((entity, id)) = entity {
                return Err(LabelStudioMcpError::Api(LabelStudioApiError::NotFound { entity, id }));
            }
        }

        let text = response.text().await.unwrap_or_default();
        tracing::warn!("Label Studio request to {} failed with {}", action, status);
        Err(LabelStudioMcpError::Api(LabelStudioApiError::RequestFailed {
            status: status.as_u16(),
            message: format!("Failed to {}: {}", action, text),
        }))
    }

    /// Walk a paginated listing until `limit` items are collected or the
    /// platform runs out of pages
    async fn collect_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        filter: &[(&str, String)],
        limit: usize,
        action: &str,
    ) -> Result<Vec<T>> {
        let page_size = limit.clamp(1, MAX_PAGE_SIZE);
        let mut items: Vec<T> = Vec::new();
        let mut seen = 0usize;
        let mut page = 1u32;

        while items.len() < limit {
            let response = self
                .get(path)
                .query(filter)
                .query(&[("page", page.to_string()), ("page_size", page_size.to_string())])
                .send()
                .await?;

            // Requests past the last page are answered with 404
            if page > 1 && response.status() == StatusCode::NOT_FOUND {
                break;
            }

            let body: Page<T> = Self::read_json(response, action, None).await?;
            let (batch, more) = body.into_parts(seen);
            let fetched = batch.len();
            seen += fetched;

            let remaining = limit - items.len();
            items.extend(batch.into_iter().take(remaining));

            if !more || fetched < page_size {
                break;
            }
            page += 1;
        }

        tracing::debug!("{}: collected {} items over {} page(s)", action, items.len(), page);
        Ok(items)
    }
}

/// Build the connection handle used by the tools.
///
/// Returns `None`, after logging why, when no API key is configured or the
/// client cannot be constructed.
pub fn connect(config: &Config) -> Option<Arc<dyn LabelStudioApi>> {
    if !config.has_api_key() {
        tracing::warn!("{} not set; Label Studio client unavailable.", API_KEY_ENV);
        return None;
    }

    match LabelStudioClient::new(config.clone()) {
        Ok(client) => {
            tracing::info!("Connected to Label Studio at {}", config.base_url);
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::error!("Error initializing Label Studio client: {}", e);
            None
        }
    }
}

#[async_trait]
impl LabelStudioApi for LabelStudioClient {
    async fn list_projects(&self, limit: usize) -> Result<Vec<Project>> {
        self.collect_pages("/api/projects/", &[], limit, "list projects")
            .await
    }

    async fn get_project(&self, project_id: i64) -> Result<Project> {
        let response = self
            .get(&format!("/api/projects/{}/", project_id))
            .send()
            .await?;
        Self::read_json(response, "get project", Some(("Project", project_id))).await
    }

    async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project> {
        let response = self.post("/api/projects/").json(request).send().await?;
        Self::read_json(response, "create project", None).await
    }

    async fn update_project(
        &self,
        project_id: i64,
        request: &UpdateProjectRequest,
    ) -> Result<Project> {
        let response = self
            .patch(&format!("/api/projects/{}/", project_id))
            .json(request)
            .send()
            .await?;
        Self::read_json(response, "update project", Some(("Project", project_id))).await
    }

    async fn import_tasks(&self, project_id: i64, tasks: &[Value]) -> Result<ImportOutcome> {
        let response = self
            .post(&format!("/api/projects/{}/import", project_id))
            .json(tasks)
            .send()
            .await?;
        Self::read_json(response, "import tasks", Some(("Project", project_id))).await
    }

    async fn list_tasks(&self, project_id: i64, limit: usize) -> Result<Vec<Task>> {
        self.collect_pages(
            "/api/tasks/",
            &[("project", project_id.to_string())],
            limit,
            "list tasks",
        )
        .await
    }

    async fn get_task(&self, task_id: i64) -> Result<Task> {
        let response = self
            .get(&format!("/api/tasks/{}/", task_id))
            .send()
            .await?;
        Self::read_json(response, "get task", Some(("Task", task_id))).await
    }

    async fn task_annotations(&self, task_id: i64) -> Result<Vec<AnnotationRecord>> {
        let response = self
            .get(&format!("/api/tasks/{}/annotations/", task_id))
            .send()
            .await?;
        Self::read_json(response, "get task annotations", Some(("Task", task_id))).await
    }

    async fn create_prediction(&self, request: &CreatePredictionRequest) -> Result<Prediction> {
        let response = self.post("/api/predictions/").json(request).send().await?;
        Self::read_json(response, "create prediction", Some(("Task", request.task))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    type Handler = Arc<dyn Fn(&str) -> (u16, String) + Send + Sync>;

    /// Local HTTP server answering every request through `handler`
    struct StubServer {
        base_url: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubServer {
        async fn start(handler: Handler) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let recorded = requests.clone();

            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let handler = handler.clone();
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            let n = socket.read(&mut buf).await.unwrap();
                            if n == 0 {
                                return;
                            }
                            head.extend_from_slice(&buf[..n]);
                        }
                        let head = String::from_utf8_lossy(&head).to_string();
                        let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                        recorded.lock().unwrap().push(head.to_lowercase());

                        let (status, body) = handler(&target);
                        let response = format!(
                            "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        socket.write_all(response.as_bytes()).await.unwrap();
                        let _ = socket.shutdown().await;
                    });
                }
            });

            Self { base_url, requests }
        }

        fn client(&self) -> LabelStudioClient {
            LabelStudioClient::new(Config::new(self.base_url.clone(), Some("k1".to_string()))).unwrap()
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn query_param(target: &str, key: &str) -> Option<usize> {
        let (_, query) = target.split_once('?')?;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.parse().ok())
    }

    /// Paged `results` listing of `total` projects
    fn project_pages(total: usize) -> Handler {
        Arc::new(move |target: &str| -> (u16, String) {
            let page = query_param(target, "page").unwrap_or(1);
            let size = query_param(target, "page_size").unwrap_or(100);
            let first = (page - 1) * size + 1;
            let last = (page * size).min(total);
            let results: Vec<Value> = (first..=last)
                .map(|id| serde_json::json!({"id": id, "title": format!("P{}", id)}))
                .collect();
            let next = (last < total).then(|| format!("/api/projects/?page={}", page + 1));
            let body = serde_json::json!({"count": total, "next": next, "results": results});
            (200, body.to_string())
        })
    }

    #[tokio::test]
    async fn test_list_projects_stops_at_limit() {
        let stub = StubServer::start(project_pages(300)).await;

        let projects = stub.client().list_projects(100).await.unwrap();
        assert_eq!(projects.len(), 100);
        assert_eq!(projects[99].id, 100);

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains("page_size=100"));
        assert!(requests[0].contains("authorization: token k1"));
    }

    #[tokio::test]
    async fn test_list_projects_walks_pages_until_not_found() {
        let stub = StubServer::start(Arc::new(|target: &str| -> (u16, String) {
            if query_param(target, "page") == Some(3) {
                return (404, r#"{"detail": "Invalid page."}"#.to_string());
            }
            project_pages(1000)(target)
        }))
        .await;

        let projects = stub.client().list_projects(250).await.unwrap();
        assert_eq!(projects.len(), 200);
        assert_eq!(stub.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_list_tasks_reads_tasks_envelope() {
        let stub = StubServer::start(Arc::new(|_: &str| -> (u16, String) {
            let tasks: Vec<Value> = (1..=30)
                .map(|id| serde_json::json!({"id": id, "data": {"text": "t"}}))
                .collect();
            (200, serde_json::json!({"tasks": tasks, "total": 30}).to_string())
        }))
        .await;

        let tasks = stub.client().list_tasks(7, 50).await.unwrap();
        assert_eq!(tasks.len(), 30);

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("get /api/tasks/?"));
        assert!(requests[0].contains("project=7"));
        assert!(requests[0].contains("page_size=50"));
    }

    #[tokio::test]
    async fn test_status_errors_map_to_kinds() {
        let stub = StubServer::start(Arc::new(|target: &str| -> (u16, String) {
            if target.starts_with("/api/projects/42/") {
                (404, r#"{"detail": "Not found."}"#.to_string())
            } else if target.starts_with("/api/projects/7/") {
                (500, r#"{"detail": "boom"}"#.to_string())
            } else {
                (200, "<html>not json</html>".to_string())
            }
        }))
        .await;
        let client = stub.client();

        let err = client.get_project(42).await.unwrap_err();
        assert_eq!(err.kind(), "NotFound");
        assert!(err.to_string().contains("Project not found: 42"));

        let err = client.get_project(7).await.unwrap_err();
        assert_eq!(err.kind(), "RequestFailed");
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));

        let err = client.get_task(1).await.unwrap_err();
        assert_eq!(err.kind(), "UnexpectedResponse");
    }

    #[test]
    fn test_client_requires_api_key() {
        let err = LabelStudioClient::new(Config::default()).err().unwrap();
        assert_eq!(err.kind(), "ConfigError");
        assert!(err.to_string().contains("LABEL_STUDIO_API_KEY"));
    }

    #[test]
    fn test_connect_without_key_is_unset() {
        assert!(connect(&Config::default()).is_none());
        let config = Config::new("http://localhost:8080", Some("k".to_string()));
        assert!(connect(&config).is_some());
    }

    #[test]
    fn test_client_uses_token_auth() {
        let config = Config::new("http://localhost:9000/", Some("abc123".to_string()));
        let client = LabelStudioClient::new(config).unwrap();
        assert_eq!(client.auth_header, "Token abc123");
        assert_eq!(client.config().base_url, "http://localhost:9000");
    }
}
