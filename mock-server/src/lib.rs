use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpListener,
    sync::{Mutex, RwLock},
};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Deserialize)]
pub struct CreateIssue {
    pub title: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// A request seen by `/scripted`.
#[derive(Clone, Debug, Default)]
pub struct Recorded {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Shared state. Tests keep a handle to queue responses and inspect hits.
#[derive(Default)]
pub struct MockState {
    issues: RwLock<HashMap<String, Issue>>,
    script: Mutex<VecDeque<(u16, String)>>,
    hits: AtomicUsize,
    last: Mutex<Option<Recorded>>,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the next response for `/scripted`.
    pub async fn push(&self, status: u16, body: impl Into<String>) {
        self.script.lock().await.push_back((status, body.into()));
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub async fn last_request(&self) -> Option<Recorded> {
        self.last.lock().await.clone()
    }
}

pub type Shared = Arc<MockState>;

pub fn app() -> Router {
    app_with(MockState::new())
}

pub fn app_with(state: Shared) -> Router {
    Router::new()
        .route("/issues", get(list_issues).post(create_issue))
        .route("/issues/{id}", get(get_issue))
        .route("/scripted", any(scripted))
        .route("/echo", any(echo))
        .route("/slow/{ms}", get(slow))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, state: Shared) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

async fn list_issues(State(state): State<Shared>) -> Json<Vec<Issue>> {
    let issues = state.issues.read().await;
    Json(issues.values().cloned().collect())
}

async fn create_issue(
    State(state): State<Shared>,
    Json(input): Json<CreateIssue>,
) -> (StatusCode, Json<Issue>) {
    let issue = Issue {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        labels: input.labels,
    };
    state.issues.write().await.insert(issue.id.clone(), issue.clone());
    (StatusCode::CREATED, Json(issue))
}

async fn get_issue(
    State(state): State<Shared>,
    Path(id): Path<String>,
) -> Result<Json<Issue>, (StatusCode, &'static str)> {
    let issues = state.issues.read().await;
    issues
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, r#"{"error":"issue not found"}"#))
}

async fn scripted(
    State(state): State<Shared>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last.lock().await = Some(Recorded {
        method: method.to_string(),
        headers: header_pairs(&headers),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let (status, body) = state
        .script
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| (200, "{}".to_string()));
    tracing::debug!(%method, status, "scripted response");
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, body)
}

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<serde_json::Value> {
    let headers: serde_json::Map<String, serde_json::Value> = header_pairs(&headers)
        .into_iter()
        .map(|(name, value)| (name, serde_json::Value::String(value)))
        .collect();
    Json(serde_json::json!({
        "method": method.as_str(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn slow(Path(ms): Path<u64>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({}))
}
