//! Shared test utilities: an in-memory management API.
//!
//! Resources are stored as JSON under their lower-cased path. Writes answer
//! with `Azure-AsyncOperation`, deletes with `Location`, and each operation
//! reports itself in progress once before it succeeds.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use uuid::Uuid;

use azrm_provider::{AuditLogger, Provider, ProviderConfig};

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
pub const TOKEN: &str = "test-token";

/// One request as seen by the fake.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl Recorded {
    pub fn is_mutation(&self) -> bool {
        matches!(self.method, Method::PUT | Method::PATCH | Method::DELETE)
    }
}

struct Shared {
    base: String,
    resources: Mutex<BTreeMap<String, Value>>,
    polls: Mutex<HashMap<String, u32>>,
    log: Mutex<Vec<Recorded>>,
}

/// Fake management endpoint bound to an ephemeral port.
pub struct FakeArm {
    pub base: String,
    shared: Arc<Shared>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl FakeArm {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr: SocketAddr = listener.local_addr().unwrap();
        let base = format!("http://{}", addr);

        let shared = Arc::new(Shared {
            base: base.clone(),
            resources: Mutex::new(BTreeMap::new()),
            polls: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        });

        let router = Router::new().fallback(handle).with_state(shared.clone());
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            base,
            shared,
            shutdown_tx,
        }
    }

    /// Provider pointed at this fake, with a short poll interval.
    pub fn provider(&self) -> Provider {
        let config = ProviderConfig::new(SUBSCRIPTION, TOKEN)
            .with_endpoint(self.base.clone())
            .with_poll_interval(Duration::from_millis(10))
            .with_operation_timeout(Duration::from_secs(30));
        Provider::new(config)
            .expect("valid provider config")
            .with_audit(AuditLogger::new_noop())
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.log.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Recorded> {
        self.requests().into_iter().filter(Recorded::is_mutation).collect()
    }

    pub fn clear_log(&self) {
        self.shared.log.lock().unwrap().clear();
    }

    /// Stored document at `path`, if any.
    pub fn resource(&self, path: &str) -> Option<Value> {
        self.shared
            .resources
            .lock()
            .unwrap()
            .get(&path.to_lowercase())
            .cloned()
    }

    /// Seed a resource as if it was created outside the provider.
    pub fn insert(&self, path: &str, mut document: Value) {
        document["id"] = json!(path);
        self.shared
            .resources
            .lock()
            .unwrap()
            .insert(path.to_lowercase(), document);
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"code": code, "message": message}})),
    )
        .into_response()
}

fn not_found(path: &str) -> Response {
    error(
        StatusCode::NOT_FOUND,
        "ResourceNotFound",
        &format!("{path} was not found"),
    )
}

/// RFC 7386 merge patch.
fn merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(fields) => {
            if !target.is_object() {
                *target = json!({});
            }
            let object = target.as_object_mut().unwrap();
            for (key, value) in fields {
                if value.is_null() {
                    object.remove(key);
                } else {
                    merge_patch(object.entry(key.clone()).or_insert(Value::Null), value);
                }
            }
        }
        other => *target = other.clone(),
    }
}

fn parent(key: &str) -> Option<&str> {
    key.rsplitn(3, '/').nth(2)
}

fn last_segment(path: &str) -> String {
    path.rsplit('/').next().unwrap_or_default().to_string()
}

fn accepted_async(shared: &Shared, status: StatusCode, body: Value) -> Response {
    let operation = format!("{}/operations/{}", shared.base, Uuid::new_v4());
    (
        status,
        [
            ("azure-asyncoperation", operation),
            ("retry-after", "0".to_string()),
        ],
        Json(body),
    )
        .into_response()
}

/// Fill in what the service computes on write.
fn assign_server_fields(key: &str, path: &str, document: &mut Value, previous: Option<&Value>) {
    document["id"] = json!(path);
    document["name"] = json!(last_segment(path));
    document["properties"]["provisioningState"] = json!("Succeeded");

    if key.contains("/providers/microsoft.streamanalytics/streamingjobs/") {
        document["type"] = json!("Microsoft.StreamAnalytics/streamingjobs");
        let job_id = previous
            .and_then(|p| p["properties"]["jobId"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        document["properties"]["jobId"] = json!(job_id);
        if document["properties"].get("dataLocale").is_none() {
            document["properties"]["dataLocale"] = json!("en-US");
        }
        if document["properties"].get("compatibilityLevel").is_none() {
            document["properties"]["compatibilityLevel"] = json!("1.0");
        }
        if document["identity"].is_object() {
            document["identity"]["principalId"] = json!("11111111-1111-1111-1111-111111111111");
            document["identity"]["tenantId"] = json!("22222222-2222-2222-2222-222222222222");
        }
        if document["properties"]["transformation"].is_object() {
            let name = document["properties"]["transformation"]["name"]
                .as_str()
                .unwrap_or("main")
                .to_string();
            document["properties"]["transformation"]["id"] =
                json!(format!("{path}/transformations/{name}"));
        }
    } else if collection(key) == Some("nodetypes") {
        document["type"] = json!("Microsoft.ServiceFabric/managedClusters/nodeTypes");
    } else if key.contains("/providers/microsoft.servicefabric/managedclusters/") {
        document["type"] = json!("Microsoft.ServiceFabric/managedClusters");
        let name = last_segment(path);
        document["properties"]["fqdn"] = json!(format!("{name}.westeurope.cloudapp.azure.com"));
        document["properties"]["clusterId"] = json!(
            previous
                .and_then(|p| p["properties"]["clusterId"].as_str())
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string())
        );
        document["properties"]["clusterState"] = json!("Ready");
        // Write-only.
        if let Some(props) = document["properties"].as_object_mut() {
            props.remove("adminPassword");
        }
    }
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let query = uri.query().unwrap_or_default().to_string();
    let key = path.to_lowercase();

    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-token") {
        return error(StatusCode::UNAUTHORIZED, "AuthenticationFailed", "bad token");
    }

    let payload: Option<Value> = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => Some(v),
            Err(_) => return error(StatusCode::BAD_REQUEST, "InvalidJson", "malformed body"),
        }
    };

    shared.log.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        body: payload.clone(),
    });

    // Long-running operation status endpoints.
    if let Some(op) = path.strip_prefix("/operations/") {
        let mut polls = shared.polls.lock().unwrap();
        let n = polls.entry(op.to_string()).or_insert(0);
        *n += 1;
        let status = if *n < 2 { "InProgress" } else { "Succeeded" };
        return ([("retry-after", "0")], Json(json!({"status": status}))).into_response();
    }
    if let Some(op) = path.strip_prefix("/locations/") {
        let mut polls = shared.polls.lock().unwrap();
        let n = polls.entry(op.to_string()).or_insert(0);
        *n += 1;
        return if *n < 2 {
            (StatusCode::ACCEPTED, [("retry-after", "0")]).into_response()
        } else {
            StatusCode::OK.into_response()
        };
    }

    if !query.contains("api-version=") {
        return error(StatusCode::BAD_REQUEST, "MissingApiVersion", "api-version is required");
    }

    let mut resources = shared.resources.lock().unwrap();

    match method {
        Method::GET if key.ends_with("/nodetypes") => {
            let prefix = format!("{key}/");
            if !resources.contains_key(parent_of_collection(&key)) {
                return not_found(&path);
            }
            let value: Vec<Value> = resources
                .iter()
                .filter(|(k, _)| k.starts_with(&prefix) && !k[prefix.len()..].contains('/'))
                .map(|(_, v)| v.clone())
                .collect();
            Json(json!({"value": value})).into_response()
        }
        Method::GET if is_transformation(&key) => {
            let Some(job_key) = parent(&key) else {
                return not_found(&path);
            };
            match resources.get(job_key) {
                Some(job) if job["properties"]["transformation"].is_object() => {
                    Json(job["properties"]["transformation"].clone()).into_response()
                }
                _ => not_found(&path),
            }
        }
        Method::GET => match resources.get(&key) {
            Some(document) => {
                let mut document = document.clone();
                let expanded = query.contains("expand=transformation");
                if !expanded {
                    if let Some(props) = document["properties"].as_object_mut() {
                        props.remove("transformation");
                    }
                }
                Json(document).into_response()
            }
            None => not_found(&path),
        },
        Method::PUT => {
            let Some(mut document) = payload else {
                return error(StatusCode::BAD_REQUEST, "InvalidRequest", "missing body");
            };
            if collection(&key) == Some("nodetypes") {
                if let Some(cluster) = parent(&key) {
                    if !resources.contains_key(cluster) {
                        return not_found(cluster);
                    }
                }
            }
            let previous = resources.get(&key).cloned();
            assign_server_fields(&key, &path, &mut document, previous.as_ref());
            resources.insert(key, document.clone());
            let status = if previous.is_some() {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            accepted_async(&shared, status, document)
        }
        Method::PATCH if is_transformation(&key) => {
            let Some(job_key) = parent(&key).map(str::to_string) else {
                return not_found(&path);
            };
            let Some(job) = resources.get_mut(&job_key) else {
                return not_found(&path);
            };
            let Some(patch) = payload else {
                return error(StatusCode::BAD_REQUEST, "InvalidRequest", "missing body");
            };
            let transformation = &mut job["properties"]["transformation"];
            merge_patch(transformation, &patch);
            transformation["id"] = json!(path);
            transformation["name"] = json!(last_segment(&path));
            Json(transformation.clone()).into_response()
        }
        Method::PATCH => {
            let Some(patch) = payload else {
                return error(StatusCode::BAD_REQUEST, "InvalidRequest", "missing body");
            };
            let Some(document) = resources.get_mut(&key) else {
                return not_found(&path);
            };
            merge_patch(document, &patch);
            let mut response = document.clone();
            if let Some(props) = response["properties"].as_object_mut() {
                props.remove("transformation");
            }
            Json(response).into_response()
        }
        Method::DELETE => {
            if resources.remove(&key).is_none() {
                return StatusCode::NO_CONTENT.into_response();
            }
            let children = format!("{key}/");
            resources.retain(|k, _| !k.starts_with(&children));
            let location = format!("{}/locations/{}", shared.base, Uuid::new_v4());
            (
                StatusCode::ACCEPTED,
                [("location", location), ("retry-after", "0".to_string())],
            )
                .into_response()
        }
        _ => error(StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed", "unsupported"),
    }
}

/// Name of the collection the last segment belongs to.
fn collection(key: &str) -> Option<&str> {
    let mut segments = key.rsplit('/');
    segments.next();
    segments.next()
}

fn is_transformation(key: &str) -> bool {
    collection(key) == Some("transformations")
}

fn parent_of_collection(key: &str) -> &str {
    key.rsplit_once('/').map(|(p, _)| p).unwrap_or(key)
}
