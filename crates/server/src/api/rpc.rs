//! JSON-RPC 1.0 over HTTP-POST.
//!
//! Requests look like `{"id": 1, "method": "Service.Exec", "params": [arg]}`
//! and answer with `{"id": 1, "result": ..., "error": null}`. The same
//! dispatcher serves the WebSocket transport.

use axum::{extract::State, Json};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use mediaq_core::{DownloadRequest, JobService};

use crate::metrics::RPC_CALLS;
use crate::state::AppState;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: Value,
    pub result: Value,
    pub error: Option<String>,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result,
            error: None,
        }
    }

    fn err(id: Value, error: impl Into<String>) -> Self {
        Self {
            id,
            result: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Argument naming a job or a URL. Field names are accepted in either case.
#[derive(Debug, Default, Deserialize)]
struct TargetArgs {
    #[serde(default, alias = "Id")]
    id: String,
    #[serde(default, alias = "URL", alias = "Url")]
    url: String,
}

// ============================================================================
// Dispatch
// ============================================================================

/// First positional argument, or the type's null form when absent.
fn arg<T: DeserializeOwned>(params: &[Value]) -> Result<T, String> {
    let value = params.first().cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| format!("invalid params: {}", e))
}

/// Argument given either as a bare string or as `{id}`/`{url}` object.
fn target(params: &[Value], pick: fn(TargetArgs) -> String) -> Result<String, String> {
    match params.first() {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => arg::<TargetArgs>(params).map(pick),
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

async fn call(service: &JobService, method: &str, params: &[Value]) -> Result<Value, String> {
    let method = method.strip_prefix("Service.").unwrap_or(method);
    match method {
        "Exec" => {
            let request: DownloadRequest = arg(params)?;
            to_value(service.submit(request).await.map_err(|e| e.to_string())?)
        }
        "ExecPlaylist" => {
            let request: DownloadRequest = arg(params)?;
            to_value(
                service
                    .submit_playlist(request)
                    .await
                    .map_err(|e| e.to_string())?,
            )
        }
        "ExecLivestream" => {
            let url = target(params, |a| a.url)?;
            to_value(
                service
                    .submit_livestream(&url)
                    .await
                    .map_err(|e| e.to_string())?,
            )
        }
        "Progress" => {
            let id = target(params, |a| a.id)?;
            to_value(service.progress(&id).await.map_err(|e| e.to_string())?)
        }
        "Formats" => {
            let url = target(params, |a| a.url)?;
            to_value(service.formats(&url).await.map_err(|e| e.to_string())?)
        }
        "Pending" => to_value(service.list_ids().await),
        "Running" => to_value(service.list().await),
        "Kill" => {
            let id = target(params, |a| a.id)?;
            service.kill(&id).await.map_err(|e| e.to_string())?;
            Ok(Value::Null)
        }
        "KillAll" => to_value(service.kill_all().await.map_err(|e| e.to_string())?),
        "Clear" => {
            let id = target(params, |a| a.id)?;
            service.clear(&id).await.map_err(|e| e.to_string())?;
            Ok(Value::Null)
        }
        "ProgressLivestream" => to_value(service.livestream_status().await),
        "KillLivestream" => {
            let url = target(params, |a| a.url)?;
            service
                .kill_livestream(&url)
                .await
                .map_err(|e| e.to_string())?;
            Ok(Value::Null)
        }
        "KillAllLivestream" => {
            service
                .kill_all_livestreams()
                .await
                .map_err(|e| e.to_string())?;
            Ok(Value::Null)
        }
        "UpdateExecutable" => {
            service
                .update_executable()
                .await
                .map_err(|e| e.to_string())?;
            Ok(Value::Bool(true))
        }
        _ => Err(format!("rpc: can't find method Service.{}", method)),
    }
}

/// Run one request against the service.
pub async fn dispatch(service: &JobService, request: RpcRequest) -> RpcResponse {
    debug!("RPC call {}", request.method);
    match call(service, &request.method, &request.params).await {
        Ok(result) => {
            RPC_CALLS.with_label_values(&[&request.method, "ok"]).inc();
            RpcResponse::ok(request.id, result)
        }
        Err(error) => {
            RPC_CALLS.with_label_values(&[&request.method, "error"]).inc();
            warn!("RPC call {} failed: {}", request.method, error);
            RpcResponse::err(request.id, error)
        }
    }
}

/// Decode and run a raw request body.
pub async fn handle_raw(service: &JobService, raw: &str) -> RpcResponse {
    match serde_json::from_str::<RpcRequest>(raw) {
        Ok(request) => dispatch(service, request).await,
        Err(e) => {
            let id = serde_json::from_str::<Value>(raw)
                .ok()
                .and_then(|v| v.get("id").cloned())
                .unwrap_or(Value::Null);
            RpcResponse::err(id, format!("invalid request: {}", e))
        }
    }
}

/// HTTP-POST transport
pub async fn rpc_http(State(state): State<Arc<AppState>>, body: String) -> Json<RpcResponse> {
    Json(handle_raw(state.service(), &body).await)
}
