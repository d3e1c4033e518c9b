//! 管理接口 (§6)。对应 SPEC_FULL.md 所定义的管理面——以存储为后盾的真实
//! CRUD 端点,辅以延迟探测、迁移、备份这类本身就是"尽力而为"操作的瘦身实现。

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::{Json, response::Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::config::StorageBackend;
use crate::core::secret;
use crate::model::{Profile, Subscription};
use crate::storage::{KEY_BACKUPS, KEY_PROFILES, KEY_SUBS, backup_data_key};

use super::AppState;
use super::auth::validate_admin_bearer;

async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let secret = secret::get_or_create(state.storage.as_ref())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())?;
    let auth_header = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    if validate_admin_bearer(&secret, auth_header) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED.into_response())
    }
}

pub async fn system_status(State(state): State<AppState>) -> impl IntoResponse {
    let backend = match state.config.storage.backend {
        StorageBackend::Kv => "kv",
        StorageBackend::D1 => "d1",
    };
    Json(json!({ "backend": backend, "bind": state.config.bind }))
}

#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub password: String,
}

pub async fn system_setup(State(state): State<AppState>, Json(req): Json<SetupRequest>) -> impl IntoResponse {
    let hashed = blake3::hash(req.password.as_bytes()).to_hex().to_string();
    match state.storage.put(crate::storage::KEY_USERS, hashed).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    let Ok(Some(hashed)) = state.storage.get(crate::storage::KEY_USERS).await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let candidate = blake3::hash(req.password.as_bytes()).to_hex().to_string();
    if candidate != hashed {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match secret::get_or_create(state.storage.as_ref()).await {
        Ok(token) => Json(LoginResponse { token }).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub async fn logout() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn get_data(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    let subs = load_json::<Vec<Subscription>>(&state, KEY_SUBS).await.unwrap_or_default();
    let profiles = load_json::<Vec<Profile>>(&state, KEY_PROFILES).await.unwrap_or_default();
    Json(json!({ "subscriptions": subs, "profiles": profiles })).into_response()
}

pub async fn list_subs(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    let subs = load_json::<Vec<Subscription>>(&state, KEY_SUBS).await.unwrap_or_default();
    Json(subs).into_response()
}

pub async fn upsert_sub(State(state): State<AppState>, headers: HeaderMap, Json(sub): Json<Subscription>) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    let mut subs = load_json::<Vec<Subscription>>(&state, KEY_SUBS).await.unwrap_or_default();
    match subs.iter_mut().find(|s| s.id == sub.id) {
        Some(existing) => *existing = sub,
        None => subs.push(sub),
    }
    save_json(&state, KEY_SUBS, &subs).await
}

pub async fn delete_sub(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    let mut subs = load_json::<Vec<Subscription>>(&state, KEY_SUBS).await.unwrap_or_default();
    subs.retain(|s| s.id != id);
    save_json(&state, KEY_SUBS, &subs).await
}

pub async fn node_count(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    let subs = load_json::<Vec<Subscription>>(&state, KEY_SUBS).await.unwrap_or_default();
    let total: u32 = subs.iter().filter_map(|s| s.node_count).sum();
    Json(json!({ "total": total })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct BatchUpdateRequest {
    pub ids: Vec<String>,
}

/// 按给定订阅 id 列表重新拉取并回填各自的节点计数。
pub async fn batch_update_nodes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BatchUpdateRequest>,
) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    let mut subs = load_json::<Vec<Subscription>>(&state, KEY_SUBS).await.unwrap_or_default();
    let targets: Vec<Subscription> = subs.iter().filter(|s| req.ids.contains(&s.id)).cloned().collect();
    let fetched = crate::aggregate::fetch::fetch_all(&state.client, &targets).await;
    for fetched in fetched {
        if let Some(body) = fetched.body {
            let count = crate::parse::parse_body(&body).len() as u32;
            if let Some(sub) = subs.iter_mut().find(|s| s.id == fetched.subscription_id) {
                sub.node_count = Some(count);
            }
        }
    }
    save_json(&state, KEY_SUBS, &subs).await
}

pub async fn get_settings(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    Json(state.settings.read().clone()).into_response()
}

pub async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(settings): Json<crate::core::config::SubSettings>,
) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    let resp = save_json(&state, crate::storage::KEY_SETTINGS, &settings).await;
    if resp.status().is_success() {
        *state.settings.write() = settings;
    }
    resp
}

#[derive(Debug, Deserialize)]
pub struct LatencyTestRequest {
    pub subscription_ids: Vec<String>,
}

/// 粗粒度延迟探测:对每个订阅地址发起一次带超时的 HEAD 探测,失败记为 -1。
pub async fn latency_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LatencyTestRequest>,
) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    let subs = load_json::<Vec<Subscription>>(&state, KEY_SUBS).await.unwrap_or_default();
    let mut results = serde_json::Map::new();
    for sub in subs.iter().filter(|s| req.subscription_ids.contains(&s.id)) {
        let started = std::time::Instant::now();
        let latency = match tokio::time::timeout(std::time::Duration::from_secs(5), state.client.head(&sub.url).send()).await {
            Ok(Ok(resp)) if resp.status().is_success() => started.elapsed().as_millis() as i64,
            _ => -1,
        };
        results.insert(sub.id.clone(), json!(latency));
    }
    Json(results).into_response()
}

pub async fn storage_backend(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    Json(&state.config.storage).into_response()
}

pub async fn set_storage_backend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(config): Json<crate::core::config::StorageConfig>,
) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    save_json(&state, crate::storage::KEY_STORAGE_BACKEND, &config).await
}

/// 后端迁移的接口级占位:真实迁移需要把整份键空间从一个 `Storage` 实现搬到
/// 另一个,当前仅暴露触发点,迁移执行留给部署环境的运维脚本。
pub async fn storage_migrate(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    StatusCode::ACCEPTED.into_response()
}

pub async fn list_backups(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    let backups = load_json::<Vec<crate::model::SnapshotInfo>>(&state, KEY_BACKUPS).await.unwrap_or_default();
    Json(backups).into_response()
}

pub async fn create_backup(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    let subs = load_json::<Vec<Subscription>>(&state, KEY_SUBS).await.unwrap_or_default();
    let profiles = load_json::<Vec<Profile>>(&state, KEY_PROFILES).await.unwrap_or_default();
    let id = uuid::Uuid::new_v4().to_string();
    let snapshot = json!({ "subscriptions": subs, "profiles": profiles });
    if state.storage.put(&backup_data_key(&id), snapshot.to_string()).await.is_err() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let mut index = load_json::<Vec<crate::model::SnapshotInfo>>(&state, KEY_BACKUPS).await.unwrap_or_default();
    index.push(crate::model::SnapshotInfo {
        id: id.clone(),
        name: format!("backup-{id}"),
        created_at: chrono::Utc::now().timestamp(),
    });
    save_json(&state, KEY_BACKUPS, &index).await
}

pub async fn restore_backup(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(resp) = require_admin(&state, &headers).await {
        return resp;
    }
    let Ok(Some(raw)) = state.storage.get(&backup_data_key(&id)).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let Ok(snapshot): Result<serde_json::Value, _> = serde_json::from_str(&raw) else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    if let Some(subs) = snapshot.get("subscriptions") {
        let _ = state.storage.put(KEY_SUBS, subs.to_string()).await;
    }
    if let Some(profiles) = snapshot.get("profiles") {
        let _ = state.storage.put(KEY_PROFILES, profiles.to_string()).await;
    }
    StatusCode::OK.into_response()
}

async fn load_json<T: serde::de::DeserializeOwned>(state: &AppState, key: &str) -> Option<T> {
    let raw = state.storage.get(key).await.ok()??;
    serde_json::from_str(&raw).ok()
}

async fn save_json<T: Serialize>(state: &AppState, key: &str, value: &T) -> Response {
    let Ok(serialized) = serde_json::to_string(value) else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    match state.storage.put(key, serialized).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
