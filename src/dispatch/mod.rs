//! HTTP 派发层：订阅分发路由 + 管理接口 (§6)。

pub mod admin;
pub mod auth;
pub mod sub;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use parking_lot::RwLock;

use crate::core::config::{AppConfig, SubSettings};
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub client: reqwest::Client,
    pub config: Arc<AppConfig>,
    /// Live copy of `config.settings`, updated in place by `admin::update_settings`
    /// so a token rotation takes effect without a process restart.
    pub settings: Arc<RwLock<SubSettings>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sub/{token}", get(sub::handle_sub))
        .route("/sub/{token}/{profile_custom_id}", get(sub::handle_sub_profile))
        .route("/api/system/status", get(admin::system_status))
        .route("/api/system/setup", post(admin::system_setup))
        .route("/api/login", post(admin::login))
        .route("/api/logout", post(admin::logout))
        .route("/api/data", get(admin::get_data))
        .route("/api/subs", get(admin::list_subs).post(admin::upsert_sub))
        .route("/api/subs/{id}", axum::routing::delete(admin::delete_sub))
        .route("/api/node_count", get(admin::node_count))
        .route("/api/batch_update_nodes", post(admin::batch_update_nodes))
        .route("/api/settings", get(admin::get_settings).post(admin::update_settings))
        .route("/api/latency_test", post(admin::latency_test))
        .route("/api/storage/backend", get(admin::storage_backend).post(admin::set_storage_backend))
        .route("/api/storage/migrate", post(admin::storage_migrate))
        .route("/api/backup", get(admin::list_backups).post(admin::create_backup))
        .route("/api/backup/{id}/restore", post(admin::restore_backup))
        .with_state(state)
}
