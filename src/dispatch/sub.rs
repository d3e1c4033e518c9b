//! `/sub/<token>[/<profile-custom-id>]` 订阅分发处理器 (§4.7, §6)。

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::aggregate::{self, AggregationRequest};
use crate::emit::{self, EmitOptions, Target};
use crate::model::{Profile, Subscription};
use crate::storage::{KEY_PROFILES, KEY_SUBS};

use super::AppState;
use super::auth::{TokenScope, resolve_token_scope};

#[derive(Debug, Deserialize)]
pub struct SubQuery {
    pub target: Option<String>,
    #[serde(rename = "_internal", default)]
    pub internal: bool,
}

pub async fn handle_sub(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    Query(query): Query<SubQuery>,
) -> Response {
    respond(state, token, None, headers, query).await
}

pub async fn handle_sub_profile(
    State(state): State<AppState>,
    Path((token, profile_custom_id)): Path<(String, String)>,
    headers: HeaderMap,
    Query(query): Query<SubQuery>,
) -> Response {
    respond(state, token, Some(profile_custom_id), headers, query).await
}

async fn respond(
    state: AppState,
    token: String,
    profile_custom_id: Option<String>,
    headers: HeaderMap,
    query: SubQuery,
) -> Response {
    let settings = state.settings.read().clone();
    let settings = &settings;
    let Some(scope) = resolve_token_scope(settings, &token) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if profile_custom_id.is_none() && scope == TokenScope::ProfileOnly {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let subs: Vec<Subscription> = load_json(&state, KEY_SUBS).await.unwrap_or_default();
    let profiles: Vec<Profile> = load_json(&state, KEY_PROFILES).await.unwrap_or_default();

    let (active_subs, manual_nodes, profile_expires_at, file_stub) = match &profile_custom_id {
        Some(custom_id) => {
            let Some(profile) = profiles.iter().find(|p| &p.custom_id == custom_id && p.enabled) else {
                return StatusCode::NOT_FOUND.into_response();
            };
            let active: Vec<Subscription> = subs
                .iter()
                .filter(|s| profile.subscriptions.contains(&s.id))
                .cloned()
                .collect();
            (active, profile.manual_nodes.clone(), profile.expires_at, profile.name.clone())
        }
        None => {
            let manual: Vec<String> = subs.iter().filter(|s| s.is_manual()).map(|s| s.url.clone()).collect();
            let active: Vec<Subscription> = subs.iter().filter(|s| !s.is_manual()).cloned().collect();
            (active, manual, None, settings.file_name.clone())
        }
    };

    let now_unix = chrono::Utc::now().timestamp();
    let target = resolve_target(
        query.target.as_deref(),
        headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()),
    );

    // §4.7 step 6: hand complex formats to an external converter unless this
    // request already *is* the internal callback (guarded by `_internal`).
    if !target.is_simple() && !query.internal && state.config.external_converter.enabled {
        if let Some(base_url) = &state.config.external_converter.url {
            let path_suffix = profile_custom_id
                .as_deref()
                .map(|id| format!("/{id}"))
                .unwrap_or_default();
            let callback = aggregate::build_internal_callback_url(&format!("{base_url}/sub/{token}{path_suffix}"));
            if let Ok(resp) = state.client.get(&callback).send().await {
                if resp.status().is_success() {
                    if let Ok(body) = resp.text().await {
                        return (StatusCode::OK, body).into_response();
                    }
                }
            }
        }
    }

    let result = aggregate::resolve(
        &state.client,
        AggregationRequest {
            subscriptions: &active_subs,
            manual_nodes: &manual_nodes,
            settings,
            now_unix,
            profile_expires_at,
        },
    )
    .await;

    let body = match emit::emit(target, &result.nodes, &EmitOptions::default()) {
        Ok(body) => body,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    let mut response = (StatusCode::OK, body).into_response();
    let resp_headers = response.headers_mut();
    resp_headers.insert(header::CONTENT_TYPE, content_type());
    resp_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store, no-cache"));
    if let Some(value) = content_disposition(&file_stub) {
        resp_headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Some(header_value) = result.user_info.as_ref().and_then(|i| i.to_header_value()) {
        if let Ok(value) = HeaderValue::from_str(&header_value) {
            resp_headers.insert("subscription-userinfo", value);
        }
    }
    response
}

fn resolve_target(query_target: Option<&str>, user_agent: Option<&str>) -> Target {
    if let Some(target) = query_target.and_then(Target::parse_query) {
        return target;
    }
    if let Some(target) = user_agent.and_then(Target::from_user_agent) {
        return target;
    }
    Target::Base64
}

/// §6 fixes this unconditionally: every target is delivered as plain text,
/// regardless of the underlying format's own MIME type.
fn content_type() -> HeaderValue {
    HeaderValue::from_static("text/plain; charset=utf-8")
}

fn content_disposition(name: &str) -> Option<HeaderValue> {
    let encoded = urlencoding::encode(name);
    HeaderValue::from_str(&format!("inline; filename*=utf-8''{encoded}")).ok()
}

async fn load_json<T: serde::de::DeserializeOwned>(state: &AppState, key: &str) -> Option<T> {
    let raw = state.storage.get(key).await.ok()??;
    serde_json::from_str(&raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_target_wins_over_user_agent() {
        let target = resolve_target(Some("clash"), Some("v2rayNG/1.0"));
        assert_eq!(target, Target::Clash);
    }

    #[test]
    fn falls_back_to_user_agent_table() {
        let target = resolve_target(None, Some("Clash.Meta/v1.19.19"));
        assert_eq!(target, Target::Mihomo);
    }

    #[test]
    fn defaults_to_base64_when_nothing_matches() {
        let target = resolve_target(None, None);
        assert_eq!(target, Target::Base64);
    }
}
