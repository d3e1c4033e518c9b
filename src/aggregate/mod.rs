//! 聚合驱动:把一次订阅分发请求解析为最终节点集合(§4.7)。

pub mod fetch;

use crate::core::config::SubSettings;
use crate::ir::{Node, NodeKind};
use crate::model::{Subscription, UserInfo};
use crate::normalize::normalize;
use crate::parse;
use crate::process::{self, ProcessOptions};

pub struct AggregationRequest<'a> {
    pub subscriptions: &'a [Subscription],
    pub manual_nodes: &'a [String],
    pub settings: &'a SubSettings,
    pub now_unix: i64,
    pub profile_expires_at: Option<i64>,
}

pub struct AggregationResult {
    pub nodes: Vec<Node>,
    pub user_info: Option<UserInfo>,
}

/// §4.7 步骤 2-3,5:计算节点集合与聚合流量头。到达此处前请求目标已解析完毕
/// (参见 `crate::emit::Target::from_user_agent`/`parse_query`)。
pub async fn resolve(client: &reqwest::Client, req: AggregationRequest<'_>) -> AggregationResult {
    if let Some(expires_at) = req.profile_expires_at {
        if expires_at < req.now_unix {
            return AggregationResult {
                nodes: vec![expired_sentinel(expires_at)],
                user_info: None,
            };
        }
    }

    let manual: Vec<Node> = req
        .manual_nodes
        .iter()
        .filter_map(|raw| parse::parse_manual_node(raw))
        .map(normalize)
        .collect();

    let fetched = fetch::fetch_all(client, req.subscriptions).await;
    let mut per_sub_user_info = Vec::new();
    let mut subscription_nodes = Vec::new();

    for (sub, fetched) in req.subscriptions.iter().zip(fetched.iter()) {
        if sub.is_manual() || !sub.enabled {
            continue;
        }
        let Some(body) = &fetched.body else { continue };
        let nodes: Vec<Node> = parse::parse_body(body).into_iter().map(normalize).collect();
        let opts = ProcessOptions {
            legacy_exclude: sub.exclude.clone(),
            dedupe: false,
            prepend_sub_name: req.settings.prepend_sub_name,
            subscription_name: Some(sub.name.clone()),
            ..Default::default()
        };
        subscription_nodes.extend(process::process(nodes, &opts));
        if let Some(info) = &sub.user_info {
            per_sub_user_info.push(info.clone());
        }
    }

    let mut all = manual;
    all.extend(subscription_nodes);

    let final_opts = ProcessOptions {
        dedupe: req.settings.dedupe,
        ..Default::default()
    };
    let nodes = process::process(all, &final_opts);

    AggregationResult {
        nodes,
        user_info: UserInfo::aggregate(per_sub_user_info.iter()),
    }
}

fn expired_sentinel(expires_at: i64) -> Node {
    Node::builder()
        .id("expired-sentinel".to_string())
        .name(format!("Profile expired at {expires_at}"))
        .kind(NodeKind::Trojan)
        .server("expired.invalid".to_string())
        .port(443)
        .password("expired".to_string())
        .build()
}

/// §4.7 步骤 6:构造回指本请求的内部回调 URL,`_internal=true` 阻断递归。
pub fn build_internal_callback_url(base_sub_url: &str) -> String {
    let separator = if base_sub_url.contains('?') { '&' } else { '?' };
    format!("{base_sub_url}{separator}target=base64&_internal=true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_url_sets_internal_flag() {
        let url = build_internal_callback_url("https://host/sub/token");
        assert!(url.ends_with("?target=base64&_internal=true"));
    }

    #[test]
    fn callback_url_appends_with_ampersand_when_query_present() {
        let url = build_internal_callback_url("https://host/sub/token?target=clash");
        assert!(url.ends_with("&target=base64&_internal=true"));
    }

    #[tokio::test]
    async fn expired_profile_yields_sentinel_without_fetch() {
        let client = reqwest::Client::new();
        let settings = SubSettings::default();
        let req = AggregationRequest {
            subscriptions: &[],
            manual_nodes: &[],
            settings: &settings,
            now_unix: 1000,
            profile_expires_at: Some(500),
        };
        let result = resolve(&client, req).await;
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.nodes[0].kind, NodeKind::Trojan);
    }
}
