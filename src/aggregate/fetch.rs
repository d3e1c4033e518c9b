//! 并发抓取上游订阅:每次抓取有 30 秒截止时间,实现为抓取与计时器的赛跑;
//! 超时贡献一个空结果而非请求失败(§5)。完成顺序不保证,但结果按订阅列表
//! 顺序重新拼接(§5 "Ordering guarantees")。

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::model::Subscription;

/// 发往上游的固定 User-Agent,使上游按 Clash 格式返回主体(§6)。
pub const UPSTREAM_USER_AGENT: &str = "Clash.Meta/v1.19.19";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONCURRENT_FETCHES: usize = 16;

pub struct FetchedBody {
    pub subscription_id: String,
    pub body: Option<String>,
}

/// 并发抓取所有启用的 http(s) 订阅;单个失败记录日志并贡献空结果。
pub async fn fetch_all(client: &reqwest::Client, subscriptions: &[Subscription]) -> Vec<FetchedBody> {
    let indexed: Vec<(usize, &Subscription)> = subscriptions
        .iter()
        .enumerate()
        .filter(|(_, s)| s.enabled && !s.is_manual())
        .collect();

    let mut results: Vec<Option<FetchedBody>> = vec![None; subscriptions.len()];
    let fetches = stream::iter(indexed.into_iter().map(|(idx, sub)| {
        let client = client.clone();
        async move {
            let body = fetch_one(&client, &sub.url).await;
            (idx, sub.id.clone(), body)
        }
    }))
    .buffer_unordered(MAX_CONCURRENT_FETCHES);

    let completed: Vec<(usize, String, Option<String>)> = fetches.collect().await;
    for (idx, id, body) in completed {
        results[idx] = Some(FetchedBody { subscription_id: id, body });
    }

    // Manual-node entries never reach this far; leave their slot as an explicit
    // empty contribution so index alignment with `subscriptions` is preserved.
    subscriptions
        .iter()
        .enumerate()
        .map(|(idx, sub)| {
            results[idx].take().unwrap_or(FetchedBody {
                subscription_id: sub.id.clone(),
                body: None,
            })
        })
        .collect()
}

async fn fetch_one(client: &reqwest::Client, url: &str) -> Option<String> {
    let request = client
        .get(url)
        .header(reqwest::header::USER_AGENT, UPSTREAM_USER_AGENT)
        .send();

    match tokio::time::timeout(FETCH_TIMEOUT, request).await {
        Ok(Ok(resp)) if resp.status().is_success() => resp.text().await.ok(),
        Ok(Ok(resp)) => {
            warn!(status = %resp.status(), url, "upstream fetch returned non-2xx");
            None
        }
        Ok(Err(err)) => {
            warn!(%err, url, "upstream fetch failed");
            None
        }
        Err(_) => {
            warn!(url, "upstream fetch timed out after 30s");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_subscription_never_fetched() {
        let subs = vec![Subscription {
            id: "1".into(),
            name: "n".into(),
            url: "https://example.invalid/sub".into(),
            enabled: false,
            node_count: None,
            user_info: None,
            exclude: None,
            last_notified_expire: None,
            last_notified_traffic: None,
        }];
        let client = reqwest::Client::new();
        let out = fetch_all(&client, &subs).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].body.is_none());
    }
}
