//! 持久化记录：订阅清单、Profile、以及聚合驱动产出的流量信息（§3, §6）。

use serde::{Deserialize, Serialize};

/// 输入清单条目。`url` 以 `http(s)://` 开头代表上游订阅地址；否则该字段本身
/// 就是一条原始节点编码（"手动节点"）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub node_count: Option<u32>,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
    /// 旧式单字符串排除规则：按行切分，`keep:` 前缀行归入 include。
    #[serde(default)]
    pub exclude: Option<String>,
    #[serde(default)]
    pub last_notified_expire: Option<i64>,
    #[serde(default)]
    pub last_notified_traffic: Option<i64>,
}

impl Subscription {
    pub fn is_manual(&self) -> bool {
        !(self.url.starts_with("http://") || self.url.starts_with("https://"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    pub upload: u64,
    pub download: u64,
    pub total: u64,
    pub expire: i64,
}

impl UserInfo {
    /// 合并一组子订阅流量信息：总量求和，`expire` 取最小正值（§4.7 步骤 3）。
    pub fn aggregate<'a>(items: impl IntoIterator<Item = &'a UserInfo>) -> Option<UserInfo> {
        let mut acc = UserInfo::default();
        let mut seen = false;
        let mut min_expire: Option<i64> = None;
        for info in items {
            seen = true;
            acc.upload += info.upload;
            acc.download += info.download;
            acc.total += info.total;
            if info.expire > 0 {
                min_expire = Some(min_expire.map_or(info.expire, |m| m.min(info.expire)));
            }
        }
        if !seen {
            return None;
        }
        acc.expire = min_expire.unwrap_or(0);
        Some(acc)
    }

    /// 渲染为 `Subscription-UserInfo` 头，仅包含正值字段（§6）。
    pub fn to_header_value(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.upload > 0 {
            parts.push(format!("upload={}", self.upload));
        }
        if self.download > 0 {
            parts.push(format!("download={}", self.download));
        }
        if self.total > 0 {
            parts.push(format!("total={}", self.total));
        }
        if self.expire > 0 {
            parts.push(format!("expire={}", self.expire));
        }
        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

/// 一组订阅与手动节点组成的具名子集，通过独立 URL 路径访问。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub custom_id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub subscriptions: Vec<String>,
    #[serde(default)]
    pub manual_nodes: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Profile {
    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.expires_at.is_some_and(|exp| exp < now_unix)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_node_detected_by_scheme() {
        let sub = Subscription {
            id: "1".into(),
            name: "n".into(),
            url: "ss://abc#Node".into(),
            enabled: true,
            node_count: None,
            user_info: None,
            exclude: None,
            last_notified_expire: None,
            last_notified_traffic: None,
        };
        assert!(sub.is_manual());
    }

    #[test]
    fn aggregate_takes_minimum_positive_expire() {
        let a = UserInfo { upload: 1, download: 2, total: 10, expire: 100 };
        let b = UserInfo { upload: 1, download: 2, total: 10, expire: 50 };
        let merged = UserInfo::aggregate([&a, &b]).unwrap();
        assert_eq!(merged.expire, 50);
        assert_eq!(merged.upload, 2);
    }

    #[test]
    fn expired_profile_detected() {
        let profile = Profile {
            id: "1".into(),
            name: "p".into(),
            custom_id: "abc".into(),
            enabled: true,
            subscriptions: vec![],
            manual_nodes: vec![],
            expires_at: Some(100),
        };
        assert!(profile.is_expired(200));
        assert!(!profile.is_expired(50));
    }
}
