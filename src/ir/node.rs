//! 代理节点中间表示 (Proxy Intermediate Representation)
//!
//! 所有解析器的输出、标准化器与处理器的操作对象、以及所有发射器的输入，
//! 都是这个画布：一个打了 `kind` 标签的记录，属性按层级分组。除
//! `id, name, kind, server, port` 外所有属性均为可选。

use std::collections::HashMap;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// 节点协议判别式，封闭集合
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Ss,
    Ssr,
    Vmess,
    Vless,
    Trojan,
    Hysteria,
    Hysteria2,
    Tuic,
    Wireguard,
    Snell,
    Anytls,
    Naive,
    Socks5,
    Http,
    Https,
    Ssh,
    External,
    Direct,
    Reject,
}

/// 传输层协议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Tcp,
    Ws,
    Grpc,
    H2,
    Http,
    Kcp,
    Quic,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct RealityOpts {
    pub public_key: Option<String>,
    pub short_id: Option<String>,
    pub spider_x: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct WsOpts {
    pub path: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub max_early_data: Option<u32>,
    pub early_data_header_name: Option<String>,
    /// `net=httpupgrade` folds into `network=ws` with this flag set (§4.2).
    #[serde(rename = "v2ray-http-upgrade", skip_serializing_if = "Option::is_none")]
    pub v2ray_http_upgrade: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct GrpcOpts {
    pub service_name: Option<String>,
    pub grpc_type: Option<String>,
    pub authority: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct H2Opts {
    pub path: Option<String>,
    pub host: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct HttpOpts {
    pub path: Option<Vec<String>>,
    pub headers: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct KcpOpts {
    pub seed: Option<String>,
    pub header_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct QuicOpts {
    pub seed: Option<String>,
    pub header_type: Option<String>,
    pub security: Option<String>,
    pub key: Option<String>,
}

/// Hysteria v1/v2 共享的协议特定字段
#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct HysteriaOpts {
    pub up: Option<String>,
    pub down: Option<String>,
    pub obfs: Option<String>,
    pub obfs_password: Option<String>,
    /// 端口跳跃规范字符串 (`N`, `N-M`, 或逗号/分号列表)
    pub ports: Option<String>,
    pub recv_window_conn: Option<u64>,
    pub recv_window: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct TuicOpts {
    pub congestion_controller: Option<String>,
    pub udp_relay_mode: Option<String>,
    pub reduce_rtt: Option<bool>,
    pub max_udp_relay_packet_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct WireGuardPeer {
    pub endpoint: Option<String>,
    pub public_key: Option<String>,
    pub pre_shared_key: Option<String>,
    pub allowed_ips: Option<Vec<String>>,
    pub reserved: Option<[u8; 3]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct WireGuardOpts {
    pub ip: Option<String>,
    pub ipv6: Option<String>,
    pub mtu: Option<u32>,
    pub reserved: Option<[u8; 3]>,
    #[builder(default)]
    pub peers: Vec<WireGuardPeer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct SnellOpts {
    pub version: Option<u32>,
    pub obfs_opts: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
pub struct SsOpts {
    pub plugin: Option<String>,
    pub plugin_opts: Option<HashMap<String, String>>,
}

/// 代理节点中间表示 (Canonical Node / IR)
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
pub struct Node {
    // --- Identity ---
    #[builder(into)]
    pub id: String,
    #[builder(into)]
    pub name: String,
    pub kind: NodeKind,

    // --- Endpoint ---
    #[builder(into)]
    pub server: String,
    pub port: u16,

    // --- Auth / secret ---
    pub password: Option<String>,
    pub uuid: Option<String>,
    pub username: Option<String>,
    pub cipher: Option<String>,
    pub alter_id: Option<u32>,
    pub token: Option<String>,
    pub auth: Option<String>,
    pub private_key: Option<String>,
    pub public_key: Option<String>,
    pub pre_shared_key: Option<String>,

    // --- TLS ---
    #[builder(default)]
    pub tls: bool,
    pub sni: Option<String>,
    pub alpn: Option<Vec<String>>,
    pub skip_cert_verify: Option<bool>,
    pub client_fingerprint: Option<String>,
    pub tls_fingerprint: Option<String>,
    pub reality_opts: Option<RealityOpts>,

    // --- Transport ---
    pub network: Option<Network>,
    pub ws_opts: Option<WsOpts>,
    pub grpc_opts: Option<GrpcOpts>,
    pub h2_opts: Option<H2Opts>,
    pub http_opts: Option<HttpOpts>,
    pub kcp_opts: Option<KcpOpts>,
    pub quic_opts: Option<QuicOpts>,

    // --- Protocol-specific ---
    pub hysteria: Option<HysteriaOpts>,
    pub tuic: Option<TuicOpts>,
    pub wireguard: Option<WireGuardOpts>,
    pub snell: Option<SnellOpts>,
    pub ss: Option<SsOpts>,

    // --- Platform hints ---
    pub udp: Option<bool>,
    pub tfo: Option<bool>,
    pub mptcp: Option<bool>,
    pub ip_version: Option<String>,
    pub underlying_proxy: Option<String>,
    pub test_url: Option<String>,
}

impl Node {
    /// 派生出用于去重的指纹：type|server|port|uuid-or-password|network|path|service-name
    pub fn fingerprint(&self) -> String {
        let secret = self
            .uuid
            .as_deref()
            .or(self.password.as_deref())
            .unwrap_or("");
        let path = match self.network {
            Some(Network::Ws) => self
                .ws_opts
                .as_ref()
                .and_then(|o| o.path.as_deref())
                .unwrap_or(""),
            _ => "",
        };
        let service_name = match self.network {
            Some(Network::Grpc) => self
                .grpc_opts
                .as_ref()
                .and_then(|o| o.service_name.as_deref())
                .unwrap_or(""),
            _ => "",
        };
        let network = self
            .network
            .map(|n| n.to_string())
            .unwrap_or_else(|| "tcp".to_string());

        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.kind, self.server, self.port, secret, network, path, service_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_name() {
        let a = Node::builder()
            .id("a")
            .name("A")
            .kind(NodeKind::Ss)
            .server("example.com")
            .port(443)
            .password("pw".to_string())
            .build();
        let b = Node::builder()
            .id("b")
            .name("B")
            .kind(NodeKind::Ss)
            .server("example.com")
            .port(443)
            .password("pw".to_string())
            .build();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_distinguishes_ws_path() {
        let mut a = Node::builder()
            .id("a")
            .name("A")
            .kind(NodeKind::Vless)
            .server("example.com")
            .port(443)
            .uuid("u".to_string())
            .network(Network::Ws)
            .build();
        a.ws_opts = Some(WsOpts {
            path: Some("/a".into()),
            ..Default::default()
        });
        let mut b = a.clone();
        b.ws_opts = Some(WsOpts {
            path: Some("/b".into()),
            ..Default::default()
        });
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
