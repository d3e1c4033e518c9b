//! Clash 系发射器：Clash / ClashMeta / Mihomo / Stash / Shadowrocket 共享同一份 YAML 语法，
//! 以不同的支持矩阵与少量方言特有字段区分。`proxies:` 下每个条目依赖 serde 结构体字段的
//! 声明顺序来保证确定性 key 顺序，而非依赖 map 实现——这是唯一能在 `serde_yml` 下做到
//! 字节级稳定输出的办法（见 §9 "Emitter ordering"）。

use std::collections::HashMap;

use serde::Serialize;

use crate::core::error::{Result, SubError};
use crate::ir::{GrpcOpts, H2Opts, KcpOpts, Node, NodeKind, QuicOpts, RealityOpts, WsOpts};
use crate::util::parse_speed_mbps;

use super::EmitOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Clash,
    ClashMeta,
    Mihomo,
    Stash,
    Shadowrocket,
}

impl Dialect {
    fn target(self) -> super::Target {
        match self {
            Dialect::Clash => super::Target::Clash,
            Dialect::ClashMeta => super::Target::ClashMeta,
            Dialect::Mihomo => super::Target::Mihomo,
            Dialect::Stash => super::Target::Stash,
            Dialect::Shadowrocket => super::Target::Shadowrocket,
        }
    }

    fn allows_ss2022(self) -> bool {
        matches!(self, Dialect::ClashMeta | Dialect::Mihomo | Dialect::Stash)
    }
}

#[derive(Debug, Serialize)]
struct Doc {
    proxies: Vec<ClashProxy>,
}

/// 字段声明顺序即输出 key 顺序：`name, type, server, port`，随后是优先级列表。
#[derive(Debug, Serialize)]
struct ClashProxy {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    server: String,
    port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cipher: Option<String>,
    #[serde(rename = "alterId", skip_serializing_if = "Option::is_none")]
    alter_id: Option<u32>,
    tls: bool,
    #[serde(rename = "servername", skip_serializing_if = "Option::is_none")]
    sni: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alpn: Option<Vec<String>>,
    #[serde(rename = "skip-cert-verify", skip_serializing_if = "Option::is_none")]
    skip_cert_verify: Option<bool>,
    #[serde(rename = "client-fingerprint", skip_serializing_if = "Option::is_none")]
    client_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flow: Option<String>,
    #[serde(rename = "reality-opts", skip_serializing_if = "Option::is_none")]
    reality_opts: Option<RealityOpts>,
    #[serde(rename = "ws-opts", skip_serializing_if = "Option::is_none")]
    ws_opts: Option<WsOpts>,
    #[serde(rename = "grpc-opts", skip_serializing_if = "Option::is_none")]
    grpc_opts: Option<GrpcOpts>,
    #[serde(rename = "http-opts", skip_serializing_if = "Option::is_none")]
    http_opts: Option<HashMap<String, serde_yml::Value>>,
    #[serde(rename = "kcp-opts", skip_serializing_if = "Option::is_none")]
    kcp_opts: Option<KcpOpts>,
    #[serde(rename = "quic-opts", skip_serializing_if = "Option::is_none")]
    quic_opts: Option<QuicOpts>,

    // Protocol-specific tail, still declared in a stable order.
    #[serde(rename = "up", skip_serializing_if = "Option::is_none")]
    hy_up: Option<String>,
    #[serde(rename = "down", skip_serializing_if = "Option::is_none")]
    hy_down: Option<String>,
    #[serde(rename = "obfs", skip_serializing_if = "Option::is_none")]
    hy_obfs: Option<String>,
    #[serde(rename = "obfs-password", skip_serializing_if = "Option::is_none")]
    hy_obfs_password: Option<String>,
    #[serde(rename = "ports", skip_serializing_if = "Option::is_none")]
    hy_ports: Option<String>,
    #[serde(rename = "up-speed", skip_serializing_if = "Option::is_none")]
    stash_up_speed: Option<u64>,
    #[serde(rename = "down-speed", skip_serializing_if = "Option::is_none")]
    stash_down_speed: Option<u64>,

    #[serde(rename = "congestion-controller", skip_serializing_if = "Option::is_none")]
    tuic_congestion: Option<String>,
    #[serde(rename = "udp-relay-mode", skip_serializing_if = "Option::is_none")]
    tuic_udp_relay_mode: Option<String>,
}

pub fn emit(nodes: &[Node], dialect: Dialect, _opts: &EmitOptions) -> Result<String> {
    let target = dialect.target();
    let proxies: Vec<ClashProxy> = nodes
        .iter()
        .filter(|n| node_supported(n, dialect, target))
        .filter_map(|n| to_proxy(n, dialect))
        .collect();

    let doc = Doc { proxies };
    serde_yml::to_string(&doc).map_err(|e| SubError::EmitterFatal(e.to_string()))
}

fn node_supported(node: &Node, dialect: Dialect, target: super::Target) -> bool {
    if !target.supports(node.kind) {
        return false;
    }
    if dialect == Dialect::Clash
        && node.kind == NodeKind::Vless
        && (node.username.is_some() || node.reality_opts.is_some())
    {
        // Plain Clash excludes VLESS when `flow` (stored in `username`, see vless
        // parser) or reality-opts is present.
        return false;
    }
    if node.kind == NodeKind::Ss {
        if let Some(cipher) = &node.cipher {
            if cipher.starts_with("2022-blake3-") && !dialect.allows_ss2022() {
                return false;
            }
        }
    }
    true
}

fn to_proxy(node: &Node, dialect: Dialect) -> Option<ClashProxy> {
    let kind = node.kind.to_string();
    let ws_opts = node.ws_opts.as_ref().map(split_early_data);
    let http_opts = node.http_opts.as_ref().map(|h| {
        let mut map = HashMap::new();
        if let Some(path) = &h.path {
            map.insert("path".to_string(), serde_yml::to_value(path).unwrap_or_default());
        }
        if let Some(headers) = &h.headers {
            map.insert("headers".to_string(), serde_yml::to_value(headers).unwrap_or_default());
        }
        map
    });

    let (stash_up, stash_down) = if dialect == Dialect::Stash {
        (
            node.hysteria.as_ref().and_then(|h| h.up.as_deref()).and_then(parse_speed_mbps),
            node.hysteria.as_ref().and_then(|h| h.down.as_deref()).and_then(parse_speed_mbps),
        )
    } else {
        (None, None)
    };

    Some(ClashProxy {
        name: node.name.clone(),
        kind,
        server: node.server.clone(),
        port: node.port,
        password: node.password.clone(),
        uuid: node.uuid.clone(),
        // `username` doubles as the Vless `flow` carrier in the parser layer (see
        // parse::uri::vless), so keep it out of this generic slot for that kind.
        username: (node.kind != NodeKind::Vless).then(|| node.username.clone()).flatten(),
        cipher: node.cipher.clone(),
        alter_id: node.alter_id,
        tls: node.tls,
        sni: node.sni.clone(),
        alpn: node.alpn.clone(),
        skip_cert_verify: node.skip_cert_verify,
        client_fingerprint: node.client_fingerprint.clone(),
        network: node.network.map(|n| n.to_string()),
        flow: (node.kind == NodeKind::Vless).then(|| node.username.clone()).flatten(),
        reality_opts: node.reality_opts.clone(),
        ws_opts,
        grpc_opts: node.grpc_opts.clone(),
        http_opts,
        kcp_opts: node.kcp_opts.clone(),
        quic_opts: node.quic_opts.clone(),
        hy_up: node.hysteria.as_ref().and_then(|h| h.up.clone()),
        hy_down: node.hysteria.as_ref().and_then(|h| h.down.clone()),
        hy_obfs: node.hysteria.as_ref().and_then(|h| h.obfs.clone()),
        hy_obfs_password: node.hysteria.as_ref().and_then(|h| h.obfs_password.clone()),
        hy_ports: node.hysteria.as_ref().and_then(|h| h.ports.clone()),
        stash_up_speed: stash_up,
        stash_down_speed: stash_down,
        tuic_congestion: node.tuic.as_ref().and_then(|t| t.congestion_controller.clone()),
        tuic_udp_relay_mode: node.tuic.as_ref().and_then(|t| t.udp_relay_mode.clone()),
    })
}

/// Split a `path?ed=<n>` ws path into plain path plus `max-early-data`/header name.
fn split_early_data(opts: &WsOpts) -> WsOpts {
    let mut opts = opts.clone();
    if let Some(path) = &opts.path {
        if let Some((base, query)) = path.split_once("?ed=") {
            if let Ok(n) = query.parse::<u32>() {
                opts.path = Some(base.to_string());
                opts.max_early_data = Some(n);
                opts.early_data_header_name.get_or_insert_with(|| "Sec-WebSocket-Protocol".to_string());
            }
        }
    }
    opts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::NodeKind;

    fn ss_node() -> Node {
        Node::builder()
            .id(String::new())
            .name("A".to_string())
            .kind(NodeKind::Ss)
            .server("host".to_string())
            .port(443)
            .cipher("aes-128-gcm".to_string())
            .password("pw".to_string())
            .build()
    }

    #[test]
    fn emits_proxies_key_with_ordered_fields() {
        let yaml = emit(&[ss_node()], Dialect::Clash, &EmitOptions::default()).unwrap();
        let name_pos = yaml.find("name:").unwrap();
        let type_pos = yaml.find("type:").unwrap();
        let server_pos = yaml.find("server:").unwrap();
        assert!(name_pos < type_pos && type_pos < server_pos);
    }

    #[test]
    fn plain_clash_drops_2022_blake3_cipher() {
        let mut node = ss_node();
        node.cipher = Some("2022-blake3-aes-128-gcm".to_string());
        let yaml = emit(&[node], Dialect::Clash, &EmitOptions::default()).unwrap();
        assert!(!yaml.contains("2022-blake3"));
    }

    #[test]
    fn meta_keeps_2022_blake3_cipher() {
        let mut node = ss_node();
        node.cipher = Some("2022-blake3-aes-128-gcm".to_string());
        let yaml = emit(&[node], Dialect::ClashMeta, &EmitOptions::default()).unwrap();
        assert!(yaml.contains("2022-blake3"));
    }

    #[test]
    fn clash_drops_vless_with_reality() {
        let node = Node::builder()
            .id(String::new())
            .name("R".to_string())
            .kind(NodeKind::Vless)
            .server("h".to_string())
            .port(443)
            .uuid("u".to_string())
            .reality_opts(RealityOpts::default())
            .build();
        let yaml = emit(&[node], Dialect::Clash, &EmitOptions::default()).unwrap();
        assert!(!yaml.contains("name: R"));
    }

    #[test]
    fn emits_kcp_opts() {
        let mut node = ss_node();
        node.network = Some(crate::ir::Network::Kcp);
        node.kcp_opts = Some(KcpOpts {
            seed: Some("seed".to_string()),
            header_type: Some("none".to_string()),
        });
        let yaml = emit(&[node], Dialect::ClashMeta, &EmitOptions::default()).unwrap();
        assert!(yaml.contains("kcp-opts"));
        assert!(yaml.contains("seed"));
    }
}
