//! Sing-box 发射器：输出 outbound 对象的 JSON 数组（§4.6）。

use serde_json::{Value, json};

use crate::core::error::{Result, SubError};
use crate::ir::{Network, Node, NodeKind};

use super::EmitOptions;

pub fn emit(nodes: &[Node], opts: &EmitOptions) -> Result<String> {
    let outbounds: Vec<Value> = nodes
        .iter()
        .filter(|n| super::Target::Singbox.supports(n.kind) || opts.include_unsupported_proxy)
        .filter_map(to_outbound)
        .collect();

    serde_json::to_string_pretty(&outbounds).map_err(|e| SubError::EmitterFatal(e.to_string()))
}

fn map_type(kind: NodeKind) -> Option<&'static str> {
    match kind {
        NodeKind::Ss => Some("shadowsocks"),
        NodeKind::Vmess => Some("vmess"),
        NodeKind::Vless => Some("vless"),
        NodeKind::Trojan => Some("trojan"),
        NodeKind::Hysteria => Some("hysteria"),
        NodeKind::Hysteria2 => Some("hysteria2"),
        NodeKind::Tuic => Some("tuic"),
        NodeKind::Wireguard => Some("wireguard"),
        NodeKind::Socks5 => Some("socks"),
        NodeKind::Http | NodeKind::Https => Some("http"),
        _ => None,
    }
}

fn tls_block(node: &Node) -> Option<Value> {
    if !node.tls {
        return None;
    }
    let mut block = json!({
        "enabled": true,
        "server_name": node.sni.clone().unwrap_or_default(),
        "insecure": node.skip_cert_verify.unwrap_or(false),
    });
    if let Some(alpn) = &node.alpn {
        block["alpn"] = json!(alpn);
    }
    if let Some(fp) = &node.client_fingerprint {
        block["utls"] = json!({"enabled": true, "fingerprint": fp});
    }
    if let Some(reality) = &node.reality_opts {
        block["reality"] = json!({
            "enabled": true,
            "public_key": reality.public_key.clone().unwrap_or_default(),
            "short_id": reality.short_id.clone().unwrap_or_default(),
        });
    }
    Some(block)
}

fn transport_block(node: &Node) -> Option<Value> {
    match node.network? {
        Network::Ws => {
            let opts = node.ws_opts.as_ref()?;
            Some(json!({
                "type": "ws",
                "path": opts.path.clone().unwrap_or_else(|| "/".to_string()),
                "headers": opts.headers.clone().unwrap_or_default(),
            }))
        }
        Network::Grpc => {
            let opts = node.grpc_opts.as_ref()?;
            Some(json!({
                "type": "grpc",
                "service_name": opts.service_name.clone().unwrap_or_default(),
            }))
        }
        Network::H2 => {
            let opts = node.h2_opts.as_ref()?;
            Some(json!({
                "type": "http",
                "path": opts.path.clone().unwrap_or_default(),
                "host": opts.host.clone().unwrap_or_default(),
            }))
        }
        Network::Http => {
            let opts = node.http_opts.as_ref()?;
            Some(json!({
                "type": "http",
                "path": opts.path.clone().unwrap_or_default(),
                "headers": opts.headers.clone().unwrap_or_default(),
            }))
        }
        Network::Tcp | Network::Kcp | Network::Quic => None,
    }
}

fn to_outbound(node: &Node) -> Option<Value> {
    let kind = map_type(node.kind)?;
    let mut out = json!({
        "type": kind,
        "tag": node.name,
        "server": node.server,
        "server_port": node.port,
    });

    match node.kind {
        NodeKind::Ss => {
            out["method"] = json!(node.cipher.clone().unwrap_or_else(|| "aes-128-gcm".to_string()));
            out["password"] = json!(node.password.clone().unwrap_or_default());
        }
        NodeKind::Vmess => {
            out["uuid"] = json!(node.uuid.clone().unwrap_or_default());
            out["alter_id"] = json!(node.alter_id.unwrap_or(0));
            out["security"] = json!(node.cipher.clone().unwrap_or_else(|| "auto".to_string()));
        }
        NodeKind::Vless => {
            out["uuid"] = json!(node.uuid.clone().unwrap_or_default());
        }
        NodeKind::Trojan => {
            out["password"] = json!(node.password.clone().unwrap_or_default());
        }
        NodeKind::Hysteria | NodeKind::Hysteria2 => {
            out["password"] = json!(node.password.clone().unwrap_or_default());
            if let Some(h) = &node.hysteria {
                if let Some(up) = &h.up {
                    out["up_mbps"] = json!(crate::util::parse_speed_mbps(up).unwrap_or(0));
                }
                if let Some(down) = &h.down {
                    out["down_mbps"] = json!(crate::util::parse_speed_mbps(down).unwrap_or(0));
                }
                if let Some(obfs) = &h.obfs {
                    out["obfs"] = json!({"type": obfs, "password": h.obfs_password.clone().unwrap_or_default()});
                }
            }
        }
        NodeKind::Tuic => {
            out["uuid"] = json!(node.uuid.clone().unwrap_or_default());
            out["password"] = json!(node.password.clone().unwrap_or_default());
            if let Some(t) = &node.tuic {
                out["congestion_control"] = json!(t.congestion_controller.clone().unwrap_or_else(|| "bbr".to_string()));
            }
        }
        NodeKind::Wireguard => {
            out["private_key"] = json!(node.private_key.clone().unwrap_or_default());
            if let Some(wg) = &node.wireguard {
                out["local_address"] = json!(
                    [wg.ip.clone(), wg.ipv6.clone()].into_iter().flatten().collect::<Vec<_>>()
                );
                out["mtu"] = json!(wg.mtu.unwrap_or(1420));
                if let Some(peer) = wg.peers.first() {
                    out["peer_public_key"] = json!(peer.public_key.clone().unwrap_or_default());
                    if let Some(psk) = &peer.pre_shared_key {
                        out["pre_shared_key"] = json!(psk);
                    }
                }
            }
        }
        NodeKind::Socks5 => {
            if let Some(u) = &node.username {
                out["username"] = json!(u);
            }
            if let Some(p) = &node.password {
                out["password"] = json!(p);
            }
        }
        NodeKind::Http | NodeKind::Https => {
            if let Some(u) = &node.username {
                out["username"] = json!(u);
            }
            if let Some(p) = &node.password {
                out["password"] = json!(p);
            }
        }
        _ => {}
    }

    if let Some(tls) = tls_block(node) {
        out["tls"] = tls;
    }
    if let Some(transport) = transport_block(node) {
        out["transport"] = transport;
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::NodeKind;

    #[test]
    fn maps_ss_to_shadowsocks() {
        let node = Node::builder()
            .id(String::new())
            .name("A".to_string())
            .kind(NodeKind::Ss)
            .server("h".to_string())
            .port(1)
            .cipher("aes-128-gcm".to_string())
            .password("pw".to_string())
            .build();
        let json = emit(&[node], &EmitOptions::default()).unwrap();
        assert!(json.contains("\"shadowsocks\""));
    }

    #[test]
    fn unsupported_kind_dropped_silently() {
        let node = Node::builder()
            .id(String::new())
            .name("A".to_string())
            .kind(NodeKind::Snell)
            .server("h".to_string())
            .port(1)
            .build();
        let json = emit(&[node], &EmitOptions::default()).unwrap();
        assert_eq!(json.trim(), "[]");
    }
}
