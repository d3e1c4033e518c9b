//! Loon 发射器：与 Surge 同构的行语法，`transport=` 取代 `ws=true`，
//! WireGuard 用内联 `peers=[{...}]` 而非独立小节（§4.6、SPEC_FULL 的 Loon WireGuard 说明）。

use crate::ir::{Network, Node, NodeKind};

use super::{EmitOptions, Target, alpn_csv, quote_if_needed};

pub fn emit(nodes: &[Node], opts: &EmitOptions) -> String {
    nodes
        .iter()
        .filter(|n| Target::Loon.supports(n.kind) || opts.include_unsupported_proxy)
        .filter_map(encode_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn encode_line(node: &Node) -> Option<String> {
    let name = quote_if_needed(&node.name);
    let mut fields = vec![name, type_word(node.kind)?.to_string(), node.server.clone(), node.port.to_string()];

    match node.kind {
        NodeKind::Ss | NodeKind::Ssr => {
            push_kv(&mut fields, "password", node.password.as_deref());
        }
        NodeKind::Vmess | NodeKind::Vless => {
            push_kv(&mut fields, "id", node.uuid.as_deref());
            if node.tls {
                fields.push("over-tls=true".to_string());
            }
        }
        NodeKind::Trojan => {
            push_kv(&mut fields, "password", node.password.as_deref());
        }
        NodeKind::Hysteria2 => {
            push_kv(&mut fields, "password", node.password.as_deref());
        }
        NodeKind::Tuic => {
            push_kv(&mut fields, "uuid", node.uuid.as_deref());
            push_kv(&mut fields, "password", node.password.as_deref());
        }
        NodeKind::Wireguard => {
            let wg = node.wireguard.as_ref()?;
            let peer = wg.peers.first();
            let endpoint = peer.and_then(|p| p.endpoint.clone()).unwrap_or_default();
            let pubkey = peer.and_then(|p| p.public_key.clone()).unwrap_or_default();
            fields.push(format!(
                "private-key={},interface-ip={},peers=[{{public-key={},endpoint={}}}]",
                node.private_key.clone().unwrap_or_default(),
                wg.ip.clone().unwrap_or_default(),
                pubkey,
                endpoint,
            ));
        }
        NodeKind::Socks5 => {
            push_kv(&mut fields, "username", node.username.as_deref());
            push_kv(&mut fields, "password", node.password.as_deref());
        }
        NodeKind::Http => {
            push_kv(&mut fields, "username", node.username.as_deref());
            push_kv(&mut fields, "password", node.password.as_deref());
        }
        NodeKind::Snell => {
            push_kv(&mut fields, "psk", node.password.as_deref());
        }
        _ => return None,
    }

    if node.network == Some(Network::Ws) {
        fields.push("transport=ws".to_string());
        if let Some(opts) = &node.ws_opts {
            if let Some(path) = &opts.path {
                fields.push(format!("path={path}"));
            }
        }
    } else if node.network == Some(Network::Grpc) {
        fields.push("transport=grpc".to_string());
    }

    if let Some(alpn) = alpn_csv(&node.alpn) {
        fields.push(format!("alpn={alpn}"));
    }

    Some(fields.join(","))
}

fn push_kv(fields: &mut Vec<String>, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        fields.push(format!("{key}={}", quote_if_needed(v)));
    }
}

fn type_word(kind: NodeKind) -> Option<&'static str> {
    match kind {
        NodeKind::Ss => Some("shadowsocks"),
        NodeKind::Ssr => Some("shadowsocksr"),
        NodeKind::Vmess => Some("vmess"),
        NodeKind::Vless => Some("vless"),
        NodeKind::Trojan => Some("trojan"),
        NodeKind::Hysteria2 => Some("hysteria2"),
        NodeKind::Tuic => Some("tuic"),
        NodeKind::Wireguard => Some("wireguard"),
        NodeKind::Socks5 => Some("socks5"),
        NodeKind::Http => Some("http"),
        NodeKind::Snell => Some("snell"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wireguard_uses_inline_peers_array() {
        let mut node = Node::builder()
            .id(String::new())
            .name("WG".to_string())
            .kind(NodeKind::Wireguard)
            .server("h".to_string())
            .port(51820)
            .private_key("priv".to_string())
            .build();
        node.wireguard = Some(crate::ir::WireGuardOpts {
            ip: Some("10.0.0.1".to_string()),
            ipv6: None,
            mtu: None,
            reserved: None,
            peers: vec![crate::ir::WireGuardPeer {
                endpoint: Some("h:51820".to_string()),
                public_key: Some("pub".to_string()),
                pre_shared_key: None,
                allowed_ips: None,
                reserved: None,
            }],
        });
        let out = emit(&[node], &EmitOptions::default());
        assert!(out.contains("peers=[{public-key=pub,endpoint=h:51820}]"));
    }
}
