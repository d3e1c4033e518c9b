//! QuantumultX 发射器：`TYPE=server:port,k=v,...,tag=NAME`，`obfs=ws` 取代 Surge/Loon 的传输字段名。

use crate::ir::{Network, Node, NodeKind};

use super::{EmitOptions, Target, alpn_csv};

pub fn emit(nodes: &[Node], opts: &EmitOptions) -> String {
    nodes
        .iter()
        .filter(|n| Target::Quanx.supports(n.kind) || opts.include_unsupported_proxy)
        .filter_map(encode_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn encode_line(node: &Node) -> Option<String> {
    let type_word = type_word(node.kind)?;
    let mut fields = vec![format!("{}:{}", node.server, node.port)];

    match node.kind {
        NodeKind::Ss | NodeKind::Ssr => {
            fields.push(format!("method={}", node.cipher.clone().unwrap_or_else(|| "aes-128-gcm".to_string())));
            fields.push(format!("password={}", node.password.clone().unwrap_or_default()));
        }
        NodeKind::Vmess | NodeKind::Vless => {
            fields.push("method=aes-128-gcm".to_string());
            fields.push(format!("password={}", node.uuid.clone().unwrap_or_default()));
        }
        NodeKind::Trojan => {
            fields.push(format!("password={}", node.password.clone().unwrap_or_default()));
        }
        NodeKind::Hysteria2 => {
            fields.push(format!("password={}", node.password.clone().unwrap_or_default()));
        }
        NodeKind::Wireguard => {
            let wg = node.wireguard.as_ref()?;
            let peer = wg.peers.first();
            fields.push(format!("private-key={}", node.private_key.clone().unwrap_or_default()));
            fields.push(format!("public-key={}", peer.and_then(|p| p.public_key.clone()).unwrap_or_default()));
            fields.push(format!("interface-ip={}", wg.ip.clone().unwrap_or_default()));
        }
        NodeKind::Socks5 => {
            if let Some(u) = &node.username {
                fields.push(format!("username={u}"));
            }
            if let Some(p) = &node.password {
                fields.push(format!("password={p}"));
            }
        }
        NodeKind::Http => {
            if let Some(u) = &node.username {
                fields.push(format!("username={u}"));
            }
            if let Some(p) = &node.password {
                fields.push(format!("password={p}"));
            }
        }
        _ => return None,
    }

    if node.tls {
        fields.push("tls13=true".to_string());
        if let Some(sni) = &node.sni {
            fields.push(format!("tls-host={sni}"));
        }
    }
    if node.network == Some(Network::Ws) {
        fields.push("obfs=ws".to_string());
        if let Some(opts) = &node.ws_opts {
            if let Some(path) = &opts.path {
                fields.push(format!("obfs-uri={path}"));
            }
            if let Some(host) = opts.headers.as_ref().and_then(|h| h.get("Host")) {
                fields.push(format!("obfs-host={host}"));
            }
        }
    }
    if let Some(alpn) = alpn_csv(&node.alpn) {
        fields.push(format!("alpn={alpn}"));
    }
    fields.push(format!("tag={}", node.name));

    Some(format!("{type_word}={}", fields.join(",")))
}

fn type_word(kind: NodeKind) -> Option<&'static str> {
    match kind {
        NodeKind::Ss => Some("shadowsocks"),
        NodeKind::Ssr => Some("shadowsocksr"),
        NodeKind::Vmess => Some("vmess"),
        NodeKind::Vless => Some("vless"),
        NodeKind::Trojan => Some("trojan"),
        NodeKind::Hysteria2 => Some("hysteria2"),
        NodeKind::Wireguard => Some("wireguard"),
        NodeKind::Socks5 => Some("socks5"),
        NodeKind::Http => Some("http"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_carries_node_name() {
        let node = Node::builder()
            .id(String::new())
            .name("MyQX".to_string())
            .kind(NodeKind::Trojan)
            .server("h".to_string())
            .port(443)
            .password("pw".to_string())
            .build();
        let out = emit(&[node], &EmitOptions::default());
        assert!(out.contains("tag=MyQX"));
        assert!(out.starts_with("trojan=h:443"));
    }
}
