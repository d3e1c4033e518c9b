//! Surge / Surfboard 发射器：共享同一套行语法，仅支持集合不同。WireGuard
//! 额外发射一个 `[WireGuard <section>]` 小节（§4.6）。

use crate::ir::{Network, Node, NodeKind};

use super::{EmitOptions, Target, alpn_csv, quote_if_needed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Surge,
    Surfboard,
}

pub fn emit(nodes: &[Node], dialect: Dialect, opts: &EmitOptions) -> String {
    let target = match dialect {
        Dialect::Surge => Target::Surge,
        Dialect::Surfboard => Target::Surfboard,
    };

    let mut lines = Vec::new();
    let mut wg_sections = Vec::new();

    for node in nodes {
        if !target.supports(node.kind) && !opts.include_unsupported_proxy {
            continue;
        }
        if let Some(line) = encode_line(node) {
            lines.push(line);
        }
        if node.kind == NodeKind::Wireguard {
            if let Some(section) = encode_wireguard_section(node) {
                wg_sections.push(section);
            }
        }
    }

    lines.extend(wg_sections);
    lines.join("\n")
}

fn encode_line(node: &Node) -> Option<String> {
    let name = quote_if_needed(&node.name);
    let mut fields = vec![name, type_word(node.kind)?.to_string(), node.server.clone(), node.port.to_string()];

    match node.kind {
        NodeKind::Ss => {
            push_kv(&mut fields, "encrypt-method", node.cipher.as_deref());
            push_kv(&mut fields, "password", node.password.as_deref());
        }
        NodeKind::Vmess => {
            push_kv(&mut fields, "username", node.uuid.as_deref());
            if node.tls {
                fields.push("tls=true".to_string());
            }
        }
        NodeKind::Trojan | NodeKind::Anytls => {
            if let Some(p) = &node.password {
                fields.push(format!("password=\"{p}\""));
            }
            push_kv(&mut fields, "sni", node.sni.as_deref());
        }
        NodeKind::Hysteria2 => {
            push_kv(&mut fields, "password", node.password.as_deref());
            if let Some(h) = &node.hysteria {
                if let Some(spec) = &h.ports {
                    fields.push(format!("port-hopping=\"{spec}\""));
                }
                push_kv(&mut fields, "download-bandwidth", h.down.as_deref());
            }
        }
        NodeKind::Tuic => {
            push_kv(&mut fields, "username", node.uuid.as_deref());
            push_kv(&mut fields, "password", node.password.as_deref());
        }
        NodeKind::Wireguard => {
            fields.push(format!("section-name={}", node.name));
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
            if let Some(v) = node.snell.as_ref().and_then(|s| s.version) {
                fields.push(format!("version={v}"));
            }
        }
        _ => return None,
    }

    if node.network == Some(Network::Ws) {
        fields.push("ws=true".to_string());
        if let Some(opts) = &node.ws_opts {
            if let Some(path) = &opts.path {
                fields.push(format!("ws-path={path}"));
            }
        }
    }
    if let Some(alpn) = alpn_csv(&node.alpn) {
        fields.push(format!("alpn={alpn}"));
    }
    if node.skip_cert_verify == Some(true) {
        fields.push("skip-cert-verify=true".to_string());
    }

    Some(fields.join(","))
}

fn encode_wireguard_section(node: &Node) -> Option<String> {
    let wg = node.wireguard.as_ref()?;
    let peer = wg.peers.first();
    let mut lines = vec![format!("[WireGuard {}]", node.name)];
    if let Some(pk) = &node.private_key {
        lines.push(format!("private-key = {pk}"));
    }
    if let Some(ip) = &wg.ip {
        lines.push(format!("self-ip = {ip}"));
    }
    if let Some(ip6) = &wg.ipv6 {
        lines.push(format!("self-ip-v6 = {ip6}"));
    }
    if let Some(mtu) = wg.mtu {
        lines.push(format!("mtu = {mtu}"));
    }
    if let Some(peer) = peer {
        let endpoint = peer.endpoint.clone().unwrap_or_default();
        let pubkey = peer.public_key.clone().unwrap_or_default();
        let allowed = peer.allowed_ips.clone().unwrap_or_else(|| vec!["0.0.0.0/0".to_string()]);
        lines.push(format!(
            "peer = (public-key = {pubkey}, endpoint = {endpoint}, allowed-ips = \"{}\")",
            allowed.join(",")
        ));
    }
    Some(lines.join("\n"))
}

fn push_kv(fields: &mut Vec<String>, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        fields.push(format!("{key}={}", quote_if_needed(v)));
    }
}

fn type_word(kind: NodeKind) -> Option<&'static str> {
    match kind {
        NodeKind::Ss => Some("ss"),
        NodeKind::Vmess => Some("vmess"),
        NodeKind::Trojan => Some("trojan"),
        NodeKind::Hysteria2 => Some("hysteria2"),
        NodeKind::Tuic => Some("tuic"),
        NodeKind::Wireguard => Some("wireguard"),
        NodeKind::Socks5 => Some("socks5"),
        NodeKind::Http => Some("http"),
        NodeKind::Snell => Some("snell"),
        NodeKind::Anytls => Some("anytls"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anytls_line_matches_expected_shape() {
        let node = Node::builder()
            .id(String::new())
            .name("Any".to_string())
            .kind(NodeKind::Anytls)
            .server("host".to_string())
            .port(443)
            .password("pass".to_string())
            .sni("sni.com".to_string())
            .build();
        let out = emit(&[node], Dialect::Surge, &EmitOptions::default());
        assert!(out.contains("Any=anytls,host,443,password=\"pass\",sni=sni.com"));
    }

    #[test]
    fn wireguard_emits_two_blocks() {
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
            mtu: Some(1420),
            reserved: None,
            peers: vec![crate::ir::WireGuardPeer {
                endpoint: Some("h:51820".to_string()),
                public_key: Some("pub".to_string()),
                pre_shared_key: None,
                allowed_ips: None,
                reserved: None,
            }],
        });
        let out = emit(&[node], Dialect::Surge, &EmitOptions::default());
        assert!(out.contains("WG=wireguard"));
        assert!(out.contains("[WireGuard WG]"));
    }
}
