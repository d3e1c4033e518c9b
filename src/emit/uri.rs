//! URI-list 发射器：把每个节点逆向编码回该协议惯用的 URI 形态。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::ir::{Node, NodeKind};

use super::EmitOptions;

pub fn emit(nodes: &[Node], _opts: &EmitOptions) -> String {
    nodes
        .iter()
        .filter_map(encode_one)
        .collect::<Vec<_>>()
        .join("\n")
}

fn encode_one(node: &Node) -> Option<String> {
    let frag = urlencoding::encode(&node.name).into_owned();
    match node.kind {
        NodeKind::Ss => {
            let cipher = node.cipher.as_deref().unwrap_or("aes-128-gcm");
            let password = node.password.as_deref().unwrap_or("");
            let userinfo = STANDARD.encode(format!("{cipher}:{password}"));
            Some(format!("ss://{userinfo}@{}:{}#{frag}", node.server, node.port))
        }
        NodeKind::Vmess => {
            let json = serde_json::json!({
                "v": "2", "ps": node.name, "add": node.server, "port": node.port.to_string(),
                "id": node.uuid.clone().unwrap_or_default(),
                "aid": node.alter_id.unwrap_or(0).to_string(),
                "scy": node.cipher.clone().unwrap_or_else(|| "auto".to_string()),
                "net": node.network.map(|n| n.to_string()).unwrap_or_else(|| "tcp".to_string()),
                "host": node.ws_opts.as_ref().and_then(|o| o.headers.as_ref()).and_then(|h| h.get("Host")).cloned().unwrap_or_default(),
                "path": node.ws_opts.as_ref().and_then(|o| o.path.clone()).unwrap_or_default(),
                "tls": if node.tls { "tls" } else { "" },
                "sni": node.sni.clone().unwrap_or_default(),
                "fp": node.client_fingerprint.clone().unwrap_or_default(),
            });
            Some(format!("vmess://{}", STANDARD.encode(json.to_string())))
        }
        NodeKind::Vless => {
            let mut q = vec![];
            if let Some(net) = node.network {
                q.push(format!("type={net}"));
            }
            if node.reality_opts.is_some() {
                q.push("security=reality".to_string());
                if let Some(r) = &node.reality_opts {
                    if let Some(pbk) = &r.public_key {
                        q.push(format!("pbk={pbk}"));
                    }
                    if let Some(sid) = &r.short_id {
                        q.push(format!("sid={sid}"));
                    }
                }
            } else if node.tls {
                q.push("security=tls".to_string());
            }
            if let Some(sni) = &node.sni {
                q.push(format!("sni={sni}"));
            }
            if let Some(fp) = &node.client_fingerprint {
                q.push(format!("fp={fp}"));
            }
            Some(format!(
                "vless://{}@{}:{}?{}#{frag}",
                node.uuid.clone().unwrap_or_default(),
                node.server,
                node.port,
                q.join("&")
            ))
        }
        NodeKind::Trojan => Some(format!(
            "trojan://{}@{}:{}?sni={}#{frag}",
            node.password.clone().unwrap_or_default(),
            node.server,
            node.port,
            node.sni.clone().unwrap_or_default()
        )),
        NodeKind::Hysteria2 => {
            let portspec = node
                .hysteria
                .as_ref()
                .and_then(|h| h.ports.clone())
                .unwrap_or_else(|| node.port.to_string());
            let mut q = vec![];
            if let Some(h) = &node.hysteria {
                if let Some(obfs) = &h.obfs {
                    q.push(format!("obfs={obfs}"));
                }
                if let Some(op) = &h.obfs_password {
                    q.push(format!("obfs-password={op}"));
                }
                if let Some(up) = &h.up {
                    q.push(format!("up={up}"));
                }
                if let Some(down) = &h.down {
                    q.push(format!("down={down}"));
                }
            }
            Some(format!(
                "hysteria2://{}@{}:{}?{}#{frag}",
                node.password.clone().unwrap_or_default(),
                node.server,
                portspec,
                q.join("&")
            ))
        }
        NodeKind::Tuic => Some(format!(
            "tuic://{}:{}@{}:{}#{frag}",
            node.uuid.clone().unwrap_or_default(),
            node.password.clone().unwrap_or_default(),
            node.server,
            node.port
        )),
        NodeKind::Wireguard => Some(format!(
            "wireguard://{}@{}:{}?ip={}&mtu={}#{frag}",
            node.private_key.clone().unwrap_or_default(),
            node.server,
            node.port,
            node.wireguard.as_ref().and_then(|w| w.ip.clone()).unwrap_or_default(),
            node.wireguard.as_ref().and_then(|w| w.mtu).unwrap_or(1420),
        )),
        NodeKind::Snell => Some(format!(
            "snell://{}@{}:{}?version={}#{frag}",
            node.password.clone().unwrap_or_default(),
            node.server,
            node.port,
            node.snell.as_ref().and_then(|s| s.version).unwrap_or(4),
        )),
        NodeKind::Anytls => Some(format!(
            "anytls://{}@{}:{}?sni={}#{frag}",
            node.password.clone().unwrap_or_default(),
            node.server,
            node.port,
            node.sni.clone().unwrap_or_default()
        )),
        NodeKind::Socks5 => Some(format!(
            "socks5://{}@{}:{}#{frag}",
            STANDARD.encode(format!(
                "{}:{}",
                node.username.clone().unwrap_or_default(),
                node.password.clone().unwrap_or_default()
            )),
            node.server,
            node.port
        )),
        NodeKind::Http | NodeKind::Https => {
            let scheme = if node.kind == NodeKind::Https { "https" } else { "http" };
            Some(format!("{scheme}://{}:{}#{frag}", node.server, node.port))
        }
        NodeKind::Ssr | NodeKind::Naive | NodeKind::Ssh | NodeKind::External | NodeKind::Direct | NodeKind::Reject => {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::NodeKind;

    #[test]
    fn ss_round_trips_cipher_and_password() {
        let node = Node::builder()
            .id(String::new())
            .name("Node1".to_string())
            .kind(NodeKind::Ss)
            .server("server".to_string())
            .port(443)
            .cipher("aes-128-gcm".to_string())
            .password("password".to_string())
            .build();
        let out = encode_one(&node).unwrap();
        assert!(out.starts_with("ss://"));
        assert!(out.ends_with("#Node1"));
    }
}
