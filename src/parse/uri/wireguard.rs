//! `wireguard://`/`wg://` URI 解析。

use crate::ir::{Node, NodeKind, WireGuardOpts, WireGuardPeer};

use super::util::{name_or_default, parse_generic, parse_u8_triplet, query_map};

pub fn parse(raw: &str) -> Option<Node> {
    let url = parse_generic(raw)?;
    let private_key = urlencoding::decode(url.username()).ok()?.into_owned();
    let host = url.host_str()?.to_string();
    let port = url.port().unwrap_or(51820);
    let query = query_map(&url);
    let name = name_or_default(&url, || format!("WireGuard {host}:{port}"));

    let reserved = query.get("reserved").and_then(|r| parse_u8_triplet(r));

    // `address`/`ip` may carry both families comma-separated; split by colon presence.
    let (ip, ipv6) = match query.get("address").or_else(|| query.get("ip")) {
        Some(addr) => {
            let mut v4 = None;
            let mut v6 = None;
            for part in addr.split(',') {
                let part = part.trim().trim_end_matches(|c| c == '/' || c.is_ascii_digit());
                if part.contains(':') {
                    v6 = Some(part.to_string());
                } else if !part.is_empty() {
                    v4 = Some(part.to_string());
                }
            }
            (v4, v6)
        }
        None => (None, None),
    };

    // A bare WireGuard URI names the remote endpoint via host:port but may omit an
    // explicit peer public key in query params; synthesize the single implied peer
    // regardless so `wireguard.peers` is never left empty for a single-hop config.
    let peer_public_key = query.get("public-key").or_else(|| query.get("publickey")).cloned();
    let peers = vec![WireGuardPeer {
        endpoint: Some(format!("{host}:{port}")),
        public_key: peer_public_key.clone(),
        pre_shared_key: query.get("preshared-key").cloned(),
        allowed_ips: query
            .get("allowed-ips")
            .map(|a| a.split(',').map(str::to_string).collect()),
        reserved,
    }];

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Wireguard)
            .server(host)
            .port(port)
            .private_key(private_key)
            .maybe_public_key(peer_public_key)
            .wireguard(WireGuardOpts {
                ip,
                ipv6,
                mtu: query.get("mtu").and_then(|m| m.parse().ok()),
                reserved,
                peers,
            })
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_single_peer_from_public_key() {
        let node = parse("wireguard://privkey@host:51820?ip=10.0.0.1&mtu=1420&reserved=1,2,3&public-key=pub#WGNode")
            .unwrap();
        assert_eq!(node.name, "WGNode");
        assert_eq!(node.private_key.as_deref(), Some("privkey"));
        let wg = node.wireguard.unwrap();
        assert_eq!(wg.ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(wg.mtu, Some(1420));
        assert_eq!(wg.reserved, Some([1, 2, 3]));
        assert_eq!(wg.peers.len(), 1);
        assert_eq!(wg.peers[0].endpoint.as_deref(), Some("host:51820"));
    }
}
