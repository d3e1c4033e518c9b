//! `vless://` URI 解析，含 Reality 与 Shadowrocket 遗留 Base64 变体。

use crate::ir::{GrpcOpts, Network, Node, NodeKind, RealityOpts, WsOpts};
use crate::util::decode_base64_str;

use super::util::{name_or_default, parse_generic, query_bool, query_map};

pub fn parse(raw: &str) -> Option<Node> {
    let raw = raw.strip_prefix("vless://")?;
    if let Some(node) = parse_shadowrocket_legacy(raw) {
        return Some(node);
    }

    let url = parse_generic(&format!("vless://{raw}"))?;
    let uuid = url.username().to_string();
    if uuid.is_empty() {
        return None;
    }
    let host = url.host_str()?.to_string();
    let port = url.port().unwrap_or(0);
    let query = query_map(&url);
    let name = name_or_default(&url, || format!("VLESS {host}:{port}"));

    let http_upgrade = query.get("type").map(String::as_str) == Some("httpupgrade");
    let mut network = match query.get("type").map(String::as_str) {
        Some("httpupgrade") => Some(Network::Ws),
        Some("ws") => Some(Network::Ws),
        Some("grpc") => Some(Network::Grpc),
        Some("h2") => Some(Network::H2),
        Some("kcp") => Some(Network::Kcp),
        Some("quic") => Some(Network::Quic),
        Some("tcp") => Some(Network::Tcp),
        _ => None,
    };
    if network.is_none() && query.get("type").is_some() {
        network = Some(Network::Tcp);
    }

    // `path`/`host` build ws-opts, `serviceName` builds grpc-opts (mirrors Trojan/VMess).
    let ws_opts = matches!(network, Some(Network::Ws)).then(|| WsOpts {
        path: query.get("path").cloned(),
        headers: query.get("host").cloned().map(|h| {
            std::collections::HashMap::from([("Host".to_string(), h)])
        }),
        max_early_data: None,
        early_data_header_name: None,
        v2ray_http_upgrade: http_upgrade.then_some(true),
    });
    let grpc_opts = matches!(network, Some(Network::Grpc)).then(|| GrpcOpts {
        service_name: query.get("serviceName").cloned(),
        grpc_type: None,
        authority: None,
    });

    let security = query.get("security").map(String::as_str).unwrap_or("none");
    let reality_opts = (security == "reality").then(|| RealityOpts {
        public_key: query.get("pbk").cloned(),
        short_id: query.get("sid").cloned(),
        spider_x: query.get("spx").cloned(),
    });
    let tls = security == "tls" || security == "reality";

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Vless)
            .server(host.clone())
            .port(port)
            .uuid(uuid)
            .tls(tls)
            .maybe_sni(query.get("sni").cloned())
            .maybe_client_fingerprint(query.get("fp").cloned())
            .maybe_alpn(
                query
                    .get("alpn")
                    .map(|a| a.split(',').map(str::to_string).collect()),
            )
            .maybe_skip_cert_verify(query_bool(&query, "allowInsecure"))
            .maybe_reality_opts(reality_opts)
            .maybe_network(network)
            .maybe_ws_opts(ws_opts)
            .maybe_grpc_opts(grpc_opts)
            .maybe_username(query.get("flow").cloned())
            .build(),
    )
}

/// Shadowrocket's legacy form Base64-encodes the whole `uuid@host:port?query#name` body.
fn parse_shadowrocket_legacy(raw: &str) -> Option<Node> {
    let before_fragment = raw.split('#').next().unwrap_or(raw);
    if before_fragment.contains('@') || before_fragment.contains('?') {
        return None;
    }
    let decoded = decode_base64_str(before_fragment)?;
    if !decoded.contains('@') {
        return None;
    }
    parse(&format!("vless://{decoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reality_params() {
        let node = parse(
            "vless://uuid@host:443?security=reality&sni=sni.com&fp=chrome&pbk=pubkey&sid=shortid#RealityNode",
        )
        .unwrap();
        assert_eq!(node.name, "RealityNode");
        assert!(node.tls);
        assert_eq!(node.sni.as_deref(), Some("sni.com"));
        assert_eq!(node.client_fingerprint.as_deref(), Some("chrome"));
        let reality = node.reality_opts.unwrap();
        assert_eq!(reality.public_key.as_deref(), Some("pubkey"));
        assert_eq!(reality.short_id.as_deref(), Some("shortid"));
    }

    #[test]
    fn httpupgrade_maps_to_ws() {
        let node = parse("vless://uuid@host:443?type=httpupgrade#N").unwrap();
        assert_eq!(node.network, Some(Network::Ws));
        let ws = node.ws_opts.unwrap();
        assert_eq!(ws.v2ray_http_upgrade, Some(true));
    }

    #[test]
    fn ws_type_builds_ws_opts_from_path_and_host() {
        let node = parse("vless://uuid@host:443?type=ws&path=%2Fp&host=example.com#N").unwrap();
        let ws = node.ws_opts.unwrap();
        assert_eq!(ws.path.as_deref(), Some("/p"));
        assert_eq!(ws.headers.unwrap().get("Host").map(String::as_str), Some("example.com"));
    }

    #[test]
    fn grpc_type_builds_grpc_opts_from_service_name() {
        let node = parse("vless://uuid@host:443?type=grpc&serviceName=svc#N").unwrap();
        assert_eq!(node.grpc_opts.unwrap().service_name.as_deref(), Some("svc"));
    }
}
