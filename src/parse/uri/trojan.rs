//! `trojan://` URI 解析。

use crate::ir::{GrpcOpts, Network, Node, NodeKind, WsOpts};

use super::util::{name_or_default, parse_generic, query_bool, query_map};

pub fn parse(raw: &str) -> Option<Node> {
    let url = parse_generic(raw)?;
    let password = urlencoding::decode(url.username()).ok()?.into_owned();
    let host = url.host_str()?.to_string();
    let port = url.port().unwrap_or(0);
    let query = query_map(&url);
    let name = name_or_default(&url, || format!("Trojan {host}:{port}"));

    let network = match query.get("type").map(String::as_str) {
        Some("ws") => Some(Network::Ws),
        Some("grpc") => Some(Network::Grpc),
        _ => None,
    };

    // `path`/`host` build ws-opts, `serviceName` builds grpc-opts (mirrors VMess/VLESS).
    let ws_opts = matches!(network, Some(Network::Ws)).then(|| WsOpts {
        path: query.get("path").cloned(),
        headers: query.get("host").cloned().map(|h| {
            std::collections::HashMap::from([("Host".to_string(), h)])
        }),
        max_early_data: None,
        early_data_header_name: None,
        v2ray_http_upgrade: None,
    });
    let grpc_opts = matches!(network, Some(Network::Grpc)).then(|| GrpcOpts {
        service_name: query.get("serviceName").cloned(),
        grpc_type: None,
        authority: None,
    });

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Trojan)
            .server(host)
            .port(port)
            .password(password)
            .tls(true)
            .maybe_sni(query.get("sni").cloned().or_else(|| query.get("peer").cloned()))
            .maybe_skip_cert_verify(query_bool(&query, "allowInsecure"))
            .maybe_network(network)
            .maybe_ws_opts(ws_opts)
            .maybe_grpc_opts(grpc_opts)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_password_and_sni() {
        let node = parse("trojan://secret@host:443?sni=example.com#Node3").unwrap();
        assert_eq!(node.name, "Node3");
        assert_eq!(node.password.as_deref(), Some("secret"));
        assert_eq!(node.sni.as_deref(), Some("example.com"));
        assert!(node.tls);
    }

    #[test]
    fn ws_type_builds_ws_opts() {
        let node = parse("trojan://secret@host:443?type=ws&path=/p&host=example.com#N").unwrap();
        let ws = node.ws_opts.unwrap();
        assert_eq!(ws.path.as_deref(), Some("/p"));
        assert_eq!(ws.headers.unwrap().get("Host").map(String::as_str), Some("example.com"));
    }

    #[test]
    fn grpc_type_builds_grpc_opts() {
        let node = parse("trojan://secret@host:443?type=grpc&serviceName=svc#N").unwrap();
        assert_eq!(node.grpc_opts.unwrap().service_name.as_deref(), Some("svc"));
    }
}
