//! `ss://` Shadowsocks URI 解析。

use std::collections::HashMap;

use crate::ir::{GrpcOpts, Network, Node, NodeKind, SsOpts, WsOpts};
use crate::util::{decode_base64_str, decode_fragment_name, parse_port, synthesize_name};

pub fn parse(raw: &str) -> Option<Node> {
    let body = raw.strip_prefix("ss://")?;
    let (body, fragment) = match body.split_once('#') {
        Some((b, f)) => (b, Some(f)),
        None => (body, None),
    };

    // Legacy form: ss://base64(method:password@host:port) with no literal '@' before decoding.
    if !body.contains('@') {
        return parse_legacy(body, fragment);
    }

    let (userinfo, hostport_and_query) = body.split_once('@')?;
    let (hostport, query) = match hostport_and_query.split_once('?') {
        Some((h, q)) => (h, Some(q)),
        None => (hostport_and_query, None),
    };
    let (host, port_str) = hostport.rsplit_once(':')?;
    let port = parse_port(port_str);

    let (cipher, password) = decode_userinfo(userinfo)?;

    let query_pairs: HashMap<String, String> = query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    let name = decode_fragment_name(fragment).unwrap_or_else(|| synthesize_name("SS", host, port));

    let mut node = Node::builder()
        .id(String::new())
        .name(name)
        .kind(NodeKind::Ss)
        .server(host.to_string())
        .port(port)
        .cipher(cipher)
        .password(password)
        .build();

    if let Some(net) = query_pairs.get("type") {
        node.network = match net.as_str() {
            "ws" => Some(Network::Ws),
            "grpc" => Some(Network::Grpc),
            _ => None,
        };
    }
    // Mirrors VMess/Trojan: `path`/`host` build ws-opts, `serviceName` builds grpc-opts.
    if node.network == Some(Network::Ws) {
        let path = query_pairs.get("path").cloned();
        let host = query_pairs.get("host").cloned();
        if path.is_some() || host.is_some() {
            node.ws_opts = Some(WsOpts {
                path,
                headers: host.map(|h| HashMap::from([("Host".to_string(), h)])),
                max_early_data: None,
                early_data_header_name: None,
                v2ray_http_upgrade: None,
            });
        }
    } else if node.network == Some(Network::Grpc) {
        if let Some(service_name) = query_pairs.get("serviceName").cloned() {
            node.grpc_opts = Some(GrpcOpts {
                service_name: Some(service_name),
                grpc_type: None,
                authority: None,
            });
        }
    }
    node.udp = query_pairs.get("udp").map(|v| v == "1" || v == "true");
    node.tfo = query_pairs.get("tfo").map(|v| v == "1" || v == "true");

    if let Some(plugin_spec) = query_pairs.get("plugin") {
        node.ss = Some(translate_plugin(plugin_spec));
    }

    Some(node)
}

/// `ss://base64(method:password@host:port)#name` 整体 Base64 的旧式写法。
fn parse_legacy(encoded: &str, fragment: Option<&str>) -> Option<Node> {
    let decoded = decode_base64_str(encoded)?;
    let (cred, hostport) = decoded.split_once('@')?;
    let (cipher, password) = cred.split_once(':')?;
    let (host, port_str) = hostport.rsplit_once(':')?;
    let port = parse_port(port_str);
    let name = decode_fragment_name(fragment).unwrap_or_else(|| synthesize_name("SS", host, port));

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Ss)
            .server(host.to_string())
            .port(port)
            .cipher(cipher.to_ascii_lowercase())
            .password(password.to_string())
            .build(),
    )
}

/// userinfo 通常是 `Base64(method:password)`；2022-blake3-* 密码族改用百分号编码原文。
fn decode_userinfo(userinfo: &str) -> Option<(String, String)> {
    if let Some(decoded) = decode_base64_str(userinfo) {
        if let Some((method, password)) = decoded.split_once(':') {
            if method.starts_with("2022-blake3-") {
                // Decoded form starting with the AEAD-2022 prefix is itself the
                // percent-encoded `method:password` pair, not a nested encoding.
                let unescaped = urlencoding::decode(&decoded).ok()?.into_owned();
                let (m, p) = unescaped.split_once(':')?;
                return Some((m.to_ascii_lowercase(), p.to_string()));
            }
            return Some((method.to_ascii_lowercase(), password.to_string()));
        }
    }
    let unescaped = urlencoding::decode(userinfo).ok()?.into_owned();
    let (method, password) = unescaped.split_once(':')?;
    Some((method.to_ascii_lowercase(), password.to_string()))
}

/// `simple-obfs`/`obfs-local → obfs`, `v2ray-plugin`/`shadow-tls` pass through by name.
fn translate_plugin(spec: &str) -> SsOpts {
    let mut parts = spec.split(';');
    let plugin_name = parts.next().unwrap_or_default();
    let canonical = match plugin_name {
        "simple-obfs" | "obfs-local" => "obfs",
        other => other,
    };
    let mut opts = HashMap::new();
    for kv in parts {
        if let Some((k, v)) = kv.split_once('=') {
            opts.insert(k.to_string(), v.to_string());
        } else if !kv.is_empty() {
            opts.insert(kv.to_string(), String::new());
        }
    }
    SsOpts {
        plugin: Some(canonical.to_string()),
        plugin_opts: if opts.is_empty() { None } else { Some(opts) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_userinfo_form() {
        let node = parse("ss://YWVzLTEyOC1nY206cGFzc3dvcmQ=@server:443#Node1").unwrap();
        assert_eq!(node.name, "Node1");
        assert_eq!(node.server, "server");
        assert_eq!(node.port, 443);
        assert_eq!(node.cipher.as_deref(), Some("aes-128-gcm"));
        assert_eq!(node.password.as_deref(), Some("password"));
    }

    #[test]
    fn parses_unpadded_userinfo_without_fragment() {
        let node = parse("ss://YWVzLTEyOC1nY206cGFzc3dvcmQ@server:443").unwrap();
        assert_eq!(node.name, "SS server:443");
    }

    #[test]
    fn translates_obfs_plugin() {
        let node = parse(
            "ss://YWVzLTEyOC1nY206cGFzc3dvcmQ=@server:443?plugin=obfs-local;obfs=http;obfs-host=example.com#N",
        )
        .unwrap();
        let ss = node.ss.unwrap();
        assert_eq!(ss.plugin.as_deref(), Some("obfs"));
        assert_eq!(ss.plugin_opts.unwrap().get("obfs").map(String::as_str), Some("http"));
    }

    #[test]
    fn ws_type_builds_ws_opts_mirroring_vmess_trojan() {
        let node = parse(
            "ss://YWVzLTEyOC1nY206cGFzc3dvcmQ=@server:443?type=ws&path=/p&host=example.com#N",
        )
        .unwrap();
        let ws = node.ws_opts.unwrap();
        assert_eq!(ws.path.as_deref(), Some("/p"));
        assert_eq!(ws.headers.unwrap().get("Host").map(String::as_str), Some("example.com"));
    }

    #[test]
    fn grpc_type_builds_grpc_opts_from_service_name() {
        let node = parse(
            "ss://YWVzLTEyOC1nY206cGFzc3dvcmQ=@server:443?type=grpc&serviceName=svc#N",
        )
        .unwrap();
        assert_eq!(node.grpc_opts.unwrap().service_name.as_deref(), Some("svc"));
    }
}
