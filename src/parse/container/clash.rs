//! Clash YAML 容器解析：接受 `{proxies: [...]}` 文档或裸数组。

use std::collections::HashMap;
use std::str::FromStr;

use serde_yml::Value;

use crate::ir::{
    GrpcOpts, H2Opts, HysteriaOpts, Network, Node, NodeKind, RealityOpts, TuicOpts, WsOpts,
};
use crate::util::synthesize_name;

/// 解析失败时返回空向量而非报错，遵循 §7 的"容器级吞掉错误"策略。
pub fn parse(body: &str) -> Vec<Node> {
    let root: Value = match serde_yml::from_str(body) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let proxies = match &root {
        Value::Mapping(map) => map
            .get(Value::String("proxies".to_string()))
            .and_then(|v| v.as_sequence())
            .cloned()
            .unwrap_or_default(),
        Value::Sequence(seq) => seq.clone(),
        _ => Vec::new(),
    };

    proxies
        .iter()
        .filter_map(|entry| entry.as_mapping())
        .filter_map(parse_entry)
        .collect()
}

fn get_str(map: &serde_yml::Mapping, key: &str) -> Option<String> {
    map.get(Value::String(key.to_string())).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn get_bool(map: &serde_yml::Mapping, key: &str) -> Option<bool> {
    map.get(Value::String(key.to_string())).and_then(Value::as_bool)
}

fn get_u16(map: &serde_yml::Mapping, key: &str) -> Option<u16> {
    map.get(Value::String(key.to_string()))
        .and_then(Value::as_u64)
        .map(|n| n as u16)
}

fn get_u32(map: &serde_yml::Mapping, key: &str) -> Option<u32> {
    map.get(Value::String(key.to_string()))
        .and_then(Value::as_u64)
        .map(|n| n as u32)
}

fn get_strings(map: &serde_yml::Mapping, key: &str) -> Option<Vec<String>> {
    map.get(Value::String(key.to_string())).and_then(|v| match v {
        Value::Sequence(seq) => Some(seq.iter().filter_map(|i| i.as_str().map(str::to_string)).collect()),
        Value::String(s) => Some(vec![s.clone()]),
        _ => None,
    })
}

fn sub_mapping<'a>(map: &'a serde_yml::Mapping, key: &str) -> Option<&'a serde_yml::Mapping> {
    map.get(Value::String(key.to_string())).and_then(Value::as_mapping)
}

fn parse_entry(map: &serde_yml::Mapping) -> Option<Node> {
    let type_str = get_str(map, "type")?;
    let kind = NodeKind::from_str(&type_str.to_ascii_lowercase()).ok()?;
    let server = get_str(map, "server")?;
    let port = get_u16(map, "port").unwrap_or(0);
    let name = get_str(map, "name").unwrap_or_else(|| synthesize_name(&type_str, &server, port));

    let network = get_str(map, "network").and_then(|n| Network::from_str(&n).ok());

    let ws_opts = sub_mapping(map, "ws-opts").map(|m| WsOpts {
        path: get_str(m, "path"),
        headers: sub_mapping(m, "headers").map(|h| {
            h.iter()
                .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.as_str()?.to_string())))
                .collect::<HashMap<_, _>>()
        }),
        max_early_data: get_u32(m, "max-early-data"),
        early_data_header_name: get_str(m, "early-data-header-name"),
        v2ray_http_upgrade: get_bool(m, "v2ray-http-upgrade"),
    });

    let grpc_opts = sub_mapping(map, "grpc-opts").map(|m| GrpcOpts {
        service_name: get_str(m, "grpc-service-name").or_else(|| get_str(m, "service-name")),
        grpc_type: get_str(m, "type"),
        authority: get_str(m, "authority"),
    });

    let h2_opts = sub_mapping(map, "h2-opts").map(|m| H2Opts {
        path: get_str(m, "path"),
        host: get_strings(m, "host"),
    });

    let reality_opts = sub_mapping(map, "reality-opts").map(|m| RealityOpts {
        public_key: get_str(m, "public-key"),
        short_id: get_str(m, "short-id"),
        spider_x: get_str(m, "spider-x"),
    });

    let hysteria = matches!(kind, NodeKind::Hysteria | NodeKind::Hysteria2).then(|| HysteriaOpts {
        up: get_str(map, "up"),
        down: get_str(map, "down"),
        obfs: get_str(map, "obfs"),
        obfs_password: get_str(map, "obfs-password"),
        ports: get_str(map, "ports"),
        recv_window_conn: map
            .get(Value::String("recv-window-conn".to_string()))
            .and_then(Value::as_u64),
        recv_window: map.get(Value::String("recv-window".to_string())).and_then(Value::as_u64),
    });

    let tuic = matches!(kind, NodeKind::Tuic).then(|| TuicOpts {
        congestion_controller: get_str(map, "congestion-controller"),
        udp_relay_mode: get_str(map, "udp-relay-mode"),
        reduce_rtt: get_bool(map, "reduce-rtt"),
        max_udp_relay_packet_size: get_u32(map, "max-udp-relay-packet-size"),
    });

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(kind)
            .server(server)
            .port(port)
            .maybe_password(get_str(map, "password"))
            .maybe_uuid(get_str(map, "uuid").or_else(|| get_str(map, "id")))
            .maybe_username(get_str(map, "username"))
            .maybe_cipher(get_str(map, "cipher"))
            .maybe_alter_id(get_u32(map, "alterId").or_else(|| get_u32(map, "aid")))
            .tls(get_bool(map, "tls").unwrap_or(false))
            .maybe_sni(get_str(map, "sni").or_else(|| get_str(map, "servername")))
            .maybe_alpn(get_strings(map, "alpn"))
            .maybe_skip_cert_verify(get_bool(map, "skip-cert-verify"))
            .maybe_client_fingerprint(get_str(map, "client-fingerprint"))
            .maybe_network(network)
            .maybe_ws_opts(ws_opts)
            .maybe_grpc_opts(grpc_opts)
            .maybe_h2_opts(h2_opts)
            .maybe_reality_opts(reality_opts)
            .maybe_hysteria(hysteria)
            .maybe_tuic(tuic)
            .maybe_udp(get_bool(map, "udp"))
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_proxies_document() {
        let body = r#"
proxies:
  - name: A
    type: ss
    server: host
    port: 8388
    cipher: aes-128-gcm
    password: pw
"#;
        let nodes = parse(body);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "A");
        assert_eq!(nodes[0].kind, NodeKind::Ss);
    }

    #[test]
    fn parses_bare_array() {
        let body = "- name: A\n  type: ss\n  server: host\n  port: 1\n";
        assert_eq!(parse(body).len(), 1);
    }

    #[test]
    fn malformed_yaml_yields_empty_vec() {
        assert!(parse("not: [valid yaml").is_empty());
    }
}
