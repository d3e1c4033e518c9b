//! `vmess://` URI 解析：主形态是 Base64(JSON)；另支持 QuantumultX 的 `NAME = vmess, ...` 变体。

use serde::Deserialize;

use crate::ir::{H2Opts, HttpOpts, Network, Node, NodeKind, WsOpts};
use crate::util::{decode_base64_str, parse_port, synthesize_name};

#[derive(Debug, Deserialize, Default)]
struct VmessJson {
    #[serde(default)]
    ps: String,
    add: String,
    port: serde_json::Value,
    id: String,
    #[serde(default)]
    aid: serde_json::Value,
    #[serde(default)]
    scy: String,
    #[serde(default)]
    net: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    tls: String,
    #[serde(default)]
    sni: String,
    #[serde(default)]
    fp: String,
    #[serde(default)]
    alpn: String,
}

pub fn parse(raw: &str) -> Option<Node> {
    let body = raw.strip_prefix("vmess://")?;
    if let Some(qx_line) = parse_quantumultx_variant(body) {
        return Some(qx_line);
    }
    let decoded = decode_base64_str(body)?;
    let parsed: VmessJson = serde_json::from_str(&decoded).ok()?;

    let port = match &parsed.port {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0) as u16,
        serde_json::Value::String(s) => parse_port(s),
        _ => 0,
    };
    let alter_id = match &parsed.aid {
        serde_json::Value::Number(n) => n.as_u64().map(|v| v as u32),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    };

    let cipher = match parsed.scy.as_str() {
        "auto" | "aes-128-gcm" | "chacha20-poly1305" | "none" | "zero" => parsed.scy.clone(),
        _ => "auto".to_string(),
    };

    let network = match parsed.net.as_str() {
        "ws" | "httpupgrade" => Some(Network::Ws),
        "grpc" => Some(Network::Grpc),
        "h2" => Some(Network::H2),
        "http" => Some(Network::Http),
        "kcp" => Some(Network::Kcp),
        "quic" => Some(Network::Quic),
        "tcp" | "" => Some(Network::Tcp),
        _ => Some(Network::Tcp),
    };
    let http_upgrade = parsed.net == "httpupgrade";

    let ws_opts = matches!(network, Some(Network::Ws)).then(|| {
        let mut headers = std::collections::HashMap::new();
        if !parsed.host.is_empty() {
            headers.insert("Host".to_string(), parsed.host.clone());
        }
        WsOpts {
            path: Some(crate::util::normalize_transport_path(&parsed.path)),
            headers: if headers.is_empty() { None } else { Some(headers) },
            max_early_data: None,
            early_data_header_name: None,
            v2ray_http_upgrade: http_upgrade.then_some(true),
        }
    });
    let h2_opts = matches!(network, Some(Network::H2)).then(|| H2Opts {
        path: (!parsed.path.is_empty()).then(|| crate::util::normalize_transport_path(&parsed.path)),
        host: (!parsed.host.is_empty()).then(|| vec![parsed.host.clone()]),
    });
    let http_opts = matches!(network, Some(Network::Http)).then(|| {
        let mut headers = std::collections::HashMap::new();
        if !parsed.host.is_empty() {
            headers.insert("Host".to_string(), vec![parsed.host.clone()]);
        }
        HttpOpts {
            path: (!parsed.path.is_empty())
                .then(|| vec![crate::util::normalize_transport_path(&parsed.path)]),
            headers: if headers.is_empty() { None } else { Some(headers) },
        }
    });

    let name = if parsed.ps.is_empty() {
        synthesize_name("VMess", &parsed.add, port)
    } else {
        parsed.ps.clone()
    };

    let tls = parsed.tls == "tls" || parsed.tls == "1";
    let alpn = (!parsed.alpn.is_empty())
        .then(|| parsed.alpn.split(',').map(|s| s.trim().to_string()).collect());

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Vmess)
            .server(parsed.add)
            .port(port)
            .uuid(parsed.id)
            .cipher(cipher)
            .maybe_alter_id(alter_id)
            .tls(tls)
            .maybe_sni((!parsed.sni.is_empty()).then_some(parsed.sni))
            .maybe_client_fingerprint((!parsed.fp.is_empty()).then_some(parsed.fp))
            .maybe_alpn(alpn)
            .maybe_network(network)
            .maybe_ws_opts(ws_opts)
            .maybe_h2_opts(h2_opts)
            .maybe_http_opts(http_opts)
            .build(),
    )
}

/// `vmess, server, port, method=auto, password=uuid, ...` after a QX-style Base64 unwrap.
fn parse_quantumultx_variant(body: &str) -> Option<Node> {
    let decoded = decode_base64_str(body)?;
    let trimmed = decoded.trim();
    if !trimmed.to_ascii_lowercase().starts_with("vmess") {
        return None;
    }
    let (_, rest) = trimmed.split_once('=').or_else(|| trimmed.split_once(','))?;
    let mut fields = rest.split(',').map(str::trim);
    let server = fields.next()?.to_string();
    let port = parse_port(fields.next()?);
    let mut uuid = None;
    for field in fields {
        if let Some(v) = field.strip_prefix("password=") {
            uuid = Some(v.trim_matches('"').to_string());
        }
    }
    Some(
        Node::builder()
            .id(String::new())
            .name(synthesize_name("VMess", &server, port))
            .kind(NodeKind::Vmess)
            .server(server)
            .port(port)
            .maybe_uuid(uuid)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn parses_standard_json_form() {
        let json = r#"{"ps":"Node","add":"host","port":443,"id":"uuid","aid":0,"scy":"auto","net":"ws","host":"example.com","path":"/p","tls":"tls","sni":"sni.com","fp":"chrome"}"#;
        let encoded = STANDARD.encode(json);
        let node = parse(&format!("vmess://{encoded}")).unwrap();
        assert_eq!(node.name, "Node");
        assert_eq!(node.server, "host");
        assert_eq!(node.uuid.as_deref(), Some("uuid"));
        assert!(node.tls);
        assert_eq!(node.ws_opts.unwrap().path.as_deref(), Some("/p"));
    }

    #[test]
    fn unknown_cipher_falls_back_to_auto() {
        let json = r#"{"ps":"N","add":"h","port":1,"id":"u","scy":"bogus"}"#;
        let encoded = STANDARD.encode(json);
        let node = parse(&format!("vmess://{encoded}")).unwrap();
        assert_eq!(node.cipher.as_deref(), Some("auto"));
    }

    #[test]
    fn httpupgrade_sets_ws_flag_without_dropping_it() {
        let json = r#"{"add":"h","port":1,"id":"u","net":"httpupgrade","host":"example.com","path":"/u"}"#;
        let encoded = STANDARD.encode(json);
        let node = parse(&format!("vmess://{encoded}")).unwrap();
        assert_eq!(node.network, Some(Network::Ws));
        assert_eq!(node.ws_opts.unwrap().v2ray_http_upgrade, Some(true));
    }

    #[test]
    fn h2_network_builds_h2_opts() {
        let json = r#"{"add":"h","port":1,"id":"u","net":"h2","host":"example.com","path":"/p"}"#;
        let encoded = STANDARD.encode(json);
        let node = parse(&format!("vmess://{encoded}")).unwrap();
        assert_eq!(node.network, Some(Network::H2));
        let h2 = node.h2_opts.unwrap();
        assert_eq!(h2.path.as_deref(), Some("/p"));
        assert_eq!(h2.host, Some(vec!["example.com".to_string()]));
    }

    #[test]
    fn http_network_builds_http_opts() {
        let json = r#"{"add":"h","port":1,"id":"u","net":"http","host":"example.com","path":"/p"}"#;
        let encoded = STANDARD.encode(json);
        let node = parse(&format!("vmess://{encoded}")).unwrap();
        assert_eq!(node.network, Some(Network::Http));
        let http = node.http_opts.unwrap();
        assert_eq!(http.path, Some(vec!["/p".to_string()]));
        assert_eq!(
            http.headers.unwrap().get("Host").cloned(),
            Some(vec!["example.com".to_string()])
        );
    }
}
