//! Surge / Loon / QuantumultX 的行式语法: `NAME = TYPE, server, port, k1=v1, k2="v2 with spaces"`.
//!
//! 智能切分需要同时尊重双引号字符串与括号深度 (Loon 的 WireGuard `peers=[{...}]`)。

use std::collections::HashMap;
use std::str::FromStr;

use crate::ir::{Network, Node, NodeKind, WsOpts};
use crate::util::parse_port;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDialect {
    Surge,
    Loon,
    Qx,
}

/// 按 `,` 切分，但跳过双引号内与 `[`/`{` 括号深度 > 0 时的分隔符。
pub fn smart_split(line: &str, delim: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut depth = 0i32;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '[' | '{' if !in_quotes => {
                depth += 1;
                current.push(c);
            }
            ']' | '}' if !in_quotes => {
                depth -= 1;
                current.push(c);
            }
            c if c == delim && !in_quotes && depth == 0 => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() || !fields.is_empty() {
        fields.push(current.trim().to_string());
    }
    fields
}

fn unquote(s: &str) -> String {
    s.trim()
        .trim_matches('"')
        .to_string()
}

/// 每个逗号字段在 `=` 右侧时解析为 `(key, value)`；左侧无 `=` 的位置字段跳过。
fn params_from_fields(fields: &[String]) -> HashMap<String, String> {
    fields
        .iter()
        .filter_map(|f| f.split_once('=').map(|(k, v)| (k.trim().to_string(), unquote(v))))
        .collect()
}

pub fn parse(body: &str, dialect: LineDialect) -> Vec<Node> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with("//"))
        .filter_map(|l| parse_line(l, dialect))
        .collect()
}

fn parse_line(line: &str, dialect: LineDialect) -> Option<Node> {
    match dialect {
        LineDialect::Qx => parse_qx_line(line),
        LineDialect::Surge | LineDialect::Loon => parse_surge_loon_line(line, dialect),
    }
}

fn parse_surge_loon_line(line: &str, dialect: LineDialect) -> Option<Node> {
    let (name, rest) = line.split_once('=')?;
    let name = name.trim().to_string();
    // port-hopping must be pulled out before the generic split since it embeds `;`.
    let port_hopping = rest
        .split(',')
        .find_map(|f| f.trim().strip_prefix("port-hopping=").map(|v| unquote(v)));

    let fields = smart_split(rest, ',');
    if fields.len() < 3 {
        return None;
    }
    let type_word = fields[0].trim().to_ascii_lowercase();
    let server = fields[1].trim().to_string();
    let port = parse_port(fields[2].trim());
    let params = params_from_fields(&fields[3..]);

    let kind = map_type_word(&type_word)?;
    let network = detect_network(&params, dialect);

    let mut node = Node::builder()
        .id(String::new())
        .name(name)
        .kind(kind)
        .server(server)
        .port(port)
        .maybe_password(params.get("password").cloned())
        .maybe_uuid(params.get("username").or_else(|| params.get("uuid")).or_else(|| params.get("id")).cloned())
        .maybe_cipher(params.get("encrypt-method").or_else(|| params.get("cipher")).cloned())
        .tls(params.get("tls").map(|v| v == "true").unwrap_or(false))
        .maybe_sni(params.get("sni").cloned())
        .maybe_skip_cert_verify(params.get("skip-cert-verify").map(|v| v == "true"))
        .maybe_network(network)
        .build();

    if network == Some(Network::Ws) {
        let path = params
            .get("ws-path")
            .or_else(|| params.get("path"))
            .cloned()
            .unwrap_or_else(|| "/".to_string());
        node.ws_opts = Some(WsOpts {
            path: Some(crate::util::normalize_transport_path(&path)),
            headers: params.get("ws-headers").map(|h| {
                let mut m = HashMap::new();
                m.insert("Host".to_string(), h.clone());
                m
            }),
            max_early_data: None,
            early_data_header_name: None,
            v2ray_http_upgrade: None,
        });
    }

    if let Some(spec) = port_hopping {
        node.hysteria = Some(crate::ir::HysteriaOpts {
            ports: Some(spec),
            ..Default::default()
        });
    }

    Some(node)
}

/// QX: first comma field is `server:port`, remaining fields are `key=value`;
/// the type word sits before the first `=` alongside the tag, e.g. `vmess=host:443,...`.
fn parse_qx_line(line: &str) -> Option<Node> {
    let (lhs, rhs) = line.split_once('=')?;
    let type_word = lhs.trim().to_ascii_lowercase();
    let kind = map_type_word(&type_word)?;

    let fields = smart_split(rhs, ',');
    let (server, port) = fields.first()?.split_once(':')?;
    let port = parse_port(port.trim());
    let params = params_from_fields(&fields[1..]);

    let name = params.get("tag").cloned().unwrap_or_else(|| format!("{type_word} {server}:{port}"));
    let network = if params.contains_key("obfs") && params.get("obfs").map(String::as_str) == Some("ws") {
        Some(Network::Ws)
    } else {
        None
    };

    let mut node = Node::builder()
        .id(String::new())
        .name(name)
        .kind(kind)
        .server(server.trim().to_string())
        .port(port)
        .maybe_password(params.get("password").cloned())
        .maybe_uuid(params.get("method").filter(|_| kind == NodeKind::Vmess).and_then(|_| params.get("id")).cloned())
        .maybe_cipher(params.get("method").cloned())
        .tls(params.get("tls13").map(|v| v == "true").unwrap_or(params.contains_key("tls-verification")))
        .maybe_sni(params.get("tls-host").cloned())
        .maybe_network(network)
        .build();

    if network == Some(Network::Ws) {
        node.ws_opts = Some(WsOpts {
            path: Some(crate::util::normalize_transport_path(
                params.get("obfs-uri").map(String::as_str).unwrap_or("/"),
            )),
            headers: params.get("obfs-host").map(|h| {
                let mut m = HashMap::new();
                m.insert("Host".to_string(), h.clone());
                m
            }),
            max_early_data: None,
            early_data_header_name: None,
            v2ray_http_upgrade: None,
        });
    }

    Some(node)
}

fn map_type_word(word: &str) -> Option<NodeKind> {
    let normalized = match word {
        "shadowsocks" => "ss",
        other => other,
    };
    NodeKind::from_str(normalized).ok()
}

fn detect_network(params: &HashMap<String, String>, dialect: LineDialect) -> Option<Network> {
    match dialect {
        LineDialect::Loon => params.get("transport").and_then(|t| Network::from_str(t).ok()),
        LineDialect::Surge => {
            if params.get("ws").map(String::as_str) == Some("true") {
                Some(Network::Ws)
            } else {
                None
            }
        }
        LineDialect::Qx => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smart_split_respects_quotes_and_brackets() {
        let fields = smart_split(r#"ss,host,443,password="a,b",peers=[{"a":1},{"b":2}]"#, ',');
        assert_eq!(fields[0], "ss");
        assert_eq!(fields[3], r#"password="a,b""#);
        assert_eq!(fields[4], r#"peers=[{"a":1},{"b":2}]"#);
    }

    #[test]
    fn surge_line_parses_ws_transport() {
        let body = r#"MyNode = vmess, host, 443, username=uuid, tls=true, ws=true, ws-path=/path"#;
        let nodes = parse(body, LineDialect::Surge);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].network, Some(Network::Ws));
        assert_eq!(nodes[0].ws_opts.as_ref().unwrap().path.as_deref(), Some("/path"));
    }

    #[test]
    fn qx_line_uses_tag_as_name() {
        let body = "vmess=host:443,method=auto,password=pw,tag=MyQX";
        let nodes = parse(body, LineDialect::Qx);
        assert_eq!(nodes[0].name, "MyQX");
        assert_eq!(nodes[0].server, "host");
        assert_eq!(nodes[0].port, 443);
    }
}
