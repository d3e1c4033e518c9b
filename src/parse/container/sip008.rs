//! SIP008 JSON 容器解析：`{version, servers:[...]}` → Shadowsocks 节点。

use serde::Deserialize;
use std::collections::HashMap;

use crate::ir::{Node, NodeKind, SsOpts};
use crate::util::synthesize_name;

#[derive(Debug, Deserialize)]
struct Sip008Doc {
    #[allow(dead_code)]
    version: serde_json::Value,
    servers: Vec<Sip008Server>,
}

#[derive(Debug, Deserialize)]
struct Sip008Server {
    server: String,
    server_port: u16,
    method: String,
    password: String,
    #[serde(default)]
    plugin: Option<String>,
    #[serde(default)]
    plugin_opts: Option<String>,
    #[serde(default)]
    remarks: Option<String>,
}

pub fn parse(body: &str) -> Vec<Node> {
    let doc: Sip008Doc = match serde_json::from_str(body) {
        Ok(d) => d,
        Err(_) => return Vec::new(),
    };

    doc.servers
        .into_iter()
        .map(|s| {
            let name = s
                .remarks
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| synthesize_name("SS", &s.server, s.server_port));
            let ss = s.plugin.as_ref().map(|plugin| SsOpts {
                plugin: Some(plugin.clone()),
                plugin_opts: s.plugin_opts.as_ref().map(|raw| parse_plugin_opts(raw)),
            });
            Node::builder()
                .id(String::new())
                .name(name)
                .kind(NodeKind::Ss)
                .server(s.server)
                .port(s.server_port)
                .cipher(s.method.to_ascii_lowercase())
                .password(s.password)
                .maybe_ss(ss)
                .build()
        })
        .collect()
}

fn parse_plugin_opts(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|kv| kv.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_servers_array() {
        let body = r#"{"version":1,"servers":[{"server":"a.com","server_port":8388,"method":"aes-256-gcm","password":"pw","remarks":"Node"}]}"#;
        let nodes = parse(body);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "Node");
        assert_eq!(nodes[0].cipher.as_deref(), Some("aes-256-gcm"));
    }

    #[test]
    fn invalid_json_yields_empty() {
        assert!(parse("not json").is_empty());
    }
}
