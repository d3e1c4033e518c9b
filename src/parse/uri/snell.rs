//! `snell://` URI 解析。

use crate::ir::{Node, NodeKind, SnellOpts};

use super::util::{name_or_default, parse_generic, query_map};

pub fn parse(raw: &str) -> Option<Node> {
    let url = parse_generic(raw)?;
    let password = urlencoding::decode(url.username()).ok()?.into_owned();
    let host = url.host_str()?.to_string();
    let port = url.port().unwrap_or(0);
    let query = query_map(&url);
    let name = name_or_default(&url, || format!("Snell {host}:{port}"));

    let mut obfs_opts = std::collections::HashMap::new();
    if let Some(obfs) = query.get("obfs") {
        obfs_opts.insert("mode".to_string(), obfs.clone());
    }
    if let Some(host_hdr) = query.get("obfs-host") {
        obfs_opts.insert("host".to_string(), host_hdr.clone());
    }

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Snell)
            .server(host)
            .port(port)
            .password(password)
            .snell(SnellOpts {
                version: query.get("version").and_then(|v| v.parse().ok()),
                obfs_opts: if obfs_opts.is_empty() { None } else { Some(obfs_opts) },
            })
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_and_obfs() {
        let node = parse("snell://pw@host:443?version=4&obfs=http&obfs-host=example.com#N").unwrap();
        assert_eq!(node.password.as_deref(), Some("pw"));
        let snell = node.snell.unwrap();
        assert_eq!(snell.version, Some(4));
        assert_eq!(snell.obfs_opts.unwrap().get("mode").map(String::as_str), Some("http"));
    }
}
