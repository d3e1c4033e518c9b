//! `anytls://` URI 解析.

use crate::ir::{Node, NodeKind};

use super::util::{name_or_default, parse_generic, query_bool, query_map};

pub fn parse(raw: &str) -> Option<Node> {
    let url = parse_generic(raw)?;
    let password = urlencoding::decode(url.username()).ok()?.into_owned();
    let host = url.host_str()?.to_string();
    let port = url.port().unwrap_or(0);
    let query = query_map(&url);
    let name = name_or_default(&url, || format!("AnyTLS {host}:{port}"));

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Anytls)
            .server(host)
            .port(port)
            .password(password)
            .tls(true)
            .maybe_sni(query.get("sni").cloned())
            .maybe_skip_cert_verify(query_bool(&query, "insecure"))
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_password_and_sni() {
        let node = parse("anytls://pass@host:443?sni=sni.com#Any").unwrap();
        assert_eq!(node.name, "Any");
        assert_eq!(node.password.as_deref(), Some("pass"));
        assert_eq!(node.sni.as_deref(), Some("sni.com"));
    }
}
