//! `tuic://` URI 解析。userinfo 为 `uuid:password`；仅 `uuid@` 时密码缺省。

use crate::ir::{Node, NodeKind, TuicOpts};

use super::util::{name_or_default, parse_generic, query_map};

pub fn parse(raw: &str) -> Option<Node> {
    let url = parse_generic(raw)?;
    let uuid = url.username().to_string();
    if uuid.is_empty() {
        return None;
    }
    let password = url.password().map(str::to_string);
    let host = url.host_str()?.to_string();
    let port = url.port().unwrap_or(0);
    let query = query_map(&url);
    let name = name_or_default(&url, || format!("TUIC {host}:{port}"));

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Tuic)
            .server(host)
            .port(port)
            .uuid(uuid)
            .maybe_password(password)
            .tls(true)
            .maybe_sni(query.get("sni").cloned())
            .maybe_alpn(query.get("alpn").map(|a| a.split(',').map(str::to_string).collect()))
            .tuic(TuicOpts {
                congestion_controller: query.get("congestion_control").cloned(),
                udp_relay_mode: query.get("udp_relay_mode").cloned(),
                reduce_rtt: query.get("reduce_rtt").map(|v| v == "1" || v == "true"),
                max_udp_relay_packet_size: query
                    .get("max_udp_relay_packet_size")
                    .and_then(|v| v.parse().ok()),
            })
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_optional_when_only_uuid_given() {
        let node = parse("tuic://uuid@host:443#N").unwrap();
        assert_eq!(node.uuid.as_deref(), Some("uuid"));
        assert!(node.password.is_none());
    }

    #[test]
    fn splits_uuid_and_password() {
        let node = parse("tuic://uuid:pw@host:443#N").unwrap();
        assert_eq!(node.uuid.as_deref(), Some("uuid"));
        assert_eq!(node.password.as_deref(), Some("pw"));
    }
}
