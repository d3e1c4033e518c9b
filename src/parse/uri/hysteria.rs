//! `hysteria://` (v1) 与 `hysteria2://`/`hy2://` (v2) URI 解析。

use crate::ir::{HysteriaOpts, Node, NodeKind};
use crate::util::first_port_from_spec;

use super::util::{name_or_default, parse_generic, query_bool, query_map};

pub fn parse_v1(raw: &str) -> Option<Node> {
    let url = parse_generic(raw)?;
    let host = url.host_str()?.to_string();
    let port = url.port().unwrap_or(0);
    let query = query_map(&url);
    let name = name_or_default(&url, || format!("Hysteria {host}:{port}"));

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Hysteria)
            .server(host)
            .port(port)
            .maybe_auth(query.get("auth").cloned())
            .tls(true)
            .maybe_sni(query.get("peer").cloned().or_else(|| query.get("sni").cloned()))
            .maybe_skip_cert_verify(query_bool(&query, "insecure"))
            .maybe_alpn(query.get("alpn").map(|a| a.split(',').map(str::to_string).collect()))
            .hysteria(HysteriaOpts {
                up: query.get("upmbps").or_else(|| query.get("up")).cloned(),
                down: query.get("downmbps").or_else(|| query.get("down")).cloned(),
                obfs: query.get("obfs").cloned(),
                obfs_password: query.get("obfsParam").or_else(|| query.get("obfs-password")).cloned(),
                ports: None,
                recv_window_conn: query.get("recvWindowConn").and_then(|v| v.parse().ok()),
                recv_window: query.get("recvWindow").and_then(|v| v.parse().ok()),
            })
            .build(),
    )
}

/// Port-hopping aware: `hy2://pass@host:N`, `host:N-M`, or `host:N,M;K`.
pub fn parse_v2(raw: &str) -> Option<Node> {
    let body = raw
        .strip_prefix("hysteria2://")
        .or_else(|| raw.strip_prefix("hy2://"))?;

    let (before_fragment, fragment) = match body.split_once('#') {
        Some((b, f)) => (b, Some(f)),
        None => (body, None),
    };
    let (before_query, query_str) = match before_fragment.split_once('?') {
        Some((b, q)) => (b, Some(q)),
        None => (before_fragment, None),
    };
    let (userinfo, hostportspec) = before_query.split_once('@')?;
    let password = urlencoding::decode(userinfo).ok()?.into_owned();
    let (host, portspec) = hostportspec.rsplit_once(':')?;
    let port = first_port_from_spec(portspec);

    let query: std::collections::HashMap<String, String> = query_str
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    let name = crate::util::decode_fragment_name(fragment)
        .unwrap_or_else(|| format!("Hysteria2 {host}:{port}"));

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Hysteria2)
            .server(host.to_string())
            .port(port)
            .password(password)
            .tls(true)
            .maybe_sni(query.get("sni").cloned())
            .maybe_skip_cert_verify(query.get("insecure").map(|v| v == "1" || v == "true"))
            .hysteria(HysteriaOpts {
                up: query.get("up").cloned(),
                down: query.get("down").cloned(),
                obfs: query.get("obfs").cloned(),
                obfs_password: query.get("obfs-password").cloned(),
                ports: (portspec.contains('-') || portspec.contains(',') || portspec.contains(';'))
                    .then(|| portspec.to_string()),
                recv_window_conn: None,
                recv_window: None,
            })
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_parses_salamander_obfs_and_speeds() {
        let node = parse_v2(
            "hysteria2://pass@host:1234?insecure=1&obfs=salamander&obfs-password=obfspass&up=100&down=200#Hy2Node",
        )
        .unwrap();
        assert_eq!(node.name, "Hy2Node");
        assert_eq!(node.server, "host");
        assert_eq!(node.port, 1234);
        assert_eq!(node.password.as_deref(), Some("pass"));
        assert!(node.tls);
        let hy = node.hysteria.unwrap();
        assert_eq!(hy.obfs.as_deref(), Some("salamander"));
        assert_eq!(hy.obfs_password.as_deref(), Some("obfspass"));
        assert_eq!(hy.up.as_deref(), Some("100"));
        assert_eq!(hy.down.as_deref(), Some("200"));
    }

    #[test]
    fn v2_port_hopping_keeps_first_port() {
        let node = parse_v2("hy2://pass@host:1000-2000#N").unwrap();
        assert_eq!(node.port, 1000);
        assert_eq!(node.hysteria.unwrap().ports.as_deref(), Some("1000-2000"));
    }
}
