//! `socks5://`/`socks://` URI 解析，含双重 Base64 回退的 userinfo 解码。

use crate::ir::{Node, NodeKind};
use crate::util::decode_base64_str;

use super::util::{name_or_default, parse_generic};

pub fn parse(raw: &str) -> Option<Node> {
    let (tls, scheme_rest) = if let Some(r) = raw.strip_prefix("socks5+tls://") {
        (true, r)
    } else if let Some(r) = raw.strip_prefix("socks+tls://") {
        (true, r)
    } else if let Some(r) = raw.strip_prefix("socks5://") {
        (false, r)
    } else if let Some(r) = raw.strip_prefix("socks://") {
        (false, r)
    } else {
        return None;
    };

    let url = parse_generic(&format!("socks5://{scheme_rest}"))?;
    let host = url.host_str()?.to_string();
    let port = url.port().unwrap_or(1080);
    let name = name_or_default(&url, || format!("SOCKS5 {host}:{port}"));

    let (username, password) = decode_userinfo(url.username());

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Socks5)
            .server(host)
            .port(port)
            .maybe_username(username)
            .maybe_password(password)
            .tls(tls)
            .build(),
    )
}

/// §4.2: userinfo is Base64 of `user:pass`; if the first decode lacks `:`, decode once more.
fn decode_userinfo(userinfo: &str) -> (Option<String>, Option<String>) {
    if userinfo.is_empty() {
        return (None, None);
    }
    let first = decode_base64_str(userinfo);
    let candidate = match &first {
        Some(s) if s.contains(':') => Some(s.clone()),
        Some(s) => decode_base64_str(s).filter(|s2| s2.contains(':')),
        None => None,
    };
    match candidate.and_then(|c| c.split_once(':').map(|(u, p)| (u.to_string(), p.to_string()))) {
        Some((u, p)) => (Some(u), Some(p)),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn decodes_double_base64_userinfo() {
        let inner = STANDARD.encode("user:pass");
        let outer = STANDARD.encode(&inner);
        let node = parse(&format!("socks5://{outer}@host:1080#N")).unwrap();
        assert_eq!(node.username.as_deref(), Some("user"));
        assert_eq!(node.password.as_deref(), Some("pass"));
    }

    #[test]
    fn decodes_single_base64_userinfo() {
        let encoded = STANDARD.encode("user:pass");
        let node = parse(&format!("socks5://{encoded}@host:1080#N")).unwrap();
        assert_eq!(node.username.as_deref(), Some("user"));
    }
}
