//! `ssr://` ShadowsocksR URI 解析。

use std::collections::HashMap;

use crate::ir::{Node, NodeKind};
use crate::util::{decode_base64_str, parse_port, synthesize_name};

pub fn parse(raw: &str) -> Option<Node> {
    let body = raw.strip_prefix("ssr://")?;
    let decoded = decode_base64_str(body)?;

    let (main, params_raw) = match decoded.split_once('/') {
        Some((m, rest)) => (m, rest.strip_prefix('?').unwrap_or(rest)),
        None => (decoded.as_str(), ""),
    };

    let mut it = main.splitn(6, ':');
    let server = it.next()?.to_string();
    let port = parse_port(it.next()?);
    let protocol = it.next()?.to_string();
    let method = it.next()?.to_ascii_lowercase();
    let obfs = it.next()?.to_string();
    let password_b64 = it.next()?.to_string();
    let password = decode_base64_str(&password_b64).unwrap_or(password_b64);

    let params: HashMap<String, String> = url::form_urlencoded::parse(params_raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let name = params
        .get("remarks")
        .and_then(|b| decode_base64_str(b))
        .unwrap_or_else(|| synthesize_name("SSR", &server, port));

    let protocol_param = params.get("protoparam").and_then(|b| decode_base64_str(b));
    let obfs_param = params.get("obfsparam").and_then(|b| decode_base64_str(b));

    // SSR's protocol/obfs/protocol-param/obfs-param have no dedicated IR tier (only
    // ss/hysteria/tuic/wireguard/snell get protocol-specific groups); fold them into
    // the auth `auth` slot as a compact descriptor so emitters that care (Clash, QX)
    // can still recover them, matching how §3 leaves ssr otherwise unmodeled.
    let auth = format!(
        "protocol={protocol};obfs={obfs}{}{}",
        protocol_param
            .as_deref()
            .map(|p| format!(";protocol-param={p}"))
            .unwrap_or_default(),
        obfs_param
            .as_deref()
            .map(|o| format!(";obfs-param={o}"))
            .unwrap_or_default()
    );

    Some(
        Node::builder()
            .id(String::new())
            .name(name)
            .kind(NodeKind::Ssr)
            .server(server)
            .port(port)
            .cipher(method)
            .password(password)
            .auth(auth)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn parses_core_colon_fields() {
        let main = "server:8388:origin:aes-128-cfb:plain:cGFzc3dvcmQ"; // base64("password")
        let encoded = URL_SAFE_NO_PAD.encode(main);
        let node = parse(&format!("ssr://{encoded}")).unwrap();
        assert_eq!(node.server, "server");
        assert_eq!(node.port, 8388);
        assert_eq!(node.cipher.as_deref(), Some("aes-128-cfb"));
        assert_eq!(node.password.as_deref(), Some("password"));
    }
}
