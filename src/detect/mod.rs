//! 格式探测器：将原始上游响应体归类为 [`Format`] 之一，驱动后续容器/URI 解析分派。

use regex::Regex;
use std::sync::LazyLock;

use crate::util::is_base64_alphabet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Html,
    Sip008,
    Clash,
    Base64,
    Surge,
    Loon,
    Qx,
    UriList,
    Unknown,
}

static CLASH_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*-\s*(name|type|server):").expect("static clash line regex")
});

const URI_SCHEMES: &[&str] = &[
    "ss://", "ssr://", "vmess://", "vless://", "trojan://", "hysteria://", "hysteria2://",
    "hy2://", "tuic://", "wireguard://", "wg://", "snell://", "anytls://", "naive+https://",
    "naive+http://", "socks5://", "socks://", "http://", "https://",
];

/// §4.1 的有序规则链；第一条命中即返回。
pub fn detect(body: &str) -> Format {
    let stripped = body.trim_start_matches('\u{feff}').trim();
    if stripped.is_empty() {
        return Format::Unknown;
    }

    let lower = stripped.to_ascii_lowercase();
    if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
        return Format::Html;
    }

    if stripped.starts_with('{') && stripped.contains("\"version\"") && stripped.contains("\"servers\"") {
        return Format::Sip008;
    }

    if lower.contains("proxies:")
        || lower.contains("proxy-groups:")
        || lower.contains("rule-providers:")
        || lower.contains("rules:")
        || lower.contains("mixed-port:")
        || CLASH_LINE.is_match(stripped)
    {
        return Format::Clash;
    }

    let compact: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() >= 16
        && compact.len() % 4 == 0
        && is_base64_alphabet(&compact)
        && crate::util::decode_base64_str(&compact)
            .map(|decoded| URI_SCHEMES.iter().any(|scheme| decoded.contains(scheme)))
            .unwrap_or(false)
    {
        return Format::Base64;
    }

    if let Some(first_line) = stripped.lines().find(|l| {
        let t = l.trim();
        !t.is_empty() && !t.starts_with('#') && !t.starts_with("//")
    }) {
        if first_line.contains('=') && first_line.contains(',') {
            if let Some(fmt) = classify_line_grammar(first_line) {
                return fmt;
            }
        }
    }

    if stripped.lines().any(|l| {
        let t = l.trim();
        URI_SCHEMES.iter().any(|scheme| t.starts_with(scheme))
    }) {
        return Format::UriList;
    }

    Format::Unknown
}

/// QX: `name = type,server,port,...` (type 紧跟在第一个 `=` 右侧的已知协议词之前不成立，
/// QX 把类型放在等号右侧第一个字段); Surge/Loon: 等号右侧以已知类型词开头。
fn classify_line_grammar(line: &str) -> Option<Format> {
    let (_, rhs) = line.split_once('=')?;
    let first_field = rhs.split(',').next()?.trim();
    const TYPE_WORDS: &[&str] = &[
        "ss", "shadowsocks", "ssr", "vmess", "vless", "trojan", "hysteria", "hysteria2", "tuic",
        "wireguard", "snell", "anytls", "socks5", "socks5-tls", "http", "https",
    ];
    if TYPE_WORDS.contains(&first_field.to_ascii_lowercase().as_str()) {
        // QX puts the type as the first rhs field with `=` style too; disambiguate
        // via a QX-only marker key that Surge/Loon don't use.
        if line.contains("server=") || line.contains("obfs-host=") {
            return Some(Format::Qx);
        }
        return Some(Format::Surge);
    }
    if rhs.contains("peers=[") || line.contains("transport=") {
        return Some(Format::Loon);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_unknown() {
        assert_eq!(detect("   \n  "), Format::Unknown);
    }

    #[test]
    fn html_signals_interception() {
        assert_eq!(detect("<!DOCTYPE html><html></html>"), Format::Html);
    }

    #[test]
    fn sip008_json() {
        let body = r#"{"version":1,"servers":[{"server":"a","server_port":1}]}"#;
        assert_eq!(detect(body), Format::Sip008);
    }

    #[test]
    fn clash_yaml_proxies_key() {
        assert_eq!(detect("proxies:\n  - name: a\n    type: ss\n"), Format::Clash);
    }

    #[test]
    fn plain_uri_list() {
        assert_eq!(detect("ss://abc#Node1\ntrojan://x@y:443#Node2"), Format::UriList);
    }
}
