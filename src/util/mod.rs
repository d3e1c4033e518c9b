//! 共享工具函数：Base64 容错解码、IP/端口/UUID 判定、路径格式化、指纹/测速字符串解析。

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};

/// 依次尝试标准/URL-safe/无填充三种 Base64 字母表，容忍上游各种变体。
pub fn decode_base64_lenient(input: &str) -> Option<Vec<u8>> {
    let trimmed = input.trim();
    let normalized = pad_base64(trimmed);
    STANDARD
        .decode(&normalized)
        .or_else(|_| URL_SAFE.decode(&normalized))
        .or_else(|_| URL_SAFE_NO_PAD.decode(trimmed))
        .or_else(|_| STANDARD.decode(trimmed))
        .ok()
}

/// 解码为 UTF-8 字符串，失败返回 `None` 而非 panic。
pub fn decode_base64_str(input: &str) -> Option<String> {
    decode_base64_lenient(input).and_then(|bytes| String::from_utf8(bytes).ok())
}

fn pad_base64(s: &str) -> String {
    let s = s.replace('-', "+").replace('_', "/");
    let rem = s.len() % 4;
    if rem == 0 {
        s
    } else {
        let mut out = s;
        out.push_str(&"=".repeat(4 - rem));
        out
    }
}

/// 仅由 Base64 字母表字符组成(含 `=` 填充)。
pub fn is_base64_alphabet(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_'))
}

/// 去除 IPv6 字面量两侧的中括号包裹；其余原样返回。
pub fn strip_ipv6_brackets(server: &str) -> String {
    server
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(server)
        .to_string()
}

/// 端口解析；超出 1..=65535 或不可解析时返回 0（"unparseable" 哨兵，见 IR 不变式）。
pub fn parse_port(raw: &str) -> u16 {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|p| (1..=65535).contains(p))
        .map(|p| p as u16)
        .unwrap_or(0)
}

/// 确保传输路径以 `/` 开头；空串规整为 `/`。
pub fn normalize_transport_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// 解析 Hysteria 风格的速度字符串 (`"100 Mbps"`, `"50mbps"`, 纯数字) 为 Mbps 整数。
/// 不可解析返回 `None`。
pub fn parse_speed_mbps(raw: &str) -> Option<u64> {
    let raw = raw.trim().to_ascii_lowercase();
    let digits: String = raw
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    let value: f64 = digits.parse().ok()?;
    if raw.contains("gbps") {
        Some((value * 1000.0) as u64)
    } else {
        Some(value as u64)
    }
}

/// 端口跳跃规范 (`N`, `N-M`, 逗号/分号列表) 中的首个端口。
pub fn first_port_from_spec(spec: &str) -> u16 {
    let first_token = spec
        .split(|c| c == ',' || c == ';')
        .next()
        .unwrap_or(spec)
        .trim();
    let head = first_token.split('-').next().unwrap_or(first_token);
    parse_port(head)
}

/// RFC3986 `#fragment` 风格名称解码；空则返回 `None` 由调用方合成默认名。
pub fn decode_fragment_name(fragment: Option<&str>) -> Option<String> {
    fragment
        .filter(|f| !f.is_empty())
        .map(|f| urlencoding::decode(f).map(|c| c.into_owned()).unwrap_or_else(|_| f.to_string()))
}

/// 未提供名称时的合成规则：`"<TYPE> <server>:<port>"`。
pub fn synthesize_name(kind_label: &str, server: &str, port: u16) -> String {
    format!("{kind_label} {server}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_unpadded_base64() {
        let encoded = "aGVsbG8"; // "hello" without padding
        assert_eq!(decode_base64_str(encoded).as_deref(), Some("hello"));
    }

    #[test]
    fn port_out_of_range_is_zero() {
        assert_eq!(parse_port("70000"), 0);
        assert_eq!(parse_port("0"), 0);
        assert_eq!(parse_port("443"), 443);
    }

    #[test]
    fn strips_ipv6_brackets_only_when_wrapped() {
        assert_eq!(strip_ipv6_brackets("[::1]"), "::1");
        assert_eq!(strip_ipv6_brackets("example.com"), "example.com");
    }

    #[test]
    fn first_port_handles_ranges_and_lists() {
        assert_eq!(first_port_from_spec("1000-2000"), 1000);
        assert_eq!(first_port_from_spec("1000,2000;3000"), 1000);
        assert_eq!(first_port_from_spec("1234"), 1234);
    }

    #[test]
    fn speed_parses_unit_suffixes() {
        assert_eq!(parse_speed_mbps("100 Mbps"), Some(100));
        assert_eq!(parse_speed_mbps("1 Gbps"), Some(1000));
    }
}
