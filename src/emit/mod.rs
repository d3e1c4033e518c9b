//! 发射层：针对十种目标格式的编码器，外加共享的支持矩阵与转义规则（§4.6）。

pub mod clash;
pub mod loon;
pub mod quantumultx;
pub mod singbox;
pub mod surge;
pub mod uri;

use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::core::error::Result;
use crate::ir::{Node, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Target {
    Uri,
    Base64,
    #[strum(serialize = "v2ray")]
    V2ray,
    Clash,
    #[strum(serialize = "clashmeta")]
    ClashMeta,
    Mihomo,
    Stash,
    #[strum(serialize = "singbox")]
    Singbox,
    Surge,
    Surfboard,
    Loon,
    #[strum(serialize = "quanx")]
    Quanx,
    Shadowrocket,
}

impl Target {
    /// §4.7 步骤 1：User-Agent 子串 → target 的有序匹配表。
    pub fn from_user_agent(ua: &str) -> Option<Target> {
        let ua = ua.to_ascii_lowercase();
        let table: &[(&str, Target)] = &[
            ("clash-verge", Target::Mihomo),
            ("clash.meta", Target::Mihomo),
            ("flclash", Target::Mihomo),
            ("stash", Target::Stash),
            ("mihomo", Target::Mihomo),
            ("sing-box", Target::Singbox),
            ("shadowrocket", Target::Shadowrocket),
            ("v2rayng", Target::V2ray),
            ("v2rayn", Target::V2ray),
            ("surfboard", Target::Surfboard),
            ("surge", Target::Surge),
            ("loon", Target::Loon),
            ("quantumult%20x", Target::Quanx),
            ("quantumultx", Target::Quanx),
            ("quantumult", Target::Quanx),
        ];
        table.iter().find(|(needle, _)| ua.contains(needle)).map(|(_, t)| *t)
    }

    pub fn parse_query(raw: &str) -> Option<Target> {
        Target::from_str(&raw.to_ascii_lowercase()).ok()
    }

    /// §4.7 步骤 6: targets excluded from external-converter delegation.
    pub fn is_simple(self) -> bool {
        matches!(self, Target::Uri | Target::Base64 | Target::V2ray)
    }

    pub fn wraps_base64(self) -> bool {
        matches!(self, Target::Base64 | Target::V2ray)
    }

    /// §4.6 协议支持矩阵（权威表）。
    pub fn supports(self, kind: NodeKind) -> bool {
        use NodeKind::*;
        match self {
            Target::Clash => matches!(
                kind,
                Ss | Ssr | Vmess | Vless | Socks5 | Http | Snell | Trojan | Wireguard | Anytls
            ),
            Target::ClashMeta | Target::Mihomo | Target::Stash => matches!(
                kind,
                Ss | Ssr
                    | Vmess
                    | Vless
                    | Socks5
                    | Http
                    | Snell
                    | Trojan
                    | Wireguard
                    | Anytls
                    | Hysteria
                    | Hysteria2
                    | Tuic
            ),
            Target::Singbox => matches!(
                kind,
                Ss | Vmess | Vless | Trojan | Hysteria | Hysteria2 | Tuic | Wireguard | Socks5 | Http
            ),
            Target::Surge | Target::Surfboard => matches!(
                kind,
                Ss | Vmess | Trojan | Hysteria2 | Tuic | Wireguard | Socks5 | Http | Snell | Anytls
            ),
            Target::Loon => matches!(
                kind,
                Ss | Ssr | Vmess | Vless | Trojan | Hysteria2 | Tuic | Wireguard | Socks5 | Http | Snell
            ),
            Target::Quanx => matches!(
                kind,
                Ss | Ssr | Vmess | Vless | Trojan | Hysteria2 | Wireguard | Socks5 | Http
            ),
            Target::Shadowrocket => matches!(
                kind,
                Ss | Ssr | Vmess | Vless | Trojan | Hysteria | Hysteria2 | Tuic | Socks5 | Http
            ),
            Target::Uri | Target::Base64 | Target::V2ray => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub include_unsupported_proxy: bool,
}

/// 根据目标分派到具体发射器；返回值永不因单节点失败而整体出错（顶层序列化错误除外，§4.6 (failure semantics)）。
pub fn emit(target: Target, nodes: &[Node], opts: &EmitOptions) -> Result<String> {
    let body = match target {
        Target::Uri | Target::Base64 | Target::V2ray => uri::emit(nodes, opts),
        Target::Clash => clash::emit(nodes, clash::Dialect::Clash, opts)?,
        Target::ClashMeta => clash::emit(nodes, clash::Dialect::ClashMeta, opts)?,
        Target::Mihomo => clash::emit(nodes, clash::Dialect::Mihomo, opts)?,
        Target::Stash => clash::emit(nodes, clash::Dialect::Stash, opts)?,
        Target::Shadowrocket => clash::emit(nodes, clash::Dialect::Shadowrocket, opts)?,
        Target::Singbox => singbox::emit(nodes, opts)?,
        Target::Surge => surge::emit(nodes, surge::Dialect::Surge, opts),
        Target::Surfboard => surge::emit(nodes, surge::Dialect::Surfboard, opts),
        Target::Loon => loon::emit(nodes, opts),
        Target::Quanx => quantumultx::emit(nodes, opts),
    };

    if target.wraps_base64() {
        use base64::Engine;
        Ok(base64::engine::general_purpose::STANDARD.encode(body))
    } else {
        Ok(body)
    }
}

/// 名称中的逗号/等号按目标惯例转义：默认以双引号整体包裹。
pub fn quote_if_needed(value: &str) -> String {
    if value.contains(',') || value.contains('=') || value.contains(' ') {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// `alpn` 归一化为 CSV，供行式目标使用；JSON/YAML 目标直接使用数组形式。
pub fn alpn_csv(alpn: &Option<Vec<String>>) -> Option<String> {
    alpn.as_ref().filter(|a| !a.is_empty()).map(|a| a.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_table_prefers_mihomo_over_bare_clash() {
        assert_eq!(Target::from_user_agent("ClashMetaForAndroid/clash.meta"), Some(Target::Mihomo));
    }

    #[test]
    fn simple_targets_skip_external_converter() {
        assert!(Target::Base64.is_simple());
        assert!(!Target::Clash.is_simple());
    }

    #[test]
    fn clash_excludes_hysteria2() {
        assert!(!Target::Clash.supports(NodeKind::Hysteria2));
        assert!(Target::ClashMeta.supports(NodeKind::Hysteria2));
    }
}
