//! 解析层入口：按探测到的格式分派到容器解析器或逐行 URI 解析器。
//!
//! `parse_body` 对应从 detector 输出到规范节点向量的整段流程（§2 数据流中的
//! `detector → parser` 一跳）；`normalize`/`process` 是独立的后续阶段。

pub mod container;
pub mod uri;

use crate::detect::{self, Format};
use crate::ir::Node;

/// 总是返回向量，从不因单个坏条目而失败（§8："parse is total"）。
pub fn parse_body(body: &str) -> Vec<Node> {
    match detect::detect(body) {
        Format::Html | Format::Unknown => parse_as_uri_list(body),
        Format::Sip008 => container::sip008::parse(body),
        Format::Clash => container::clash::parse(body),
        Format::Base64 => crate::util::decode_base64_str(body.trim())
            .map(|decoded| parse_as_uri_list(&decoded))
            .unwrap_or_default(),
        Format::Surge => container::line::parse(body, container::line::LineDialect::Surge),
        Format::Loon => container::line::parse(body, container::line::LineDialect::Loon),
        Format::Qx => container::line::parse(body, container::line::LineDialect::Qx),
        Format::UriList => parse_as_uri_list(body),
    }
}

fn parse_as_uri_list(body: &str) -> Vec<Node> {
    body.lines().filter_map(uri::parse_line).collect()
}

/// 单条原始编码（订阅清单里的"手动节点"）直接按 URI 解析，不经过探测器。
pub fn parse_manual_node(raw: &str) -> Option<Node> {
    uri::parse_line(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_interception_yields_zero_nodes() {
        assert!(parse_body("<!DOCTYPE html><html></html>").is_empty());
    }

    #[test]
    fn empty_body_yields_zero_nodes() {
        assert!(parse_body("").is_empty());
    }

    #[test]
    fn uri_list_parses_each_line() {
        let body = "ss://YWVzLTEyOC1nY206cGFzc3dvcmQ=@server:443#Node1\ntrojan://pw@host:443#Node2";
        assert_eq!(parse_body(body).len(), 2);
    }
}
