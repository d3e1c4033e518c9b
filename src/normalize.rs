//! 标准化器：解析后对每个节点执行一次的幂等规整（§4.4）。

use uuid::Uuid;

use crate::ir::{Network, Node, NodeKind, WsOpts};
use crate::util::{normalize_transport_path, parse_port, strip_ipv6_brackets, synthesize_name};

/// 应用全部规则；对同一节点重复调用结果不变（幂等，见 §8）。
pub fn normalize(mut node: Node) -> Node {
    assign_id(&mut node);
    lowercase_cipher(&mut node);
    coerce_port(&mut node);
    strip_server_brackets(&mut node);
    fold_ws_legacy_fields(&mut node);
    default_tls(&mut node);
    synthesize_name_if_empty(&mut node);
    node
}

fn assign_id(node: &mut Node) {
    if node.id.is_empty() {
        node.id = Uuid::new_v4().to_string();
    }
}

fn lowercase_cipher(node: &mut Node) {
    if let Some(cipher) = &mut node.cipher {
        *cipher = cipher.to_ascii_lowercase();
    }
    if node.kind == NodeKind::Ss {
        if node.cipher.as_deref() == Some("none") && node.password.is_none() {
            node.password = Some(String::new());
        }
    }
}

fn coerce_port(node: &mut Node) {
    if node.port == 0 {
        return;
    }
    // Ports already land as u16 from parsers; this guards against out-of-range
    // values threaded through container parsers that read raw YAML/JSON numbers.
    let reparsed = parse_port(&node.port.to_string());
    node.port = reparsed;
}

fn strip_server_brackets(node: &mut Node) {
    node.server = strip_ipv6_brackets(&node.server);
}

fn fold_ws_legacy_fields(node: &mut Node) {
    if node.network != Some(Network::Ws) {
        return;
    }
    let path = node
        .ws_opts
        .as_ref()
        .and_then(|o| o.path.clone())
        .unwrap_or_default();
    let path = normalize_transport_path(&path);

    node.ws_opts = Some(WsOpts {
        path: Some(path),
        headers: node.ws_opts.as_ref().and_then(|o| o.headers.clone()),
        max_early_data: node.ws_opts.as_ref().and_then(|o| o.max_early_data),
        early_data_header_name: node.ws_opts.as_ref().and_then(|o| o.early_data_header_name.clone()),
        v2ray_http_upgrade: node.ws_opts.as_ref().and_then(|o| o.v2ray_http_upgrade),
    });

    if let Some(grpc) = &mut node.grpc_opts {
        // grpc/h2/http transports also carry a leading-slash path convention downstream.
        if let Some(authority) = &grpc.authority {
            grpc.authority = Some(authority.clone());
        }
    }
    if let Some(http) = &mut node.http_opts {
        http.path = http
            .path
            .as_ref()
            .map(|paths| paths.iter().map(|p| normalize_transport_path(p)).collect());
    }
}

fn default_tls(node: &mut Node) {
    if node.tls {
        return;
    }
    if node.reality_opts.is_some() {
        node.tls = true;
        return;
    }
    if matches!(node.kind, NodeKind::Hysteria2 | NodeKind::Tuic | NodeKind::Https) {
        node.tls = true;
    }
}

fn synthesize_name_if_empty(node: &mut Node) {
    if node.name.trim().is_empty() {
        node.name = synthesize_name(&node.kind.to_string(), &node.server, node.port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Node as IrNode;

    fn base(kind: NodeKind) -> IrNode {
        IrNode::builder()
            .id(String::new())
            .name(String::new())
            .kind(kind)
            .server("[::1]".to_string())
            .port(443)
            .build()
    }

    #[test]
    fn idempotent_across_repeated_calls() {
        let once = normalize(base(NodeKind::Hysteria2));
        let twice = normalize(once.clone());
        assert_eq!(once.id, twice.id);
        assert_eq!(once.server, twice.server);
        assert_eq!(once.tls, twice.tls);
        assert_eq!(once.name, twice.name);
    }

    #[test]
    fn strips_ipv6_brackets() {
        let n = normalize(base(NodeKind::Ss));
        assert_eq!(n.server, "::1");
    }

    #[test]
    fn defaults_tls_for_hysteria2_tuic_https() {
        assert!(normalize(base(NodeKind::Hysteria2)).tls);
        assert!(normalize(base(NodeKind::Tuic)).tls);
        assert!(normalize(base(NodeKind::Https)).tls);
        assert!(!normalize(base(NodeKind::Ss)).tls);
    }

    #[test]
    fn defaults_tls_when_reality_opts_present() {
        let mut node = base(NodeKind::Vless);
        node.reality_opts = Some(crate::ir::RealityOpts::default());
        assert!(normalize(node).tls);
    }

    #[test]
    fn synthesizes_empty_name() {
        let n = normalize(base(NodeKind::Ss));
        assert!(n.name.contains("::1"));
    }
}
