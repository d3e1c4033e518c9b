//! 处理器：过滤 → 去重 → 前缀重命名（§4.5），保持每一步内部的稳定顺序。

use regex::{Regex, RegexBuilder};

use crate::ir::Node;

#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub include_rules: Vec<String>,
    pub exclude_rules: Vec<String>,
    /// 旧式单字符串过滤语法：按换行切分，`keep:` 前缀的行归入 include。
    pub legacy_exclude: Option<String>,
    pub dedupe: bool,
    pub prepend_sub_name: bool,
    pub subscription_name: Option<String>,
}

impl ProcessOptions {
    fn resolved_include(&self) -> Vec<String> {
        let mut out = self.include_rules.clone();
        if let Some(legacy) = &self.legacy_exclude {
            for line in legacy.lines() {
                if let Some(rule) = line.trim().strip_prefix("keep:") {
                    out.push(rule.trim().to_string());
                }
            }
        }
        out
    }

    fn resolved_exclude(&self) -> Vec<String> {
        let mut out = self.exclude_rules.clone();
        if let Some(legacy) = &self.legacy_exclude {
            for line in legacy.lines() {
                let trimmed = line.trim();
                if !trimmed.is_empty() && !trimmed.starts_with("keep:") {
                    out.push(trimmed.to_string());
                }
            }
        }
        out
    }
}

pub fn process(nodes: Vec<Node>, opts: &ProcessOptions) -> Vec<Node> {
    let filtered = filter(nodes, opts);
    let deduped = if opts.dedupe { dedupe(filtered) } else { filtered };
    prepend(deduped, opts)
}

fn filter(nodes: Vec<Node>, opts: &ProcessOptions) -> Vec<Node> {
    let include = opts.resolved_include();
    let exclude = opts.resolved_exclude();
    nodes
        .into_iter()
        .filter(|n| {
            let excluded = exclude.iter().any(|rule| rule_matches(rule, n));
            if excluded {
                return false;
            }
            include.is_empty() || include.iter().any(|rule| rule_matches(rule, n))
        })
        .collect()
}

/// `proto:a,b,c` matches by node type; otherwise treat the rule as a name regex
/// (honoring a leading `(?i)` flag), falling back to case-insensitive substring match.
fn rule_matches(rule: &str, node: &Node) -> bool {
    if let Some(protos) = rule.strip_prefix("proto:") {
        let kind = node.kind.to_string();
        return protos.split(',').any(|p| p.trim().eq_ignore_ascii_case(&kind));
    }

    let (case_insensitive, pattern) = match rule.strip_prefix("(?i)") {
        Some(rest) => (true, rest),
        None => (false, rule),
    };

    match build_regex(pattern, case_insensitive) {
        Some(re) => re.is_match(&node.name),
        None => node.name.to_ascii_lowercase().contains(&pattern.to_ascii_lowercase()),
    }
}

fn build_regex(pattern: &str, case_insensitive: bool) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .ok()
}

/// 按指纹去重；同指纹多节点间保留名称较短者（见 §4.5）。
fn dedupe(nodes: Vec<Node>) -> Vec<Node> {
    let mut best: Vec<Node> = Vec::new();
    let mut index_of: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for node in nodes {
        let fp = node.fingerprint();
        if let Some(&idx) = index_of.get(&fp) {
            if node.name.len() < best[idx].name.len() {
                best[idx] = node;
            }
            continue;
        }
        index_of.insert(fp, best.len());
        best.push(node);
    }
    best
}

fn prepend(nodes: Vec<Node>, opts: &ProcessOptions) -> Vec<Node> {
    let Some(sub_name) = opts.subscription_name.as_ref().filter(|s| opts.prepend_sub_name && !s.is_empty())
    else {
        return nodes;
    };
    let prefix = format!("{sub_name} - ");
    nodes
        .into_iter()
        .map(|mut n| {
            if !n.name.starts_with(&prefix) {
                n.name = format!("{prefix}{}", n.name);
            }
            n
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::NodeKind;

    fn node(name: &str, kind: NodeKind, server: &str, port: u16, secret: &str) -> Node {
        Node::builder()
            .id(String::new())
            .name(name.to_string())
            .kind(kind)
            .server(server.to_string())
            .port(port)
            .password(secret.to_string())
            .build()
    }

    #[test]
    fn dedupe_keeps_shorter_name() {
        let nodes = vec![
            node("Node1", NodeKind::Ss, "server", 443, "pw"),
            node("Node1-Dup", NodeKind::Ss, "server", 443, "pw"),
        ];
        let out = dedupe(nodes);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Node1");
    }

    #[test]
    fn filter_excludes_by_name_substring_fallback() {
        let nodes = vec![
            node("Node1", NodeKind::Ss, "s", 1, "a"),
            node("Node3", NodeKind::Trojan, "s", 1, "b"),
        ];
        let opts = ProcessOptions {
            legacy_exclude: Some("Node3".to_string()),
            ..Default::default()
        };
        let out = filter(nodes, &opts);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Node1");
    }

    #[test]
    fn proto_rule_matches_by_type() {
        let nodes = vec![
            node("A", NodeKind::Ss, "s", 1, "a"),
            node("B", NodeKind::Trojan, "s", 1, "b"),
        ];
        let opts = ProcessOptions {
            exclude_rules: vec!["proto:trojan".to_string()],
            ..Default::default()
        };
        let out = filter(nodes, &opts);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "A");
    }

    #[test]
    fn ordering_is_filter_then_dedupe_then_prepend() {
        let nodes = vec![
            node("Node1", NodeKind::Ss, "server", 443, "pw"),
            node("Node2", NodeKind::Trojan, "server2", 443, "pw2"),
            node("Node1-Dup", NodeKind::Ss, "server", 443, "pw"),
        ];
        let opts = ProcessOptions {
            legacy_exclude: Some("Node3".to_string()),
            dedupe: true,
            ..Default::default()
        };
        let out = process(nodes, &opts);
        assert_eq!(out.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(), vec!["Node1", "Node2"]);
    }
}
