//! URI 解析器共享的小工具：通用 URI 切分、query 映射、fragment 命名回退。

use std::collections::HashMap;

use url::Url;

use crate::util::decode_fragment_name;

/// 用 [`url::Url`] 做尽力而为的通用解析；大多数代理 URI 方案都遵循
/// `scheme://userinfo@host:port?query#fragment` 的通用语法，足以喂给标准 URL 解析器。
pub fn parse_generic(raw: &str) -> Option<Url> {
    Url::parse(raw.trim()).ok()
}

/// query pairs 拍平为 `HashMap`，后出现的键覆盖先出现的（与大多数实现一致）。
pub fn query_map(url: &Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub fn name_or_default(url: &Url, fallback: impl FnOnce() -> String) -> String {
    decode_fragment_name(url.fragment()).unwrap_or_else(fallback)
}

/// 按 `,` 或 `;` 切分的三段整数，用于 `reserved=1,2,3` 这类查询参数。
pub fn parse_u8_triplet(raw: &str) -> Option<[u8; 3]> {
    let parts: Vec<u8> = raw
        .split(|c| c == ',' || c == ';')
        .filter_map(|p| p.trim().parse::<u8>().ok())
        .collect();
    parts.try_into().ok()
}

pub fn query_bool(map: &HashMap<String, String>, key: &str) -> Option<bool> {
    map.get(key).map(|v| matches!(v.as_str(), "1" | "true"))
}
