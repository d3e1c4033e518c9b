//! 令牌与管理员会话校验 (§6)。
//!
//! 订阅令牌按字符串相等比较，不解析任何结构——旧版本的 token 里混入过
//! 冒号分隔的元数据，这里延续"按值比较，不校验格式"的宽松策略。比较本身
//! 走 blake3 摘要而非裸 `==`，避免逐字节提前退出的计时侧信道。

use crate::core::config::SubSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    /// 匹配 `mytoken`：可访问完整订阅与任意 profile。
    Full,
    /// 匹配 `profile_token`：仅可访问 profile 路径。
    ProfileOnly,
}

/// Constant-time-ish equality: `blake3::Hash`'s `PartialEq` runs in constant
/// time for its fixed 32-byte output, so hashing both sides first removes the
/// length- and byte-position-dependent timing signal a plain `==` leaks.
fn secure_eq(a: &str, b: &str) -> bool {
    blake3::hash(a.as_bytes()) == blake3::hash(b.as_bytes())
}

pub fn resolve_token_scope(settings: &SubSettings, token: &str) -> Option<TokenScope> {
    if secure_eq(token, &settings.mytoken) {
        Some(TokenScope::Full)
    } else if secure_eq(token, &settings.profile_token) {
        Some(TokenScope::ProfileOnly)
    } else {
        None
    }
}

/// 管理员接口的承载令牌校验；会话令牌即应用密钥本身的十六进制前缀比较。
pub fn validate_admin_bearer(app_secret: &str, header_value: Option<&str>) -> bool {
    match header_value.and_then(|v| v.strip_prefix("Bearer ")) {
        Some(token) => secure_eq(token, app_secret),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SubSettings {
        SubSettings {
            mytoken: "full-token".into(),
            profile_token: "profile-token".into(),
            ..Default::default()
        }
    }

    #[test]
    fn full_token_resolves_full_scope() {
        assert_eq!(resolve_token_scope(&settings(), "full-token"), Some(TokenScope::Full));
    }

    #[test]
    fn profile_token_resolves_profile_scope() {
        assert_eq!(resolve_token_scope(&settings(), "profile-token"), Some(TokenScope::ProfileOnly));
    }

    #[test]
    fn unknown_token_resolves_none() {
        assert_eq!(resolve_token_scope(&settings(), "garbage"), None);
    }

    #[test]
    fn bearer_header_must_match_secret_exactly() {
        assert!(validate_admin_bearer("secret", Some("Bearer secret")));
        assert!(!validate_admin_bearer("secret", Some("Bearer wrong")));
        assert!(!validate_admin_bearer("secret", None));
    }
}
