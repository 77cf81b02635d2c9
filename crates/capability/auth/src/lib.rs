//! 认证能力：access token 签发与校验。

mod jwt;

use domain::TenantContext;

pub use jwt::JwtManager;

/// 认证相关错误。
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,
    #[error("token invalid")]
    TokenInvalid,
    #[error("internal error: {0}")]
    Internal(String),
}

/// 签发返回的 token 结构。
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub token_id: String,
    pub expires_at: u64,
}

/// 令牌校验 trait，HTTP 与 WebSocket 入口共用，便于替换实现与测试。
pub trait TokenVerifier: Send + Sync {
    fn verify_access_token(&self, token: &str) -> Result<TenantContext, AuthError>;
}

impl TokenVerifier for JwtManager {
    fn verify_access_token(&self, token: &str) -> Result<TenantContext, AuthError> {
        self.decode_access(token)
    }
}
