use crate::{AccessToken, AuthError};
use domain::TenantContext;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Serialize, Deserialize)]
/// JWT 内部 claims。
struct Claims {
    sub: String,
    tenant_id: String,
    roles: Vec<String>,
    permissions: Vec<String>,
    #[serde(default)]
    dept_id: Option<String>,
    #[serde(default)]
    is_superuser: bool,
    exp: usize,
    token_type: String,
    jti: String,
}

/// JWT 生成与校验。
pub struct JwtManager {
    secret: Vec<u8>,
    access_ttl_seconds: u64,
}

impl JwtManager {
    /// 创建 JWT 管理器。
    pub fn new(secret: String, access_ttl_seconds: u64) -> Self {
        Self {
            secret: secret.into_bytes(),
            access_ttl_seconds,
        }
    }

    /// 基于 TenantContext 签发 access token（携带部门与超管标记）。
    pub fn issue_access_token(&self, ctx: &TenantContext) -> Result<AccessToken, AuthError> {
        let token_id = Uuid::new_v4().to_string();
        let expires_at = now_epoch_seconds() + self.access_ttl_seconds;
        let claims = Claims {
            sub: ctx.user_id.clone(),
            tenant_id: ctx.tenant_id.clone(),
            roles: ctx.roles.clone(),
            permissions: ctx.permissions.clone(),
            dept_id: ctx.dept_id.clone(),
            is_superuser: ctx.is_superuser,
            exp: expires_at as usize,
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            jti: token_id.clone(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|err| AuthError::Internal(err.to_string()))?;
        Ok(AccessToken {
            token,
            token_id,
            expires_at,
        })
    }

    /// 解析 access token。
    pub fn decode_access(&self, token: &str) -> Result<TenantContext, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let decoded = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(map_jwt_error)?;
        let claims = decoded.claims;
        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(AuthError::TokenInvalid);
        }
        Ok(TenantContext::new(
            claims.tenant_id,
            claims.sub,
            claims.roles,
            claims.permissions,
            claims.dept_id,
        )
        .with_superuser(claims.is_superuser))
    }
}

/// 当前时间戳（秒）。
fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// 将 jwt 库错误映射为业务错误。
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    }
}
