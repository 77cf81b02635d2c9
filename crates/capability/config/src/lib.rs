//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 在线分组配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceConfig {
    /// 心跳容忍时间：超过该时长未刷新的连接视为离线。
    pub layer_expire_seconds: u64,
    /// 整个分组键的过期时间，每次写入时刷新。
    pub group_ttl_seconds: u64,
    /// 用户分组名前缀（`user_<tenant>.<id>`）。
    pub group_prefix: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            layer_expire_seconds: 30,
            group_ttl_seconds: 86_400,
            group_prefix: "user_".to_string(),
        }
    }
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: Option<String>,
    pub redis_urls: Vec<String>,
    pub redis_key_prefix: String,
    pub presence: PresenceConfig,
    pub jwt_secret: String,
    pub jwt_access_ttl_seconds: u64,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("ADMIN_JWT_SECRET")
            .map_err(|_| ConfigError::Missing("ADMIN_JWT_SECRET".to_string()))?;
        let jwt_access_ttl_seconds = read_u64("ADMIN_JWT_ACCESS_TTL_SECONDS")?;
        let http_addr =
            env::var("ADMIN_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let database_url = read_optional("ADMIN_DATABASE_URL");
        let redis_urls = read_optional("ADMIN_REDIS_URLS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let redis_key_prefix =
            env::var("ADMIN_REDIS_KEY_PREFIX").unwrap_or_else(|_| "admin".to_string());
        let defaults = PresenceConfig::default();
        let presence = PresenceConfig {
            layer_expire_seconds: read_u64_with_default(
                "ADMIN_PRESENCE_LAYER_EXPIRE_SECONDS",
                defaults.layer_expire_seconds,
            )?,
            group_ttl_seconds: read_u64_with_default(
                "ADMIN_PRESENCE_GROUP_TTL_SECONDS",
                defaults.group_ttl_seconds,
            )?,
            group_prefix: env::var("ADMIN_PRESENCE_GROUP_PREFIX")
                .unwrap_or(defaults.group_prefix),
        };
        validate_presence(&presence)?;

        Ok(Self {
            http_addr,
            database_url,
            redis_urls,
            redis_key_prefix,
            presence,
            jwt_secret,
            jwt_access_ttl_seconds,
        })
    }
}

/// 心跳容忍时间必须大于 0 且严格小于分组 TTL。
pub fn validate_presence(config: &PresenceConfig) -> Result<(), ConfigError> {
    if config.layer_expire_seconds == 0 {
        return Err(ConfigError::Invalid(
            "ADMIN_PRESENCE_LAYER_EXPIRE_SECONDS".to_string(),
            "0".to_string(),
        ));
    }
    if config.layer_expire_seconds >= config.group_ttl_seconds {
        return Err(ConfigError::Invalid(
            "ADMIN_PRESENCE_GROUP_TTL_SECONDS".to_string(),
            format!(
                "{} (must exceed layer expiry {})",
                config.group_ttl_seconds, config.layer_expire_seconds
            ),
        ));
    }
    Ok(())
}

/// 读取 u64 类型环境变量。
fn read_u64(key: &str) -> Result<u64, ConfigError> {
    let value = env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))?;
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}
