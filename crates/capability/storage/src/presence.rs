//! 在线分组存储接口。
//!
//! 每个分组是一个按最后心跳时间（Unix 秒）排序的连接集合：
//! - 心跳早于 `now - layer_expire_seconds` 的连接在任何读写前被剔除
//! - 每次写入刷新整个分组的 TTL（`group_ttl_seconds`）
//! - 分组名与连接名在访问存储前校验

use crate::error::StorageError;

/// 在线分组时间参数。
#[derive(Debug, Clone, Copy)]
pub struct PresenceExpiry {
    pub layer_expire_seconds: u64,
    pub group_ttl_seconds: u64,
}

impl PresenceExpiry {
    pub fn new(layer_expire_seconds: u64, group_ttl_seconds: u64) -> Self {
        Self {
            layer_expire_seconds: layer_expire_seconds.max(1),
            group_ttl_seconds: group_ttl_seconds.max(1),
        }
    }

    /// 可见性下限：分值小于该值的连接视为过期。
    pub fn cutoff(&self, now_secs: i64) -> i64 {
        now_secs - self.layer_expire_seconds as i64
    }
}

impl Default for PresenceExpiry {
    fn default() -> Self {
        Self::new(30, 86_400)
    }
}

#[async_trait::async_trait]
pub trait PresenceStore: Send + Sync {
    /// 剔除过期连接，写入 `connection`（分值为 `now_secs`），刷新分组 TTL。
    async fn touch(&self, group: &str, connection: &str, now_secs: i64)
    -> Result<(), StorageError>;

    /// 幂等移除；分组或连接不存在时不报错。
    async fn remove(&self, group: &str, connection: &str) -> Result<(), StorageError>;

    /// 剔除过期连接后按分值升序返回剩余连接。
    async fn list_alive(&self, group: &str, now_secs: i64) -> Result<Vec<String>, StorageError>;

    /// 枚举匹配 glob 模式的分组名（遍历全部分片，最终一致）。
    async fn list_groups(&self, pattern: &str) -> Result<Vec<String>, StorageError>;
}
