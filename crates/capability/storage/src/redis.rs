//! Redis 在线分组实现
//!
//! 每个分组一个有序集合 `{prefix}:group:{group}`，成员为连接名，分值为最后心跳（秒）。
//! “剔除 + 写入 + 续期”与“剔除 + 读取”各由一段 Lua 脚本原子完成。
//! 多个 Redis 实例按分组名哈希分片；枚举分组时逐个分片 SCAN。

use crate::error::StorageError;
use crate::presence::{PresenceExpiry, PresenceStore};
use crate::validation::{validate_connection_name, validate_group_name, validate_group_pattern};
use redis::AsyncCommands;
use std::collections::BTreeSet;

const TOUCH_SCRIPT: &str = r"
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', '(' .. ARGV[2])
redis.call('ZADD', KEYS[1], ARGV[1], ARGV[3])
redis.call('EXPIRE', KEYS[1], ARGV[4])
return 1
";

const LIST_ALIVE_SCRIPT: &str = r"
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', '(' .. ARGV[1])
return redis.call('ZRANGE', KEYS[1], 0, -1)
";

/// Redis 在线分组存储（支持多分片）。
pub struct RedisPresenceStore {
    shards: Vec<redis::Client>,
    key_prefix: String,
    expiry: PresenceExpiry,
    touch_script: redis::Script,
    list_alive_script: redis::Script,
}

impl RedisPresenceStore {
    /// 按 URL 列表建立分片客户端（至少一个）。
    pub fn connect(
        redis_urls: &[String],
        key_prefix: &str,
        expiry: PresenceExpiry,
    ) -> Result<Self, StorageError> {
        if redis_urls.is_empty() {
            return Err(StorageError::new("at least one redis url required"));
        }
        let shards = redis_urls
            .iter()
            .map(|url| redis::Client::open(url.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            shards,
            key_prefix: key_prefix.to_string(),
            expiry,
            touch_script: redis::Script::new(TOUCH_SCRIPT),
            list_alive_script: redis::Script::new(LIST_ALIVE_SCRIPT),
        })
    }

    fn group_key(&self, group: &str) -> String {
        format!("{}:group:{}", self.key_prefix, group)
    }

    fn group_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.key_prefix.as_str())?
            .strip_prefix(":group:")
    }

    fn shard_for(&self, group: &str) -> &redis::Client {
        &self.shards[shard_index(group, self.shards.len())]
    }
}

/// FNV-1a 哈希选择分片，同一分组始终落在同一实例。
pub fn shard_index(group: &str, shard_count: usize) -> usize {
    if shard_count <= 1 {
        return 0;
    }
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in group.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % shard_count as u64) as usize
}

#[async_trait::async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn touch(
        &self,
        group: &str,
        connection: &str,
        now_secs: i64,
    ) -> Result<(), StorageError> {
        validate_group_name(group)?;
        validate_connection_name(connection)?;
        let mut conn = self
            .shard_for(group)
            .get_multiplexed_tokio_connection()
            .await?;
        self.touch_script
            .key(self.group_key(group))
            .arg(now_secs)
            .arg(self.expiry.cutoff(now_secs))
            .arg(connection)
            .arg(self.expiry.group_ttl_seconds)
            .invoke_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove(&self, group: &str, connection: &str) -> Result<(), StorageError> {
        validate_group_name(group)?;
        validate_connection_name(connection)?;
        let mut conn = self
            .shard_for(group)
            .get_multiplexed_tokio_connection()
            .await?;
        conn.zrem::<_, _, i64>(self.group_key(group), connection)
            .await?;
        Ok(())
    }

    async fn list_alive(&self, group: &str, now_secs: i64) -> Result<Vec<String>, StorageError> {
        validate_group_name(group)?;
        let mut conn = self
            .shard_for(group)
            .get_multiplexed_tokio_connection()
            .await?;
        let alive: Vec<String> = self
            .list_alive_script
            .key(self.group_key(group))
            .arg(self.expiry.cutoff(now_secs))
            .invoke_async(&mut conn)
            .await?;
        Ok(alive)
    }

    async fn list_groups(&self, pattern: &str) -> Result<Vec<String>, StorageError> {
        validate_group_pattern(pattern)?;
        let key_pattern = self.group_key(pattern);
        let mut groups = BTreeSet::new();
        for shard in &self.shards {
            let mut conn = shard.get_multiplexed_tokio_connection().await?;
            let mut cursor: u64 = 0;
            loop {
                let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&key_pattern)
                    .arg("COUNT")
                    .arg(100)
                    .query_async(&mut conn)
                    .await?;
                for key in &keys {
                    if let Some(group) = self.group_from_key(key) {
                        groups.insert(group.to_string());
                    }
                }
                if next_cursor == 0 {
                    break;
                }
                cursor = next_cursor;
            }
        }
        Ok(groups.into_iter().collect())
    }
}
