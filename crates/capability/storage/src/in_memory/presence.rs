//! 在线分组内存实现（单进程部署与测试）。
//!
//! 每个分组的“剔除后再修改”在同一把写锁内完成。

use crate::error::StorageError;
use crate::presence::{PresenceExpiry, PresenceStore};
use crate::validation::{compile_group_pattern, validate_connection_name, validate_group_name};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Group {
    entries: HashMap<String, i64>,
    expires_at: i64,
}

impl Group {
    fn prune(&mut self, cutoff: i64) {
        self.entries.retain(|_, last_seen| *last_seen >= cutoff);
    }
}

pub struct InMemoryPresenceStore {
    expiry: PresenceExpiry,
    groups: RwLock<HashMap<String, Group>>,
}

impl InMemoryPresenceStore {
    pub fn new(expiry: PresenceExpiry) -> Self {
        Self {
            expiry,
            groups: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPresenceStore {
    fn default() -> Self {
        Self::new(PresenceExpiry::default())
    }
}

#[async_trait::async_trait]
impl PresenceStore for InMemoryPresenceStore {
    async fn touch(
        &self,
        group: &str,
        connection: &str,
        now_secs: i64,
    ) -> Result<(), StorageError> {
        validate_group_name(group)?;
        validate_connection_name(connection)?;
        let mut groups = self
            .groups
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let entry = groups.entry(group.to_string()).or_default();
        if entry.expires_at <= now_secs {
            entry.entries.clear();
        }
        entry.prune(self.expiry.cutoff(now_secs));
        entry.entries.insert(connection.to_string(), now_secs);
        entry.expires_at = now_secs + self.expiry.group_ttl_seconds as i64;
        Ok(())
    }

    async fn remove(&self, group: &str, connection: &str) -> Result<(), StorageError> {
        validate_group_name(group)?;
        validate_connection_name(connection)?;
        let mut groups = self
            .groups
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if let Some(entry) = groups.get_mut(group) {
            entry.entries.remove(connection);
            if entry.entries.is_empty() {
                groups.remove(group);
            }
        }
        Ok(())
    }

    async fn list_alive(&self, group: &str, now_secs: i64) -> Result<Vec<String>, StorageError> {
        validate_group_name(group)?;
        let mut groups = self
            .groups
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let Some(entry) = groups.get_mut(group) else {
            return Ok(Vec::new());
        };
        if entry.expires_at <= now_secs {
            groups.remove(group);
            return Ok(Vec::new());
        }
        entry.prune(self.expiry.cutoff(now_secs));
        let mut alive: Vec<(i64, String)> = entry
            .entries
            .iter()
            .map(|(connection, last_seen)| (*last_seen, connection.clone()))
            .collect();
        if alive.is_empty() {
            groups.remove(group);
            return Ok(Vec::new());
        }
        alive.sort();
        Ok(alive.into_iter().map(|(_, connection)| connection).collect())
    }

    async fn list_groups(&self, pattern: &str) -> Result<Vec<String>, StorageError> {
        let matcher = compile_group_pattern(pattern)?;
        let groups = self
            .groups
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut names: Vec<String> = groups
            .iter()
            .filter(|(name, entry)| !entry.entries.is_empty() && matcher.matches(name))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}
