//! 验证辅助函数
//!
//! 所有校验都在访问存储之前完成，失败时返回 Validation 类错误：
//! - ensure_tenant：租户 ID 非空
//! - validate_group_name：在线分组名
//! - validate_connection_name：连接标识
//! - validate_group_pattern / compile_group_pattern：分组枚举使用的 glob 模式

use crate::error::StorageError;
use domain::TenantContext;

/// 分组名与连接名的最大长度（不含）。
pub const MAX_NAME_LENGTH: usize = 100;

/// 验证租户 ID 非空
pub fn ensure_tenant(ctx: &TenantContext) -> Result<(), StorageError> {
    if ctx.tenant_id.is_empty() {
        return Err(StorageError::validation("tenant_id required"));
    }
    Ok(())
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')
}

/// 分组名只允许 ASCII 字母数字、`-`、`_`、`.`，长度小于 100。
pub fn validate_group_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name.len() >= MAX_NAME_LENGTH || !name.chars().all(is_name_char) {
        return Err(StorageError::validation(format!("invalid group name: {name:?}")));
    }
    Ok(())
}

/// 连接名规则同分组名，另允许一个 `!` 分隔的进程内后缀（如 `specific.abc!def`）。
pub fn validate_connection_name(name: &str) -> Result<(), StorageError> {
    let valid = !name.is_empty()
        && name.len() < MAX_NAME_LENGTH
        && match name.split_once('!') {
            Some((head, tail)) => {
                !head.is_empty() && head.chars().all(is_name_char) && tail.chars().all(is_name_char)
            }
            None => name.chars().all(is_name_char),
        };
    if !valid {
        return Err(StorageError::validation(format!(
            "invalid connection name: {name:?}"
        )));
    }
    Ok(())
}

/// glob 模式：分组名字符加 `*`、`?`。
pub fn validate_group_pattern(pattern: &str) -> Result<(), StorageError> {
    if pattern.is_empty()
        || pattern.len() >= MAX_NAME_LENGTH
        || !pattern
            .chars()
            .all(|ch| is_name_char(ch) || matches!(ch, '*' | '?'))
    {
        return Err(StorageError::validation(format!(
            "invalid group pattern: {pattern:?}"
        )));
    }
    Ok(())
}

/// 校验并编译 glob 模式，`*`、`?` 语义与 Redis SCAN MATCH 在分组名字符集内一致。
pub fn compile_group_pattern(pattern: &str) -> Result<glob::Pattern, StorageError> {
    validate_group_pattern(pattern)?;
    glob::Pattern::new(pattern)
        .map_err(|err| StorageError::validation(format!("invalid group pattern: {err}")))
}
