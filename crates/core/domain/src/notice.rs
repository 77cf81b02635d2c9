//! 消息通知词汇表。

use serde::{Deserialize, Serialize};

/// 通知类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NoticeType {
    System,
    User,
    Dept,
    Role,
    /// 公告（全员）。
    Notice,
}

impl NoticeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::User => "USER",
            Self::Dept => "DEPT",
            Self::Role => "ROLE",
            Self::Notice => "NOTICE",
        }
    }

    /// 大小写不敏感解析。
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "SYSTEM" => Some(Self::System),
            "USER" => Some(Self::User),
            "DEPT" => Some(Self::Dept),
            "ROLE" => Some(Self::Role),
            "NOTICE" => Some(Self::Notice),
            _ => None,
        }
    }
}

/// 通知级别（前端展示用）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "info" => Some(Self::Info),
            "success" => Some(Self::Success),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// 接收对象：用户、部门（含下级）、角色三者互斥，公告面向全员。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "ids", rename_all = "snake_case")]
pub enum NoticeTarget {
    Users(Vec<String>),
    Depts(Vec<String>),
    Roles(Vec<String>),
    Everyone,
}

impl NoticeTarget {
    /// 按通知类型选择接收对象，未选中的列表被丢弃。
    pub fn select(
        notice_type: NoticeType,
        users: Vec<String>,
        depts: Vec<String>,
        roles: Vec<String>,
    ) -> Self {
        match notice_type {
            NoticeType::Dept => Self::Depts(depts),
            NoticeType::Role => Self::Roles(roles),
            NoticeType::Notice => Self::Everyone,
            NoticeType::System | NoticeType::User => Self::Users(users),
        }
    }

    /// 类型与接收对象是否一致。
    pub fn is_valid_for(&self, notice_type: NoticeType) -> bool {
        matches!(
            (notice_type, self),
            (NoticeType::System | NoticeType::User, Self::Users(_))
                | (NoticeType::Dept, Self::Depts(_))
                | (NoticeType::Role, Self::Roles(_))
                | (NoticeType::Notice, Self::Everyone)
        )
    }
}
