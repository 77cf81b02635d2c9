//! 追踪、请求 ID 与进程内指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub scope_allow_all: u64,
    pub scope_deny_all: u64,
    pub scope_filtered: u64,
    pub presence_touches: u64,
    pub presence_removals: u64,
    pub push_delivered: u64,
    pub push_failed: u64,
    pub forced_logouts: u64,
    pub notices_created: u64,
}

/// 进程内计数器。
pub struct TelemetryMetrics {
    scope_allow_all: AtomicU64,
    scope_deny_all: AtomicU64,
    scope_filtered: AtomicU64,
    presence_touches: AtomicU64,
    presence_removals: AtomicU64,
    push_delivered: AtomicU64,
    push_failed: AtomicU64,
    forced_logouts: AtomicU64,
    notices_created: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            scope_allow_all: AtomicU64::new(0),
            scope_deny_all: AtomicU64::new(0),
            scope_filtered: AtomicU64::new(0),
            presence_touches: AtomicU64::new(0),
            presence_removals: AtomicU64::new(0),
            push_delivered: AtomicU64::new(0),
            push_failed: AtomicU64::new(0),
            forced_logouts: AtomicU64::new(0),
            notices_created: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            scope_allow_all: self.scope_allow_all.load(Ordering::Relaxed),
            scope_deny_all: self.scope_deny_all.load(Ordering::Relaxed),
            scope_filtered: self.scope_filtered.load(Ordering::Relaxed),
            presence_touches: self.presence_touches.load(Ordering::Relaxed),
            presence_removals: self.presence_removals.load(Ordering::Relaxed),
            push_delivered: self.push_delivered.load(Ordering::Relaxed),
            push_failed: self.push_failed.load(Ordering::Relaxed),
            forced_logouts: self.forced_logouts.load(Ordering::Relaxed),
            notices_created: self.notices_created.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 数据权限解析结果：全部放行。
pub fn record_scope_allow_all() {
    metrics().scope_allow_all.fetch_add(1, Ordering::Relaxed);
}

/// 数据权限解析结果：全部拒绝。
pub fn record_scope_deny_all() {
    metrics().scope_deny_all.fetch_add(1, Ordering::Relaxed);
}

/// 数据权限解析结果：按谓词过滤。
pub fn record_scope_filtered() {
    metrics().scope_filtered.fetch_add(1, Ordering::Relaxed);
}

pub fn record_presence_touch() {
    metrics().presence_touches.fetch_add(1, Ordering::Relaxed);
}

pub fn record_presence_removal() {
    metrics().presence_removals.fetch_add(1, Ordering::Relaxed);
}

/// 记录单连接推送成功次数。
pub fn record_push_delivered() {
    metrics().push_delivered.fetch_add(1, Ordering::Relaxed);
}

/// 记录单连接推送失败次数。
pub fn record_push_failed() {
    metrics().push_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录强制下线的连接数。
pub fn record_forced_logout() {
    metrics().forced_logouts.fetch_add(1, Ordering::Relaxed);
}

pub fn record_notice_created() {
    metrics().notices_created.fetch_add(1, Ordering::Relaxed);
}
