//! 刷新退避策略
//!
//! 解析成功时按固定间隔调度下一次刷新；连续失败时按倍增退避拉开重试
//! 间隔，避免持续冲击故障中的解析器。退避有上限，成功后立即复位。

use std::time::Duration;

/// 默认退避上限
pub const DEFAULT_MAX_REFRESH_BACKOFF: Duration = Duration::from_secs(300);

/// 刷新退避状态机
///
/// 延迟曲线：`base * 2^min(n, 10)`，`n` 为连续失败次数，封顶于 `max`。
#[derive(Debug, Clone)]
pub struct RefreshBackoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl RefreshBackoff {
    /// 创建退避状态机
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: 0,
        }
    }

    /// 使用默认上限创建
    pub fn with_default_max(base: Duration) -> Self {
        Self::new(base, DEFAULT_MAX_REFRESH_BACKOFF.max(base))
    }

    /// 记录一次成功，复位退避
    pub fn succeed(&mut self) {
        self.failures = 0;
    }

    /// 记录一次失败
    pub fn fail(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// 连续失败次数
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// 距离下一次刷新的延迟
    pub fn next_delay(&self) -> Duration {
        if self.failures == 0 {
            return self.base;
        }
        let shift = self.failures.min(10);
        let delay_ms = (self.base.as_millis() as u64).saturating_mul(1u64 << shift);
        Duration::from_millis(delay_ms).min(self.max)
    }
}
