//! 实例过滤谓词
//!
//! 无状态、无锁的纯谓词，可在多个任务间并发使用。
//! `InstanceMatcher::any()` 等价于"全部匹配"；链式组合按逻辑与生效。

use std::fmt;
use std::sync::Arc;

use crate::instance::{Health, Instance};

/// 实例过滤谓词
#[derive(Clone)]
pub struct InstanceMatcher {
    predicate: Arc<dyn Fn(&Instance) -> bool + Send + Sync>,
}

impl InstanceMatcher {
    /// 从任意谓词函数创建
    pub fn from_fn(f: impl Fn(&Instance) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(f),
        }
    }

    /// 匹配所有实例
    pub fn any() -> Self {
        Self::from_fn(|_| true)
    }

    /// 匹配指定健康状态的实例
    pub fn with_health(health: Health) -> Self {
        Self::from_fn(move |inst| inst.health == health)
    }

    /// 匹配健康（Passing）的实例
    pub fn healthy() -> Self {
        Self::with_health(Health::Passing)
    }

    /// 匹配携带指定元数据键值的实例
    pub fn with_meta(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        Self::from_fn(move |inst| inst.meta.get(&key).map(|v| *v == value).unwrap_or(false))
    }

    /// 按逻辑与组合两个谓词
    pub fn and(self, other: InstanceMatcher) -> Self {
        Self::from_fn(move |inst| self.matches(inst) && other.matches(inst))
    }

    /// 判断实例是否匹配
    pub fn matches(&self, instance: &Instance) -> bool {
        (self.predicate)(instance)
    }
}

impl Default for InstanceMatcher {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Debug for InstanceMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InstanceMatcher")
    }
}
