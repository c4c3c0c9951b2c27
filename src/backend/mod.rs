//! 解析后端抽象和实现

pub mod dns;

use async_trait::async_trait;

use crate::error::Result;
use crate::instance::Instance;

/// 解析后端 trait
///
/// 给定逻辑服务名，执行一次解析尝试并返回实例列表。实现必须每次调用
/// 无状态（只持有静态配置），由上层的 Instancer 负责缓存、调度和重试。
/// 注意：由于需要动态分发（dyn），使用 async-trait。
#[async_trait]
pub trait ResolverBackend: Send + Sync {
    /// 执行一次解析
    ///
    /// # 参数
    /// * `service_name` - 逻辑服务名
    ///
    /// # 返回
    /// 返回实例列表（保持后端顺序）；瞬时失败返回 `DiscoveryError::Resolve`，
    /// 由调用方的过期策略决定消费者看到什么。
    async fn resolve(&self, service_name: &str) -> Result<Vec<Instance>>;
}
