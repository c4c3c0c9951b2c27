//! 实例变更事件
//!
//! 推送式事件通道接口，用于与期望 push 风格实例变更流的外部负载均衡
//! 客户端集成。事件是回调机制之上的适配层，不参与核心缓存逻辑。

use crate::error::DiscoveryError;
use crate::instance::Instance;

/// 实例集合变更事件
///
/// 每当一个刷新周期改变了实例 ID 集合时，向所有已注册的通道发送一份。
#[derive(Debug, Clone)]
pub struct Event {
    /// 逻辑服务名
    pub service: String,

    /// 变更后的完整实例列表
    pub instances: Vec<Instance>,

    /// 本周期的解析错误（如有）
    pub err: Option<DiscoveryError>,
}
