//! 服务发现统一错误类型
//!
//! 错误分为三类：配置错误（创建时立即失败，不可重试）、解析错误（瞬时失败，
//! 记录在 `Service.err` 中并在下一个刷新周期自动重试）、生命周期错误
//! （实例发现器或客户端已停止，对其生命周期而言是永久的）。

use thiserror::Error;

/// 服务发现统一错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// 服务名为空（配置错误）
    #[error("服务名不能为空")]
    EmptyServiceName,

    /// 名称模板无效（配置错误）
    #[error("名称模板无效 {template:?}: {reason}")]
    InvalidNameTemplate {
        /// 原始模板字符串
        template: String,
        /// 失败原因
        reason: String,
    },

    /// DNS 服务器地址无效（配置错误）
    #[error("DNS 服务器地址无效 {address:?}: {reason}")]
    InvalidDnsServer {
        /// 原始地址字符串
        address: String,
        /// 失败原因
        reason: String,
    },

    /// 客户端已关闭（生命周期错误）
    #[error("客户端已关闭")]
    ClientClosed,

    /// 实例发现器已停止（生命周期错误）
    #[error("服务 {0} 的实例发现器已停止")]
    InstancerStopped(String),

    /// 解析失败（瞬时错误，下一个刷新周期自动重试）
    #[error("解析失败: {0}")]
    Resolve(String),
}

impl DiscoveryError {
    /// 判断是否为可重试的错误
    ///
    /// 只有解析错误是可重试的，配置和生命周期错误需要调用方修正。
    pub fn is_retryable(&self) -> bool {
        matches!(self, DiscoveryError::Resolve(_))
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, DiscoveryError>;
