//! 服务发现配置
//!
//! 配置由应用属性绑定为普通结构体后传入，绑定机制本身不在本 crate 范围内。

use serde::{Deserialize, Serialize};

/// 默认刷新间隔（秒）
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// 服务发现配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// DNS 服务器地址覆盖（"host:port" 或 "host"，缺省端口 53）
    ///
    /// 设置后查询直接发往该服务器，否则使用系统解析器。
    pub dns_server: Option<String>,

    /// 查询目标域名模板，`{service}` 占位符替换为逻辑服务名
    pub name_template: String,

    /// SRV service 标签（如 "http"）
    ///
    /// 与 `srv_proto` 同时设置时，实际查询名为
    /// `_<service>._<proto>.<渲染后的目标>`，否则直接查询渲染后的目标。
    pub srv_service: Option<String>,

    /// SRV proto 标签（如 "tcp"）
    pub srv_proto: Option<String>,

    /// 刷新间隔（秒）
    pub refresh_interval: u64,

    /// SRV 查询无可用记录或失败时，是否降级为单个 FQDN 实例
    pub fallback_to_fqdn: bool,

    /// 是否输出每个刷新周期的详细日志
    pub verbose: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dns_server: None,
            name_template: "{service}".to_string(),
            srv_service: None,
            srv_proto: None,
            refresh_interval: DEFAULT_REFRESH_INTERVAL_SECS,
            fallback_to_fqdn: true,
            verbose: false,
        }
    }
}
