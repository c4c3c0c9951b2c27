//! 服务实例与解析快照定义

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;

/// 实例健康状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Passing,
    Warning,
    Critical,
    Maintenance,
}

impl std::str::FromStr for Health {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passing" => Ok(Health::Passing),
            "warning" => Ok(Health::Warning),
            "critical" => Ok(Health::Critical),
            "maintenance" => Ok(Health::Maintenance),
            _ => Err(format!("Unknown health status: {}", s)),
        }
    }
}

/// 服务实例
///
/// 一次解析周期产出的不可变记录，每个刷新周期重新构建。
/// 调用方不应假设跨刷新周期的对象同一性，只有 `id` 字段是稳定的。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instance {
    /// 实例 ID（快照内唯一，默认为 "host:port"）
    pub id: String,

    /// 所属逻辑服务名
    pub service: String,

    /// 目标主机
    pub address: String,

    /// 端口（FQDN 降级实例为 0）
    pub port: u16,

    /// 元数据（用于过滤和观测）
    pub meta: HashMap<String, String>,

    /// 健康状态
    pub health: Health,

    /// 后端原始记录（仅用于调试）
    pub raw_entry: Option<String>,
}

impl Instance {
    /// 创建新的服务实例，ID 默认为 "host:port"
    pub fn new(service: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        let address = address.into();
        Self {
            id: format!("{}:{}", address, port),
            service: service.into(),
            address,
            port,
            meta: HashMap::new(),
            health: Health::Passing,
            raw_entry: None,
        }
    }

    /// 覆盖实例 ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// 添加元数据
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// 设置健康状态
    pub fn with_health(mut self, health: Health) -> Self {
        self.health = health;
        self
    }

    /// 设置后端原始记录
    pub fn with_raw_entry(mut self, raw: impl Into<String>) -> Self {
        self.raw_entry = Some(raw.into());
        self
    }

    /// 转换为 "host:port" 形式的拨号地址
    pub fn authority(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// 解析快照
///
/// 一个逻辑服务名在某个时刻的完整解析结果。快照整体替换、从不原地修改。
/// `err` 非空并不意味着实例列表为空：解析失败时保留上一次成功的实例列表
/// （过期但可用），同时记录新的错误。
#[derive(Debug, Clone)]
pub struct Service {
    /// 逻辑服务名
    pub name: String,

    /// 实例列表（保持后端返回顺序）
    pub instances: Vec<Instance>,

    /// 快照时间
    pub time: DateTime<Utc>,

    /// 最近一次解析错误
    pub err: Option<DiscoveryError>,
}

impl Service {
    /// 构建快照
    pub fn new(name: impl Into<String>, instances: Vec<Instance>) -> Self {
        Self {
            name: name.into(),
            instances,
            time: Utc::now(),
            err: None,
        }
    }

    /// 记录解析错误
    pub fn with_err(mut self, err: DiscoveryError) -> Self {
        self.err = Some(err);
        self
    }

    /// 实例 ID 集合（用于变更检测）
    pub fn instance_ids(&self) -> HashSet<&str> {
        self.instances.iter().map(|i| i.id.as_str()).collect()
    }
}
