//! 按服务名注册表
//!
//! 进程（或一个逻辑发现域）创建一个 [`Client`]，按服务名惰性构造并
//! 记忆化实例发现器，持有它们的生命周期直到显式 [`close`](Client::close)。
//! 不使用进程级单例：依赖显式注入、显式传递，避免跨测试的隐藏状态。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::backend::ResolverBackend;
use crate::backend::dns::DnsSrvBackend;
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::instancer::Instancer;

/// 后端构造器
///
/// 在注册表首次遇到一个服务名时调用。注入点同时服务于测试替身和
/// consul 等兄弟后端。
pub type BackendFactory = dyn Fn(&str) -> Result<Arc<dyn ResolverBackend>> + Send + Sync;

/// 服务发现客户端（注册表）
///
/// 同一个服务名在客户端生命周期内至多对应一个发现器。
pub struct Client {
    config: DiscoveryConfig,
    factory: Box<BackendFactory>,
    instancers: Mutex<HashMap<String, Arc<Instancer>>>,
    closed: AtomicBool,
    cancel: CancellationToken,
}

impl Client {
    /// 创建 DNS SRV 后端的客户端
    pub fn new(config: DiscoveryConfig) -> Self {
        let backend_config = config.clone();
        Self::with_backend_factory(config, move |_service_name| {
            Ok(Arc::new(DnsSrvBackend::new(&backend_config)?) as Arc<dyn ResolverBackend>)
        })
    }

    /// 使用自定义后端构造器创建客户端
    pub fn with_backend_factory<F>(config: DiscoveryConfig, factory: F) -> Self
    where
        F: Fn(&str) -> Result<Arc<dyn ResolverBackend>> + Send + Sync + 'static,
    {
        Self {
            config,
            factory: Box::new(factory),
            instancers: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// 获取（或创建）服务名对应的实例发现器
    ///
    /// 同一个服务名的两次调用返回同一个发现器。后端构造失败（如模板
    /// 无效）时错误直接返回且该服务名不被注册，下次调用允许重试。
    /// 构造不触网，持锁期间只做配置与任务启动。
    pub async fn instancer(&self, service_name: &str) -> Result<Arc<Instancer>> {
        if service_name.is_empty() {
            return Err(DiscoveryError::EmptyServiceName);
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(DiscoveryError::ClientClosed);
        }

        let mut instancers = self.instancers.lock().await;
        if let Some(existing) = instancers.get(service_name) {
            return Ok(existing.clone());
        }

        let backend = (self.factory)(service_name)?;
        let instancer = Instancer::start(
            service_name,
            backend,
            Duration::from_secs(self.config.refresh_interval),
            &self.cancel,
            self.config.verbose,
        );
        instancers.insert(service_name.to_string(), instancer.clone());
        tracing::info!(service = service_name, "instancer created");

        Ok(instancer)
    }

    /// 客户端的根取消令牌
    ///
    /// 所有发现器的后台任务都挂在它的子令牌下；用于关联日志/追踪或
    /// 整体取消，不用于控制单个发现器。
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 客户端配置
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// 关闭客户端
    ///
    /// 幂等。对每个已注册的发现器恰好调用一次 stop，之后
    /// [`instancer`](Client::instancer) 返回 `ClientClosed`。
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let instancers = self.instancers.lock().await;
        for instancer in instancers.values() {
            instancer.stop();
        }
        self.cancel.cancel();
        tracing::debug!(instancers = instancers.len(), "discovery client closed");
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
