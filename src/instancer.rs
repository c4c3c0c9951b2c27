//! 实例发现器（缓存/刷新引擎）
//!
//! 为一个逻辑服务名维持一份持续刷新的线程安全快照，将消费者与每次
//! 调用的网络延迟和解析器抖动解耦。每个发现器只有一个后台任务；快照
//! 整体替换、从不原地修改；刷新周期严格串行，同一服务名不会有两次
//! 解析并发进行。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{RwLock, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::backend::ResolverBackend;
use crate::backoff::RefreshBackoff;
use crate::error::{DiscoveryError, Result};
use crate::event::Event;
use crate::instance::{Instance, Service};
use crate::matcher::InstanceMatcher;

/// 变更回调
///
/// 在发现器自己的后台任务上调用，入参为变更后的快照。
pub type ChangeCallback = Arc<dyn Fn(&Service) + Send + Sync>;

/// 实例发现器
///
/// 由 [`Client`](crate::client::Client) 按服务名惰性创建并持有生命周期，
/// 消费者保留句柄后在热路径上调用 [`instances`](Instancer::instances) /
/// [`service`](Instancer::service)（预热后非阻塞）。
pub struct Instancer {
    service_name: String,
    snapshot: RwLock<Option<Arc<Service>>>,
    ready_tx: watch::Sender<bool>,
    callbacks: RwLock<HashMap<String, ChangeCallback>>,
    subscribers: RwLock<Vec<mpsc::Sender<Event>>>,
    stopped: AtomicBool,
    cancel: CancellationToken,
    verbose: bool,
}

impl std::fmt::Debug for Instancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instancer")
            .field("service_name", &self.service_name)
            .field("stopped", &self.stopped)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl Instancer {
    /// 创建发现器并立即启动后台刷新任务
    ///
    /// 构造本身不触网：第一次解析在后台任务的首个迭代中执行。
    pub(crate) fn start(
        service_name: impl Into<String>,
        backend: Arc<dyn ResolverBackend>,
        refresh_interval: Duration,
        parent: &CancellationToken,
        verbose: bool,
    ) -> Arc<Self> {
        let (ready_tx, _) = watch::channel(false);
        let instancer = Arc::new(Self {
            service_name: service_name.into(),
            snapshot: RwLock::new(None),
            ready_tx,
            callbacks: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(Vec::new()),
            stopped: AtomicBool::new(false),
            cancel: parent.child_token(),
            verbose,
        });

        let handle = instancer.clone();
        tokio::spawn(async move {
            handle.run(backend, refresh_interval).await;
        });

        instancer
    }

    /// 逻辑服务名（发现器生命周期内不变）
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// 当前缓存快照
    ///
    /// 首次调用阻塞到初始解析周期完成（成功或失败），保证调用方在继续
    /// 之前至少观察到一次解析结果；之后的调用立即返回后台任务最近一次
    /// 产出的快照，最多过期一个刷新间隔。发现器在首次加载前被停止时
    /// 返回 `InstancerStopped` 而不是挂起。
    pub async fn service(&self) -> Result<Arc<Service>> {
        if let Some(service) = self.snapshot.read().await.clone() {
            return Ok(service);
        }

        let mut ready = self.ready_tx.subscribe();
        ready
            .wait_for(|ready| *ready)
            .await
            .map_err(|_| DiscoveryError::InstancerStopped(self.service_name.clone()))?;

        self.snapshot
            .read()
            .await
            .clone()
            .ok_or_else(|| DiscoveryError::InstancerStopped(self.service_name.clone()))
    }

    /// 对当前缓存的实例列表应用过滤谓词
    ///
    /// `None` 等价于全部匹配；结果保持缓存顺序。只读缓存，从不触发同步
    /// 网络调用；缓存为空时隐式等待首次加载。发现器停止后返回
    /// `InstancerStopped`。
    pub async fn instances(&self, matcher: Option<&InstanceMatcher>) -> Result<Vec<Instance>> {
        if self.is_stopped() {
            return Err(DiscoveryError::InstancerStopped(self.service_name.clone()));
        }

        let service = self.service().await?;
        Ok(service
            .instances
            .iter()
            .filter(|inst| matcher.map_or(true, |m| m.matches(inst)))
            .cloned()
            .collect())
    }

    /// 注册变更回调
    ///
    /// 键的语义等同于 map：重复注册同一个键替换旧回调。回调在发现器的
    /// 后台任务上串行调用，每个改变了实例 ID 集合的刷新周期恰好一次。
    pub async fn register_callback(
        &self,
        key: impl Into<String>,
        callback: impl Fn(&Service) + Send + Sync + 'static,
    ) {
        self.callbacks
            .write()
            .await
            .insert(key.into(), Arc::new(callback));
    }

    /// 按键注销变更回调
    pub async fn unregister_callback(&self, key: &str) {
        self.callbacks.write().await.remove(key);
    }

    /// 注册事件通道（兼容接口）
    ///
    /// 每个检测到变更的刷新周期向通道发送一个 [`Event`]。发送是尽力而为：
    /// 通道满或已关闭时丢弃事件并记日志，慢消费者不会拖住刷新循环。
    pub async fn register_channel(&self, sender: mpsc::Sender<Event>) {
        let mut subscribers = self.subscribers.write().await;
        if !subscribers.iter().any(|tx| tx.same_channel(&sender)) {
            subscribers.push(sender);
        }
    }

    /// 注销事件通道
    pub async fn deregister_channel(&self, sender: &mpsc::Sender<Event>) {
        self.subscribers
            .write()
            .await
            .retain(|tx| !tx.same_channel(sender));
    }

    /// 停止后台任务
    ///
    /// 幂等。取消后台任务的上下文（中止进行中的解析），并释放仍阻塞在
    /// 首次 [`service`](Instancer::service) 调用上的等待者。
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        self.ready_tx.send_replace(true);
        tracing::debug!(service = %self.service_name, "instancer stopped");
    }

    /// 是否已停止
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// 后台刷新循环
    ///
    /// 启动时立即执行一次迭代，之后每个调度点执行一次。解析错误从不
    /// 终止循环，只有取消会。
    async fn run(self: Arc<Self>, backend: Arc<dyn ResolverBackend>, interval: Duration) {
        let mut backoff = RefreshBackoff::with_default_max(interval);

        loop {
            let ok = tokio::select! {
                _ = self.cancel.cancelled() => break,
                ok = self.refresh_once(backend.as_ref()) => ok,
            };
            if ok {
                backoff.succeed();
            } else {
                backoff.fail();
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff.next_delay()) => {}
            }
        }

        // 直接取消根 token（未经 stop()）时也要释放首次加载的等待者
        self.stopped.store(true, Ordering::SeqCst);
        self.ready_tx.send_replace(true);
        tracing::debug!(service = %self.service_name, "instancer refresh loop exited");
    }

    /// 执行一个刷新周期，返回本次解析是否成功
    async fn refresh_once(&self, backend: &dyn ResolverBackend) -> bool {
        let result = backend.resolve(&self.service_name).await;
        let ok = result.is_ok();

        let previous = self.snapshot.read().await.clone();
        let candidate = match result {
            Ok(instances) => Service::new(self.service_name.clone(), instances),
            Err(e) => {
                tracing::warn!(
                    service = %self.service_name,
                    error = %e,
                    "Failed to refresh service instances, serving last known good set"
                );
                // 过期策略：瞬时失败不清空实例，保留上一次成功的列表
                let stale = previous
                    .as_ref()
                    .map(|s| s.instances.clone())
                    .unwrap_or_default();
                Service::new(self.service_name.clone(), stale).with_err(e)
            }
        };

        if self.verbose {
            tracing::debug!(
                service = %self.service_name,
                instances = candidate.instances.len(),
                error = ?candidate.err,
                "refresh cycle completed"
            );
        }

        let changed = match &previous {
            Some(prev) => prev.instance_ids() != candidate.instance_ids(),
            None => !candidate.instances.is_empty(),
        };

        let candidate = Arc::new(candidate);
        {
            let mut guard = self.snapshot.write().await;
            *guard = Some(candidate.clone());
        }

        if changed {
            self.notify(&candidate).await;
        }

        // 通知完成后才释放首次加载的等待者：首个 service() 返回时，
        // 初始周期的回调和事件已全部投递完毕
        self.ready_tx.send_replace(true);

        ok
    }

    /// 变更通知：先回调、后事件通道，均在后台任务上串行执行
    async fn notify(&self, service: &Arc<Service>) {
        let callbacks: Vec<ChangeCallback> =
            self.callbacks.read().await.values().cloned().collect();
        for callback in callbacks {
            callback(service);
        }

        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|tx| !tx.is_closed());
        if subscribers.is_empty() {
            return;
        }

        let event = Event {
            service: service.name.clone(),
            instances: service.instances.clone(),
            err: service.err.clone(),
        };
        for tx in subscribers.iter() {
            if let Err(e) = tx.try_send(event.clone()) {
                tracing::warn!(
                    service = %service.name,
                    error = %e,
                    "Dropping change event for slow or closed subscriber"
                );
            }
        }
    }
}
