use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::{Config, Result};
use crate::hub::{Hub, HubHandle};
use crate::message::Dispatcher;
use crate::orders::{OrderCoordinator, OrderRepository, OrderStorage};

/// 服务器状态 - 持有所有服务的共享引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | coordinator | 订单业务规则 (redb 持久化) |
/// | hub | 在线连接注册表句柄 |
/// | dispatcher | 实时消息分发 |
/// | shutdown | 关闭信号令牌 (Hub 所有者循环监听) |
///
/// Cloning is cheap; every field is a handle.
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub coordinator: OrderCoordinator,
    pub hub: HubHandle,
    pub dispatcher: Dispatcher,
    pub shutdown: CancellationToken,
}

impl ServerState {
    /// Open storage under `work_dir` and start the Hub
    ///
    /// Must be called inside a tokio runtime.
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let path = config.database_path();
        let storage = OrderStorage::open(&path)?;
        tracing::info!(path = %path.display(), "Order storage opened");
        Ok(Self::with_repository(config.clone(), Arc::new(storage)))
    }

    /// Build state around an existing repository (tests, in-memory runs)
    pub fn with_repository(config: Config, repository: Arc<dyn OrderRepository>) -> Self {
        let shutdown = CancellationToken::new();
        let (hub, _task) = Hub::spawn(shutdown.clone());
        let coordinator = OrderCoordinator::new(repository);
        let dispatcher = Dispatcher::new(coordinator.clone(), hub.clone());
        Self {
            config,
            coordinator,
            hub,
            dispatcher,
            shutdown,
        }
    }

    /// Stop the Hub owner loop
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
