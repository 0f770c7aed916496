//! Table Server - 桌台实时点单服务
//!
//! Staff ("admins") and seated guests ("clients") hold WebSocket connections;
//! guests order and cancel pending items, staff advance kitchen status, and
//! every participant at a table converges on the same order state.
//!
//! # 模块结构
//!
//! ```text
//! table-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── hub/           # 在线连接注册表 (单一所有者 actor)
//! ├── session/       # 单连接读循环 + WebSocket 绑定
//! ├── message/       # 帧解码与请求分发
//! ├── orders/        # 会话/菜品状态机、账单、redb 持久化
//! ├── api/           # HTTP 路由
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod core;
pub mod hub;
pub mod message;
pub mod orders;
pub mod session;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerState};
pub use hub::{Broadcast, Hub, HubHandle, HubStats};
pub use orders::{OrderCoordinator, OrderError, OrderRepository, OrderStorage};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env`, then set up logging from the resulting config
pub fn setup_environment() -> Config {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(
        Some(&config.log_level),
        config.is_production(),
        config.log_dir.as_deref(),
    );
    config
}
