use std::path::PathBuf;
use std::time::Duration;

use crate::session::ws::SocketConfig;

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库文件) |
/// | HTTP_PORT | 3000 | HTTP / WebSocket 端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 (`RUST_LOG` 优先) |
/// | LOG_DIR | - | 日志目录，设置后按天滚动写文件 |
/// | DEFAULT_TABLE_NUMBER | 1 | 新会话的默认桌号 |
/// | OUTBOUND_QUEUE_CAPACITY | 64 | 每连接出站队列容量 |
/// | WS_WRITE_TIMEOUT_MS | 5000 | 单次 socket 写超时 |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 优雅关闭超时 |
///
/// ```ignore
/// WORK_DIR=/srv/tables HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub default_table_number: i32,
    pub outbound_queue_capacity: usize,
    pub ws_write_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置，未设置时使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: env_or("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            default_table_number: env_or("DEFAULT_TABLE_NUMBER", 1),
            outbound_queue_capacity: env_or("OUTBOUND_QUEUE_CAPACITY", 64),
            ws_write_timeout_ms: env_or("WS_WRITE_TIMEOUT_MS", 5000),
            shutdown_timeout_ms: env_or("SHUTDOWN_TIMEOUT_MS", 10000),
        }
    }

    /// 使用自定义工作目录和端口 (测试场景)
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("orders.redb")
    }

    pub fn socket_config(&self) -> SocketConfig {
        SocketConfig {
            queue_capacity: self.outbound_queue_capacity,
            write_timeout: Duration::from_millis(self.ws_write_timeout_ms),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
