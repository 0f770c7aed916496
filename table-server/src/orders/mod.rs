//! Orders - 点单会话、已点商品与账单
//!
//! - `repository`: persistence port
//! - `storage`: redb adapter
//! - `coordinator`: business rules on top of the port
//! - `bill`: itemized bill aggregation

pub mod bill;
pub mod coordinator;
pub mod error;
pub mod repository;
pub mod storage;

pub use coordinator::{OrderCoordinator, Privilege};
pub use error::{ErrorKind, OrderError, OrderResult};
pub use repository::OrderRepository;
pub use storage::{OrderStorage, StorageError};
