use super::storage::StorageError;
use thiserror::Error;

/// Error taxonomy shared by the persistence port, coordinator and protocol layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Session / product / ordered product missing
    NotFound,
    /// Session not open, products incomplete, item no longer pending
    InvalidState,
    /// Malformed frame or payload, nothing to update
    Validation,
    /// Concurrent modification
    Conflict,
    /// Transport or persistence failure
    Internal,
}

/// Order domain errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Order session not found: {0}")]
    SessionNotFound(String),

    #[error("Order session is not open: {0}")]
    SessionNotOpen(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product name already in use: {0}")]
    ProductNameInUse(String),

    #[error("Product is referenced by ordered products: {0}")]
    ProductInUse(String),

    #[error("Product category not found: {0}")]
    CategoryNotFound(String),

    #[error("Product category name already in use: {0}")]
    CategoryNameInUse(String),

    #[error("Product category has linked products: {0}")]
    CategoryHasProducts(String),

    #[error("Ordered product not found: {0}")]
    OrderedProductNotFound(String),

    #[error("Ordered product is not pending: {0}")]
    OrderedProductNotPending(String),

    #[error("Session has incomplete ordered products: {0}")]
    ProductsIncomplete(String),

    #[error("Nothing to update")]
    NothingToUpdate,

    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrderError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionNotFound(_)
            | Self::ProductNotFound(_)
            | Self::CategoryNotFound(_)
            | Self::OrderedProductNotFound(_) => ErrorKind::NotFound,
            Self::SessionNotOpen(_)
            | Self::OrderedProductNotPending(_)
            | Self::ProductsIncomplete(_)
            | Self::ProductInUse(_)
            | Self::CategoryHasProducts(_) => ErrorKind::InvalidState,
            Self::NothingToUpdate | Self::InvalidSessionId(_) => ErrorKind::Validation,
            Self::Conflict(_) | Self::ProductNameInUse(_) | Self::CategoryNameInUse(_) => {
                ErrorKind::Conflict
            }
            Self::Storage(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable wire code (前端负责本地化)
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::SessionNotOpen(_) => "SESSION_NOT_OPEN",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::ProductNameInUse(_) => "PRODUCT_NAME_IN_USE",
            Self::ProductInUse(_) => "PRODUCT_IN_USE",
            Self::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            Self::CategoryNameInUse(_) => "CATEGORY_NAME_IN_USE",
            Self::CategoryHasProducts(_) => "CATEGORY_HAS_PRODUCTS",
            Self::OrderedProductNotFound(_) => "ORDERED_PRODUCT_NOT_FOUND",
            Self::OrderedProductNotPending(_) => "ORDERED_PRODUCT_NOT_PENDING",
            Self::ProductsIncomplete(_) => "PRODUCTS_INCOMPLETE",
            Self::NothingToUpdate => "NOTHING_TO_UPDATE",
            Self::InvalidSessionId(_) => "INVALID_SESSION_ID",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the requester; internals are never exposed
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "Session not found",
            Self::SessionNotOpen(_) => "Session is not open",
            Self::ProductNotFound(_) => "Product not found",
            Self::ProductNameInUse(_) => "Product name is already in use",
            Self::ProductInUse(_) => "Product has been ordered and cannot be deleted",
            Self::CategoryNotFound(_) => "Product category not found",
            Self::CategoryNameInUse(_) => "Product category name is already in use",
            Self::CategoryHasProducts(_) => "Product category still has products",
            Self::OrderedProductNotFound(_) => "Ordered product not found",
            Self::OrderedProductNotPending(_) => {
                "Only pending products can be deleted by a client"
            }
            Self::ProductsIncomplete(_) => "Some ordered products are not done yet",
            Self::NothingToUpdate => "Nothing to update",
            Self::InvalidSessionId(_) => "Invalid session id",
            Self::Conflict(_) => "Conflicting update, please retry",
            Self::Storage(_) | Self::Internal(_) => "Internal server error",
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
