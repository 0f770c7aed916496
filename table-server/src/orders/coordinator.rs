//! OrderCoordinator - 订单业务规则
//!
//! Validates session state and privilege before delegating to the
//! persistence port. Checks that must be atomic with the write (session still
//! open, item still pending, all items done at payment) are repeated inside
//! the storage transaction; the checks here give the early, descriptive error.

use std::sync::Arc;

use shared::models::{
    Bill, OrderSession, OrderSessionUpdate, OrderedProduct, OrderedProductStatus, Product,
    ProductCategory, ProductCreate, ProductUpdate,
};
use uuid::Uuid;

use super::error::{OrderError, OrderResult};
use super::repository::OrderRepository;

/// Who is asking for a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Staff: may touch any item in any state
    Admin,
    /// Table client: limited to its own session's pending items
    Client { session_id: Uuid },
}

#[derive(Clone)]
pub struct OrderCoordinator {
    repository: Arc<dyn OrderRepository>,
}

impl std::fmt::Debug for OrderCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderCoordinator").finish_non_exhaustive()
    }
}

impl OrderCoordinator {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    // ========== Sessions ==========

    /// New sessions start closed; staff opens them explicitly.
    pub fn create_session(&self, table_number: i32) -> OrderResult<OrderSession> {
        let session = OrderSession::new(table_number);
        self.repository.add_session(&session)?;
        tracing::info!(session_id = %session.id, table_number, "Order session created");
        Ok(session)
    }

    pub fn get_session(&self, id: Uuid) -> OrderResult<OrderSession> {
        self.repository.get_session_by_id(id)
    }

    pub fn list_sessions(&self) -> OrderResult<Vec<OrderSession>> {
        self.repository.list_sessions()
    }

    /// Partial update. Status changes are not restricted to forward moves.
    pub fn update_session(
        &self,
        id: Uuid,
        update: OrderSessionUpdate,
    ) -> OrderResult<OrderSession> {
        if update.is_empty() {
            return Err(OrderError::NothingToUpdate);
        }
        let session = self.repository.update_session(id, &update)?;
        tracing::info!(
            session_id = %id,
            status = %session.status,
            table_number = session.table_number,
            "Order session updated"
        );
        Ok(session)
    }

    /// The session must exist and be open
    pub fn validate_session(&self, id: Uuid) -> OrderResult<OrderSession> {
        let session = self.repository.get_session_by_id(id)?;
        if !session.is_open() {
            return Err(OrderError::SessionNotOpen(id.to_string()));
        }
        Ok(session)
    }

    /// Parse a session id from a raw path segment, then validate it
    pub fn validate_session_str(&self, raw: &str) -> OrderResult<OrderSession> {
        let id = Uuid::parse_str(raw).map_err(|_| OrderError::InvalidSessionId(raw.to_string()))?;
        self.validate_session(id)
    }

    /// Settle the table: requires every item done, then clears items and marks paid
    pub fn pay_bill(&self, session_id: Uuid) -> OrderResult<OrderSession> {
        self.validate_session(session_id)?;
        if self.repository.has_incomplete_ordered_products(session_id)? {
            return Err(OrderError::ProductsIncomplete(session_id.to_string()));
        }
        let session = self.repository.pay_session(session_id)?;
        tracing::info!(session_id = %session_id, "Bill paid");
        Ok(session)
    }

    /// Open session, every item done; checked and priced on one storage snapshot
    pub fn get_bill(&self, session_id: Uuid) -> OrderResult<Bill> {
        self.repository.bill_session(session_id)
    }

    // ========== Ordered products ==========

    pub fn order_product(&self, session_id: Uuid, product_id: Uuid) -> OrderResult<OrderedProduct> {
        self.validate_session(session_id)?;
        let item = OrderedProduct::new(product_id, session_id);
        self.repository.add_ordered_product(&item)?;
        tracing::debug!(
            session_id = %session_id,
            product_id = %product_id,
            ordered_product_id = %item.id,
            "Product ordered"
        );
        Ok(item)
    }

    /// Staff-side status change. Any transition between the three states is accepted.
    pub fn update_ordered_product_status(
        &self,
        id: Uuid,
        status: OrderedProductStatus,
    ) -> OrderResult<OrderedProduct> {
        let item = self.repository.update_ordered_product_status(id, status)?;
        tracing::debug!(ordered_product_id = %id, status = %status, "Ordered product status updated");
        Ok(item)
    }

    pub fn delete_ordered_product(&self, id: Uuid, privilege: Privilege) -> OrderResult<OrderedProduct> {
        let item = match privilege {
            Privilege::Admin => self.repository.delete_ordered_product(id)?,
            Privilege::Client { session_id } => {
                self.validate_session(session_id)?;
                self.repository.delete_pending_ordered_product(id, session_id)?
            }
        };
        tracing::debug!(ordered_product_id = %id, ?privilege, "Ordered product deleted");
        Ok(item)
    }

    pub fn list_ordered_products(&self, session_id: Uuid) -> OrderResult<Vec<OrderedProduct>> {
        self.repository.get_session_by_id(session_id)?;
        self.repository.list_ordered_products(session_id)
    }

    // ========== Categories ==========

    pub fn add_category(&self, name: String) -> OrderResult<ProductCategory> {
        let category = ProductCategory::new(name);
        self.repository.add_category(&category)?;
        tracing::info!(category_id = %category.id, name = %category.name, "Product category added");
        Ok(category)
    }

    pub fn update_category(&self, id: Uuid, name: Option<String>) -> OrderResult<ProductCategory> {
        let Some(name) = name else {
            return Err(OrderError::NothingToUpdate);
        };
        let category = self.repository.rename_category(id, &name)?;
        tracing::info!(category_id = %id, name = %category.name, "Product category renamed");
        Ok(category)
    }

    pub fn delete_category(&self, id: Uuid) -> OrderResult<ProductCategory> {
        let category = self.repository.delete_category(id)?;
        tracing::info!(category_id = %id, "Product category deleted");
        Ok(category)
    }

    pub fn list_categories(&self) -> OrderResult<Vec<ProductCategory>> {
        self.repository.list_categories()
    }

    // ========== Products ==========

    pub fn add_product(&self, create: ProductCreate) -> OrderResult<Product> {
        let product = Product::from(create);
        self.repository.add_product(&product)?;
        tracing::info!(product_id = %product.id, name = %product.name, "Product added");
        Ok(product)
    }

    pub fn get_product(&self, id: Uuid) -> OrderResult<Product> {
        self.repository.get_product(id)
    }

    pub fn update_product(&self, id: Uuid, update: ProductUpdate) -> OrderResult<Product> {
        if update.is_empty() {
            return Err(OrderError::NothingToUpdate);
        }
        let product = self.repository.update_product(id, &update)?;
        tracing::info!(product_id = %id, "Product updated");
        Ok(product)
    }

    pub fn delete_product(&self, id: Uuid) -> OrderResult<Product> {
        let product = self.repository.delete_product(id)?;
        tracing::info!(product_id = %id, name = %product.name, "Product deleted");
        Ok(product)
    }

    pub fn delete_products_by_category(&self, category_id: Uuid) -> OrderResult<Vec<Product>> {
        let removed = self.repository.delete_products_by_category(category_id)?;
        tracing::info!(category_id = %category_id, count = removed.len(), "Products deleted by category");
        Ok(removed)
    }

    /// Whole catalog, or one category's products
    pub fn list_products(&self, category_id: Option<Uuid>) -> OrderResult<Vec<Product>> {
        match category_id {
            Some(category_id) => self.repository.list_products_by_category(category_id),
            None => self.repository.list_products(),
        }
    }
}
