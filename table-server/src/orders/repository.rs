//! Persistence port
//!
//! The coordinator only talks to storage through [`OrderRepository`]. Calls
//! are synchronous; async callers run them on the blocking pool.
//!
//! Session-scoped atomicity lives here, not in the coordinator: every
//! mutation that depends on a prior read (conditional delete, order placement
//! against an open session, payment) runs inside one storage transaction.

use shared::models::{
    Bill, OrderSession, OrderSessionUpdate, OrderedProduct, OrderedProductStatus, Product,
    ProductCategory, ProductUpdate,
};
use uuid::Uuid;

use super::error::OrderResult;

pub trait OrderRepository: Send + Sync {
    // ========== Sessions ==========

    fn get_session_by_id(&self, id: Uuid) -> OrderResult<OrderSession>;

    fn add_session(&self, session: &OrderSession) -> OrderResult<()>;

    /// Persist whichever fields are present and return the refreshed session
    fn update_session(&self, id: Uuid, update: &OrderSessionUpdate) -> OrderResult<OrderSession>;

    fn list_sessions(&self) -> OrderResult<Vec<OrderSession>>;

    /// Atomically: session must be open, every item done; clear items, mark paid
    fn pay_session(&self, id: Uuid) -> OrderResult<OrderSession>;

    // ========== Ordered products ==========

    /// Insert a pending item; fails unless the session is open and the product exists
    fn add_ordered_product(&self, item: &OrderedProduct) -> OrderResult<()>;

    /// Conditional delete: id AND session AND status = pending, in one transaction
    fn delete_pending_ordered_product(&self, id: Uuid, session_id: Uuid)
    -> OrderResult<OrderedProduct>;

    /// Unconditional delete
    fn delete_ordered_product(&self, id: Uuid) -> OrderResult<OrderedProduct>;

    fn update_ordered_product_status(
        &self,
        id: Uuid,
        status: OrderedProductStatus,
    ) -> OrderResult<OrderedProduct>;

    fn list_ordered_products(&self, session_id: Uuid) -> OrderResult<Vec<OrderedProduct>>;

    fn has_incomplete_ordered_products(&self, session_id: Uuid) -> OrderResult<bool>;

    /// Returns the number of removed rows
    fn delete_ordered_products_by_session_id(&self, session_id: Uuid) -> OrderResult<usize>;

    /// Bill of the session's current items, no precondition checks
    fn get_bill_from_session(&self, session_id: Uuid) -> OrderResult<Bill>;

    /// One snapshot: session must be open, every item done, then aggregate
    fn bill_session(&self, session_id: Uuid) -> OrderResult<Bill>;

    // ========== Categories ==========

    /// Fails with `CategoryNameInUse` on a duplicate name
    fn add_category(&self, category: &ProductCategory) -> OrderResult<()>;

    fn rename_category(&self, id: Uuid, name: &str) -> OrderResult<ProductCategory>;

    /// Refused while any product still links to the category
    fn delete_category(&self, id: Uuid) -> OrderResult<ProductCategory>;

    fn list_categories(&self) -> OrderResult<Vec<ProductCategory>>;

    // ========== Products ==========

    /// Category must exist and the name must be unused
    fn add_product(&self, product: &Product) -> OrderResult<()>;

    fn update_product(&self, id: Uuid, update: &ProductUpdate) -> OrderResult<Product>;

    /// Refused while ordered products still reference it
    fn delete_product(&self, id: Uuid) -> OrderResult<Product>;

    /// All-or-nothing: nothing is removed if any product is still referenced
    fn delete_products_by_category(&self, category_id: Uuid) -> OrderResult<Vec<Product>>;

    fn get_product(&self, id: Uuid) -> OrderResult<Product>;

    fn list_products(&self) -> OrderResult<Vec<Product>>;

    fn list_products_by_category(&self, category_id: Uuid) -> OrderResult<Vec<Product>>;
}
