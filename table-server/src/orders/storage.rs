//! redb-based implementation of the persistence port
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `sessions` | `session_id` | `OrderSession` | Table sessions |
//! | `product_categories` | `category_id` | `ProductCategory` | Catalog sections |
//! | `products` | `product_id` | `Product` | Catalog (unit prices) |
//! | `ordered_products` | `ordered_product_id` | `OrderedProduct` | Placed items |
//! | `session_items` | `(session_id, ordered_product_id)` | `()` | Items by session |
//!
//! # Isolation
//!
//! redb allows a single write transaction at a time, so every read-then-write
//! sequence below (order placement, pending-only delete, payment, unique
//! names, linked-row checks) is serializable with respect to any other
//! mutation. Bills are computed from a single read snapshot.
//!
//! # Durability
//!
//! Commits are persistent as soon as `commit()` returns. A write transaction
//! that is dropped without commit is aborted, which is how every failed
//! business check leaves storage untouched.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{
    Bill, OrderSession, OrderSessionUpdate, OrderedProduct, OrderedProductStatus, Product,
    ProductCategory, ProductUpdate, SessionStatus,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::bill;
use super::error::{OrderError, OrderResult};
use super::repository::OrderRepository;

/// key = session_id, value = JSON-serialized OrderSession
const SESSIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// key = category_id, value = JSON-serialized ProductCategory
const CATEGORIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("product_categories");

/// key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

/// key = ordered_product_id, value = JSON-serialized OrderedProduct
const ORDERED_PRODUCTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("ordered_products");

/// key = (session_id, ordered_product_id), value = empty (index)
const SESSION_ITEMS_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("session_items");

/// Upper bound for the second key component; sorts after any hyphenated UUID
const KEY_UPPER_BOUND: &str = "~";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

macro_rules! impl_from_for_order_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for OrderError {
                fn from(e: $source) -> Self {
                    OrderError::Storage(StorageError::from(e))
                }
            }
        )*
    };
}

impl_from_for_order_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
    serde_json::Error,
);

// ========== Encoding helpers ==========

fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn load<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
) -> StorageResult<Option<T>> {
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn load_all<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
) -> StorageResult<Vec<T>> {
    let mut values = Vec::new();
    for result in table.iter()? {
        let (_key, value) = result?;
        values.push(serde_json::from_slice(value.value())?);
    }
    Ok(values)
}

fn load_items(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    ids: Vec<String>,
) -> StorageResult<Vec<OrderedProduct>> {
    let mut items = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(item) = load(table, &id)? {
            items.push(item);
        }
    }
    Ok(items)
}

fn sort_products(products: &mut [Product]) {
    products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}

fn session_item_ids(
    table: &impl ReadableTable<(&'static str, &'static str), ()>,
    session_id: &str,
) -> StorageResult<Vec<String>> {
    let mut ids = Vec::new();
    let range_start = (session_id, "");
    let range_end = (session_id, KEY_UPPER_BOUND);
    for result in table.range(range_start..=range_end)? {
        let (key, _) = result?;
        ids.push(key.value().1.to_string());
    }
    Ok(ids)
}

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and ephemeral runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSIONS_TABLE)?;
            let _ = write_txn.open_table(CATEGORIES_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(ORDERED_PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(SESSION_ITEMS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    // ========== Transaction-scoped helpers ==========

    fn session_txn(txn: &WriteTransaction, id: &str) -> OrderResult<OrderSession> {
        let table = txn.open_table(SESSIONS_TABLE)?;
        load(&table, id)?.ok_or_else(|| OrderError::SessionNotFound(id.to_string()))
    }

    fn open_session_txn(txn: &WriteTransaction, id: &str) -> OrderResult<OrderSession> {
        let session = Self::session_txn(txn, id)?;
        if !session.is_open() {
            return Err(OrderError::SessionNotOpen(id.to_string()));
        }
        Ok(session)
    }

    fn store_session_txn(txn: &WriteTransaction, session: &OrderSession) -> OrderResult<()> {
        let mut table = txn.open_table(SESSIONS_TABLE)?;
        let value = encode(session)?;
        table.insert(session.id.to_string().as_str(), value.as_slice())?;
        Ok(())
    }

    fn ordered_product_txn(txn: &WriteTransaction, id: &str) -> OrderResult<OrderedProduct> {
        let table = txn.open_table(ORDERED_PRODUCTS_TABLE)?;
        load(&table, id)?.ok_or_else(|| OrderError::OrderedProductNotFound(id.to_string()))
    }

    fn remove_ordered_product_txn(txn: &WriteTransaction, item: &OrderedProduct) -> OrderResult<()> {
        let id = item.id.to_string();
        let session_id = item.session_id.to_string();
        {
            let mut table = txn.open_table(ORDERED_PRODUCTS_TABLE)?;
            table.remove(id.as_str())?;
        }
        let mut index = txn.open_table(SESSION_ITEMS_TABLE)?;
        index.remove((session_id.as_str(), id.as_str()))?;
        Ok(())
    }

    /// Items of a session, read inside a write transaction
    fn session_items_txn(txn: &WriteTransaction, session_id: &str) -> OrderResult<Vec<OrderedProduct>> {
        let ids = {
            let index = txn.open_table(SESSION_ITEMS_TABLE)?;
            session_item_ids(&index, session_id)?
        };
        let table = txn.open_table(ORDERED_PRODUCTS_TABLE)?;
        Ok(load_items(&table, ids)?)
    }

    fn clear_session_items_txn(txn: &WriteTransaction, session_id: &str) -> OrderResult<usize> {
        let items = Self::session_items_txn(txn, session_id)?;
        for item in &items {
            Self::remove_ordered_product_txn(txn, item)?;
        }
        Ok(items.len())
    }

    fn category_txn(txn: &WriteTransaction, id: &str) -> OrderResult<ProductCategory> {
        let table = txn.open_table(CATEGORIES_TABLE)?;
        load(&table, id)?.ok_or_else(|| OrderError::CategoryNotFound(id.to_string()))
    }

    fn store_category_txn(txn: &WriteTransaction, category: &ProductCategory) -> OrderResult<()> {
        let mut table = txn.open_table(CATEGORIES_TABLE)?;
        let value = encode(category)?;
        table.insert(category.id.to_string().as_str(), value.as_slice())?;
        Ok(())
    }

    /// `except` skips the entity being renamed
    fn ensure_category_name_free(
        txn: &WriteTransaction,
        name: &str,
        except: Option<Uuid>,
    ) -> OrderResult<()> {
        let table = txn.open_table(CATEGORIES_TABLE)?;
        let categories: Vec<ProductCategory> = load_all(&table)?;
        if categories
            .iter()
            .any(|c| c.name == name && Some(c.id) != except)
        {
            return Err(OrderError::CategoryNameInUse(name.to_string()));
        }
        Ok(())
    }

    fn product_txn(txn: &WriteTransaction, id: &str) -> OrderResult<Product> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        load(&table, id)?.ok_or_else(|| OrderError::ProductNotFound(id.to_string()))
    }

    fn store_product_txn(txn: &WriteTransaction, product: &Product) -> OrderResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = encode(product)?;
        table.insert(product.id.to_string().as_str(), value.as_slice())?;
        Ok(())
    }

    fn ensure_product_name_free(
        txn: &WriteTransaction,
        name: &str,
        except: Option<Uuid>,
    ) -> OrderResult<()> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        let products: Vec<Product> = load_all(&table)?;
        if products
            .iter()
            .any(|p| p.name == name && Some(p.id) != except)
        {
            return Err(OrderError::ProductNameInUse(name.to_string()));
        }
        Ok(())
    }

    fn products_in_category_txn(
        txn: &WriteTransaction,
        category_id: Uuid,
    ) -> OrderResult<Vec<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        let products: Vec<Product> = load_all(&table)?;
        Ok(products
            .into_iter()
            .filter(|p| p.category_id == category_id)
            .collect())
    }

    /// Product ids that still have ordered rows pointing at them
    fn referenced_products_txn(txn: &WriteTransaction) -> OrderResult<HashSet<Uuid>> {
        let table = txn.open_table(ORDERED_PRODUCTS_TABLE)?;
        let items: Vec<OrderedProduct> = load_all(&table)?;
        Ok(items.into_iter().map(|item| item.product_id).collect())
    }

    /// Items of a session from a consistent read snapshot
    fn session_items(&self, session_id: Uuid) -> OrderResult<Vec<OrderedProduct>> {
        let session_key = session_id.to_string();
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(SESSION_ITEMS_TABLE)?;
        let table = read_txn.open_table(ORDERED_PRODUCTS_TABLE)?;

        let mut items = load_items(&table, session_item_ids(&index, &session_key)?)?;
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    /// Session state, items and unit prices all come from one read transaction,
    /// so a write committed mid-way is either fully visible or not at all.
    fn bill_snapshot(&self, session_id: Uuid, check_preconditions: bool) -> OrderResult<Bill> {
        let key = session_id.to_string();
        let read_txn = self.db.begin_read()?;

        if check_preconditions {
            let sessions = read_txn.open_table(SESSIONS_TABLE)?;
            let session: OrderSession = load(&sessions, &key)?
                .ok_or_else(|| OrderError::SessionNotFound(key.clone()))?;
            if !session.is_open() {
                return Err(OrderError::SessionNotOpen(key));
            }
        }

        let index = read_txn.open_table(SESSION_ITEMS_TABLE)?;
        let table = read_txn.open_table(ORDERED_PRODUCTS_TABLE)?;
        let items = load_items(&table, session_item_ids(&index, &key)?)?;
        if check_preconditions && items.iter().any(|item| !item.is_done()) {
            return Err(OrderError::ProductsIncomplete(key));
        }

        let products = read_txn.open_table(PRODUCTS_TABLE)?;
        bill::aggregate(&items, |product_id| {
            let product_key = product_id.to_string();
            match load(&products, &product_key)? {
                Some(product) => Ok(product),
                None => Err(OrderError::ProductNotFound(product_key)),
            }
        })
    }
}

impl OrderRepository for OrderStorage {
    // ========== Sessions ==========

    fn get_session_by_id(&self, id: Uuid) -> OrderResult<OrderSession> {
        let key = id.to_string();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS_TABLE)?;
        load(&table, &key)?.ok_or(OrderError::SessionNotFound(key))
    }

    fn add_session(&self, session: &OrderSession) -> OrderResult<()> {
        let txn = self.db.begin_write()?;
        {
            let table = txn.open_table(SESSIONS_TABLE)?;
            if table.get(session.id.to_string().as_str())?.is_some() {
                return Err(OrderError::Conflict(format!(
                    "session {} already exists",
                    session.id
                )));
            }
        }
        Self::store_session_txn(&txn, session)?;
        txn.commit()?;
        Ok(())
    }

    fn update_session(&self, id: Uuid, update: &OrderSessionUpdate) -> OrderResult<OrderSession> {
        let txn = self.db.begin_write()?;
        let mut session = Self::session_txn(&txn, &id.to_string())?;
        if let Some(table_number) = update.table_number {
            session.table_number = table_number;
        }
        if let Some(status) = update.status {
            session.status = status;
        }
        Self::store_session_txn(&txn, &session)?;
        txn.commit()?;
        Ok(session)
    }

    fn list_sessions(&self) -> OrderResult<Vec<OrderSession>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS_TABLE)?;
        let mut sessions: Vec<OrderSession> = load_all(&table)?;
        sessions.sort_by(|a, b| a.table_number.cmp(&b.table_number).then(a.id.cmp(&b.id)));
        Ok(sessions)
    }

    fn pay_session(&self, id: Uuid) -> OrderResult<OrderSession> {
        let key = id.to_string();
        let txn = self.db.begin_write()?;

        let mut session = Self::open_session_txn(&txn, &key)?;
        let items = Self::session_items_txn(&txn, &key)?;
        if items.iter().any(|item| !item.is_done()) {
            return Err(OrderError::ProductsIncomplete(key));
        }

        let cleared = Self::clear_session_items_txn(&txn, &key)?;
        session.status = SessionStatus::Paid;
        Self::store_session_txn(&txn, &session)?;
        txn.commit()?;

        tracing::debug!(session_id = %id, cleared, "Session paid");
        Ok(session)
    }

    // ========== Ordered products ==========

    fn add_ordered_product(&self, item: &OrderedProduct) -> OrderResult<()> {
        let session_key = item.session_id.to_string();
        let product_key = item.product_id.to_string();
        let item_key = item.id.to_string();

        let txn = self.db.begin_write()?;
        Self::open_session_txn(&txn, &session_key)?;
        {
            let products = txn.open_table(PRODUCTS_TABLE)?;
            if products.get(product_key.as_str())?.is_none() {
                return Err(OrderError::ProductNotFound(product_key));
            }
        }
        {
            let mut table = txn.open_table(ORDERED_PRODUCTS_TABLE)?;
            let value = encode(item)?;
            table.insert(item_key.as_str(), value.as_slice())?;
        }
        {
            let mut index = txn.open_table(SESSION_ITEMS_TABLE)?;
            index.insert((session_key.as_str(), item_key.as_str()), ())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn delete_pending_ordered_product(
        &self,
        id: Uuid,
        session_id: Uuid,
    ) -> OrderResult<OrderedProduct> {
        let key = id.to_string();
        let txn = self.db.begin_write()?;

        let item = Self::ordered_product_txn(&txn, &key)?;
        // Another table's item is reported as missing, not as forbidden
        if item.session_id != session_id {
            return Err(OrderError::OrderedProductNotFound(key));
        }
        if item.status != OrderedProductStatus::Pending {
            return Err(OrderError::OrderedProductNotPending(key));
        }

        Self::remove_ordered_product_txn(&txn, &item)?;
        txn.commit()?;
        Ok(item)
    }

    fn delete_ordered_product(&self, id: Uuid) -> OrderResult<OrderedProduct> {
        let txn = self.db.begin_write()?;
        let item = Self::ordered_product_txn(&txn, &id.to_string())?;
        Self::remove_ordered_product_txn(&txn, &item)?;
        txn.commit()?;
        Ok(item)
    }

    fn update_ordered_product_status(
        &self,
        id: Uuid,
        status: OrderedProductStatus,
    ) -> OrderResult<OrderedProduct> {
        let key = id.to_string();
        let txn = self.db.begin_write()?;
        let mut item = Self::ordered_product_txn(&txn, &key)?;
        item.status = status;
        {
            let mut table = txn.open_table(ORDERED_PRODUCTS_TABLE)?;
            let value = encode(&item)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(item)
    }

    fn list_ordered_products(&self, session_id: Uuid) -> OrderResult<Vec<OrderedProduct>> {
        self.session_items(session_id)
    }

    fn has_incomplete_ordered_products(&self, session_id: Uuid) -> OrderResult<bool> {
        Ok(self
            .session_items(session_id)?
            .iter()
            .any(|item| !item.is_done()))
    }

    fn delete_ordered_products_by_session_id(&self, session_id: Uuid) -> OrderResult<usize> {
        let txn = self.db.begin_write()?;
        let cleared = Self::clear_session_items_txn(&txn, &session_id.to_string())?;
        txn.commit()?;
        Ok(cleared)
    }

    fn get_bill_from_session(&self, session_id: Uuid) -> OrderResult<Bill> {
        self.bill_snapshot(session_id, false)
    }

    fn bill_session(&self, session_id: Uuid) -> OrderResult<Bill> {
        self.bill_snapshot(session_id, true)
    }

    // ========== Categories ==========

    fn add_category(&self, category: &ProductCategory) -> OrderResult<()> {
        let txn = self.db.begin_write()?;
        Self::ensure_category_name_free(&txn, &category.name, None)?;
        Self::store_category_txn(&txn, category)?;
        txn.commit()?;
        Ok(())
    }

    fn rename_category(&self, id: Uuid, name: &str) -> OrderResult<ProductCategory> {
        let txn = self.db.begin_write()?;
        let mut category = Self::category_txn(&txn, &id.to_string())?;
        Self::ensure_category_name_free(&txn, name, Some(id))?;
        category.name = name.to_string();
        Self::store_category_txn(&txn, &category)?;
        txn.commit()?;
        Ok(category)
    }

    fn delete_category(&self, id: Uuid) -> OrderResult<ProductCategory> {
        let key = id.to_string();
        let txn = self.db.begin_write()?;
        let category = Self::category_txn(&txn, &key)?;
        if !Self::products_in_category_txn(&txn, id)?.is_empty() {
            return Err(OrderError::CategoryHasProducts(key));
        }
        {
            let mut table = txn.open_table(CATEGORIES_TABLE)?;
            table.remove(key.as_str())?;
        }
        txn.commit()?;
        Ok(category)
    }

    fn list_categories(&self) -> OrderResult<Vec<ProductCategory>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATEGORIES_TABLE)?;
        let mut categories: Vec<ProductCategory> = load_all(&table)?;
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    // ========== Products ==========

    fn add_product(&self, product: &Product) -> OrderResult<()> {
        let txn = self.db.begin_write()?;
        Self::category_txn(&txn, &product.category_id.to_string())?;
        Self::ensure_product_name_free(&txn, &product.name, None)?;
        Self::store_product_txn(&txn, product)?;
        txn.commit()?;
        Ok(())
    }

    fn update_product(&self, id: Uuid, update: &ProductUpdate) -> OrderResult<Product> {
        let txn = self.db.begin_write()?;
        let mut product = Self::product_txn(&txn, &id.to_string())?;
        if let Some(category_id) = update.category_id {
            Self::category_txn(&txn, &category_id.to_string())?;
        }
        if let Some(name) = &update.name {
            Self::ensure_product_name_free(&txn, name, Some(id))?;
        }
        update.apply_to(&mut product);
        Self::store_product_txn(&txn, &product)?;
        txn.commit()?;
        Ok(product)
    }

    fn delete_product(&self, id: Uuid) -> OrderResult<Product> {
        let key = id.to_string();
        let txn = self.db.begin_write()?;
        let product = Self::product_txn(&txn, &key)?;
        if Self::referenced_products_txn(&txn)?.contains(&id) {
            return Err(OrderError::ProductInUse(key));
        }
        {
            let mut table = txn.open_table(PRODUCTS_TABLE)?;
            table.remove(key.as_str())?;
        }
        txn.commit()?;
        Ok(product)
    }

    fn delete_products_by_category(&self, category_id: Uuid) -> OrderResult<Vec<Product>> {
        let txn = self.db.begin_write()?;
        Self::category_txn(&txn, &category_id.to_string())?;
        let mut products = Self::products_in_category_txn(&txn, category_id)?;
        let referenced = Self::referenced_products_txn(&txn)?;
        if let Some(product) = products.iter().find(|p| referenced.contains(&p.id)) {
            return Err(OrderError::ProductInUse(product.id.to_string()));
        }
        {
            let mut table = txn.open_table(PRODUCTS_TABLE)?;
            for product in &products {
                table.remove(product.id.to_string().as_str())?;
            }
        }
        txn.commit()?;
        sort_products(&mut products);
        Ok(products)
    }

    fn get_product(&self, id: Uuid) -> OrderResult<Product> {
        let key = id.to_string();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        load(&table, &key)?.ok_or(OrderError::ProductNotFound(key))
    }

    fn list_products(&self) -> OrderResult<Vec<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        let mut products: Vec<Product> = load_all(&table)?;
        sort_products(&mut products);
        Ok(products)
    }

    fn list_products_by_category(&self, category_id: Uuid) -> OrderResult<Vec<Product>> {
        let category_key = category_id.to_string();
        let read_txn = self.db.begin_read()?;
        {
            let categories = read_txn.open_table(CATEGORIES_TABLE)?;
            if categories.get(category_key.as_str())?.is_none() {
                return Err(OrderError::CategoryNotFound(category_key));
            }
        }
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        let all: Vec<Product> = load_all(&table)?;
        let mut products: Vec<Product> = all
            .into_iter()
            .filter(|p| p.category_id == category_id)
            .collect();
        sort_products(&mut products);
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn storage() -> OrderStorage {
        OrderStorage::open_in_memory().unwrap()
    }

    fn seed_category(storage: &OrderStorage, name: &str) -> ProductCategory {
        let category = ProductCategory::new(name);
        storage.add_category(&category).unwrap();
        category
    }

    fn seed_product(storage: &OrderStorage, name: &str, price: i64) -> Product {
        let category = seed_category(storage, &format!("{name} section"));
        seed_product_in(storage, &category, name, price)
    }

    fn seed_product_in(
        storage: &OrderStorage,
        category: &ProductCategory,
        name: &str,
        price: i64,
    ) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            category_id: category.id,
            price: Decimal::new(price, 2),
        };
        storage.add_product(&product).unwrap();
        product
    }

    fn open_session(storage: &OrderStorage) -> OrderSession {
        let mut session = OrderSession::new(4);
        session.status = SessionStatus::Open;
        storage.add_session(&session).unwrap();
        session
    }

    fn place(storage: &OrderStorage, product: &Product, session: &OrderSession) -> OrderedProduct {
        let item = OrderedProduct::new(product.id, session.id);
        storage.add_ordered_product(&item).unwrap();
        item
    }

    #[test]
    fn test_session_crud() {
        let storage = storage();
        let session = OrderSession::new(1);
        storage.add_session(&session).unwrap();

        let loaded = storage.get_session_by_id(session.id).unwrap();
        assert_eq!(loaded, session);

        let updated = storage
            .update_session(
                session.id,
                &OrderSessionUpdate {
                    table_number: Some(7),
                    status: None,
                },
            )
            .unwrap();
        assert_eq!(updated.table_number, 7);
        assert_eq!(updated.status, SessionStatus::Closed);

        assert_eq!(storage.list_sessions().unwrap().len(), 1);
        assert!(matches!(
            storage.get_session_by_id(Uuid::new_v4()),
            Err(OrderError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_session_conflicts() {
        let storage = storage();
        let session = OrderSession::new(1);
        storage.add_session(&session).unwrap();
        assert!(matches!(
            storage.add_session(&session),
            Err(OrderError::Conflict(_))
        ));
    }

    #[test]
    fn test_add_requires_open_session() {
        let storage = storage();
        let product = seed_product(&storage, "Soup", 450);
        let session = OrderSession::new(2);
        storage.add_session(&session).unwrap();

        let item = OrderedProduct::new(product.id, session.id);
        assert!(matches!(
            storage.add_ordered_product(&item),
            Err(OrderError::SessionNotOpen(_))
        ));
        assert!(storage.list_ordered_products(session.id).unwrap().is_empty());
    }

    #[test]
    fn test_add_unknown_product() {
        let storage = storage();
        let session = open_session(&storage);
        let item = OrderedProduct::new(Uuid::new_v4(), session.id);
        assert!(matches!(
            storage.add_ordered_product(&item),
            Err(OrderError::ProductNotFound(_))
        ));
    }

    #[test]
    fn test_pending_delete_checks_status_and_session() {
        let storage = storage();
        let product = seed_product(&storage, "Soup", 450);
        let session = open_session(&storage);
        let other = open_session(&storage);
        let item = place(&storage, &product, &session);

        // Wrong session
        assert!(matches!(
            storage.delete_pending_ordered_product(item.id, other.id),
            Err(OrderError::OrderedProductNotFound(_))
        ));

        storage
            .update_ordered_product_status(item.id, OrderedProductStatus::Preparing)
            .unwrap();
        assert!(matches!(
            storage.delete_pending_ordered_product(item.id, session.id),
            Err(OrderError::OrderedProductNotPending(_))
        ));
        // Failed conditional delete leaves the row in place
        assert_eq!(storage.list_ordered_products(session.id).unwrap().len(), 1);

        let removed = storage.delete_ordered_product(item.id).unwrap();
        assert_eq!(removed.id, item.id);
        assert!(storage.list_ordered_products(session.id).unwrap().is_empty());
        assert!(matches!(
            storage.delete_ordered_product(item.id),
            Err(OrderError::OrderedProductNotFound(_))
        ));
    }

    #[test]
    fn test_session_items_are_isolated() {
        let storage = storage();
        let product = seed_product(&storage, "Soup", 450);
        let a = open_session(&storage);
        let b = open_session(&storage);
        place(&storage, &product, &a);
        place(&storage, &product, &a);
        place(&storage, &product, &b);

        assert_eq!(storage.list_ordered_products(a.id).unwrap().len(), 2);
        assert_eq!(storage.list_ordered_products(b.id).unwrap().len(), 1);

        assert_eq!(storage.delete_ordered_products_by_session_id(a.id).unwrap(), 2);
        assert!(storage.list_ordered_products(a.id).unwrap().is_empty());
        assert_eq!(storage.list_ordered_products(b.id).unwrap().len(), 1);
    }

    #[test]
    fn test_pay_session_incomplete_has_no_effect() {
        let storage = storage();
        let product = seed_product(&storage, "Soup", 450);
        let session = open_session(&storage);
        let done = place(&storage, &product, &session);
        place(&storage, &product, &session);
        storage
            .update_ordered_product_status(done.id, OrderedProductStatus::Done)
            .unwrap();

        assert!(storage.has_incomplete_ordered_products(session.id).unwrap());
        assert!(matches!(
            storage.pay_session(session.id),
            Err(OrderError::ProductsIncomplete(_))
        ));
        assert_eq!(storage.list_ordered_products(session.id).unwrap().len(), 2);
        assert_eq!(
            storage.get_session_by_id(session.id).unwrap().status,
            SessionStatus::Open
        );
    }

    #[test]
    fn test_pay_session_clears_items() {
        let storage = storage();
        let product = seed_product(&storage, "Soup", 450);
        let session = open_session(&storage);
        for _ in 0..3 {
            let item = place(&storage, &product, &session);
            storage
                .update_ordered_product_status(item.id, OrderedProductStatus::Done)
                .unwrap();
        }

        let bill = storage.get_bill_from_session(session.id).unwrap();
        assert_eq!(bill.items.len(), 1);
        assert_eq!(bill.items[0].quantity, 3);
        assert_eq!(bill.total_price, Decimal::new(1350, 2));

        let paid = storage.pay_session(session.id).unwrap();
        assert_eq!(paid.status, SessionStatus::Paid);
        assert!(storage.list_ordered_products(session.id).unwrap().is_empty());
        assert_eq!(
            storage.get_session_by_id(session.id).unwrap().status,
            SessionStatus::Paid
        );

        // Ordering against a paid session is rejected by the same transaction guard
        let late = OrderedProduct::new(product.id, session.id);
        assert!(matches!(
            storage.add_ordered_product(&late),
            Err(OrderError::SessionNotOpen(_))
        ));
    }

    #[test]
    fn test_bill_session_preconditions() {
        let storage = storage();
        let product = seed_product(&storage, "Soup", 450);

        let closed = OrderSession::new(3);
        storage.add_session(&closed).unwrap();
        assert!(matches!(
            storage.bill_session(closed.id),
            Err(OrderError::SessionNotOpen(_))
        ));
        assert!(matches!(
            storage.bill_session(Uuid::new_v4()),
            Err(OrderError::SessionNotFound(_))
        ));

        let session = open_session(&storage);
        let item = place(&storage, &product, &session);
        assert!(matches!(
            storage.bill_session(session.id),
            Err(OrderError::ProductsIncomplete(_))
        ));
        // The unchecked variant still prices whatever is there
        assert_eq!(storage.get_bill_from_session(session.id).unwrap().items.len(), 1);

        storage
            .update_ordered_product_status(item.id, OrderedProductStatus::Done)
            .unwrap();
        let bill = storage.bill_session(session.id).unwrap();
        assert_eq!(bill.total_price, Decimal::new(450, 2));
    }

    #[test]
    fn test_category_rules() {
        let storage = storage();
        let drinks = seed_category(&storage, "Drinks");
        let desserts = seed_category(&storage, "Desserts");

        assert!(matches!(
            storage.add_category(&ProductCategory::new("Drinks")),
            Err(OrderError::CategoryNameInUse(_))
        ));
        assert!(matches!(
            storage.rename_category(desserts.id, "Drinks"),
            Err(OrderError::CategoryNameInUse(_))
        ));
        // Renaming to its own name is not a conflict
        assert_eq!(storage.rename_category(drinks.id, "Drinks").unwrap().name, "Drinks");
        assert_eq!(
            storage.rename_category(desserts.id, "Sweets").unwrap().name,
            "Sweets"
        );
        assert!(matches!(
            storage.rename_category(Uuid::new_v4(), "Other"),
            Err(OrderError::CategoryNotFound(_))
        ));

        let names: Vec<String> = storage
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Drinks", "Sweets"]);

        seed_product_in(&storage, &drinks, "Tea", 250);
        seed_product_in(&storage, &drinks, "Coffee", 300);
        assert!(matches!(
            storage.delete_category(drinks.id),
            Err(OrderError::CategoryHasProducts(_))
        ));

        let removed = storage.delete_products_by_category(drinks.id).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].name, "Coffee");
        assert_eq!(storage.delete_category(drinks.id).unwrap().id, drinks.id);
        assert!(matches!(
            storage.list_products_by_category(drinks.id),
            Err(OrderError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn test_product_rules() {
        let storage = storage();
        let mains = seed_category(&storage, "Mains");
        let soup = seed_product_in(&storage, &mains, "Soup", 450);
        let stew = seed_product_in(&storage, &mains, "Stew", 900);

        let orphan = Product {
            id: Uuid::new_v4(),
            name: "Orphan".to_string(),
            description: String::new(),
            category_id: Uuid::new_v4(),
            price: Decimal::ONE,
        };
        assert!(matches!(
            storage.add_product(&orphan),
            Err(OrderError::CategoryNotFound(_))
        ));
        let duplicate = Product {
            id: Uuid::new_v4(),
            name: "Soup".to_string(),
            category_id: mains.id,
            ..orphan
        };
        assert!(matches!(
            storage.add_product(&duplicate),
            Err(OrderError::ProductNameInUse(_))
        ));

        let rename = ProductUpdate {
            name: Some("Stew".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            storage.update_product(soup.id, &rename),
            Err(OrderError::ProductNameInUse(_))
        ));
        let move_away = ProductUpdate {
            category_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(matches!(
            storage.update_product(soup.id, &move_away),
            Err(OrderError::CategoryNotFound(_))
        ));
        let reprice = ProductUpdate {
            name: Some("Soup".to_string()),
            price: Some(Decimal::new(500, 2)),
            ..Default::default()
        };
        let updated = storage.update_product(soup.id, &reprice).unwrap();
        assert_eq!(updated.price, Decimal::new(500, 2));
        assert_eq!(storage.get_product(soup.id).unwrap(), updated);

        // Ordered products pin their product
        let session = open_session(&storage);
        place(&storage, &soup, &session);
        assert!(matches!(
            storage.delete_product(soup.id),
            Err(OrderError::ProductInUse(_))
        ));
        assert!(matches!(
            storage.delete_products_by_category(mains.id),
            Err(OrderError::ProductInUse(_))
        ));
        assert_eq!(storage.list_products_by_category(mains.id).unwrap().len(), 2);

        assert_eq!(storage.delete_product(stew.id).unwrap().id, stew.id);
        assert!(matches!(
            storage.delete_product(stew.id),
            Err(OrderError::ProductNotFound(_))
        ));
        assert_eq!(storage.list_products().unwrap(), vec![updated]);
    }

    #[test]
    fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.redb");
        let session = OrderSession::new(9);
        {
            let storage = OrderStorage::open(&path).unwrap();
            storage.add_session(&session).unwrap();
        }
        let storage = OrderStorage::open(&path).unwrap();
        assert_eq!(storage.get_session_by_id(session.id).unwrap(), session);
    }
}
