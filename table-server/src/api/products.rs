//! Product Catalog API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/products | GET | 菜品列表 (`?categoryId=` 按分类过滤) |
//! | /api/products | POST | 新增菜品 |
//! | /api/products/{id} | GET | 菜品详情 |
//! | /api/products/{id} | PATCH | 部分更新 |
//! | /api/products/{id} | DELETE | 删除 (已被点单的菜品不可删) |

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::{Product, ProductCreate, ProductUpdate};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::blocking;
use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok};

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/products", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).patch(update).delete(delete))
}

fn non_negative(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::new("negative_price"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    pub category_id: Uuid,
    #[validate(custom(function = "non_negative"))]
    pub price: Decimal,
}

impl From<CreateProductRequest> for ProductCreate {
    fn from(req: CreateProductRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            category_id: req.category_id,
            price: req.price,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(custom(function = "non_negative"))]
    pub price: Option<Decimal>,
}

impl From<UpdateProductRequest> for ProductUpdate {
    fn from(req: UpdateProductRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            category_id: req.category_id,
            price: req.price,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub category_id: Option<Uuid>,
}

/// GET /api/products
async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Vec<Product>>>> {
    let products = blocking(&state, move |c| c.list_products(query.category_id)).await?;
    Ok(ok(products))
}

/// POST /api/products
async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<AppResponse<Product>>> {
    payload.validate()?;
    let create = ProductCreate::from(payload);
    let product = blocking(&state, move |c| c.add_product(create)).await?;
    Ok(ok(product))
}

/// GET /api/products/{id}
async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AppResponse<Product>>> {
    let product = blocking(&state, move |c| c.get_product(id)).await?;
    Ok(ok(product))
}

/// PATCH /api/products/{id}
async fn update(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<AppResponse<Product>>> {
    payload.validate()?;
    let update = ProductUpdate::from(payload);
    let product = blocking(&state, move |c| c.update_product(id, update)).await?;
    Ok(ok(product))
}

/// DELETE /api/products/{id}
async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AppResponse<Product>>> {
    let product = blocking(&state, move |c| c.delete_product(id)).await?;
    Ok(ok(product))
}
