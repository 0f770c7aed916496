//! Product Category API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/categories | GET | 分类列表 |
//! | /api/categories | POST | 新增分类 |
//! | /api/categories/{id} | PATCH | 重命名 |
//! | /api/categories/{id} | DELETE | 删除 (仍有菜品时拒绝) |
//! | /api/categories/{id}/products | DELETE | 删除该分类下全部菜品 |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, patch},
};
use serde::Deserialize;
use shared::models::{Product, ProductCategory};
use uuid::Uuid;
use validator::Validate;

use super::blocking;
use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok};

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/categories", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", patch(update).delete(remove))
        .route("/{id}/products", delete(remove_products))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
}

/// GET /api/categories
async fn list(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<ProductCategory>>>> {
    let categories = blocking(&state, |c| c.list_categories()).await?;
    Ok(ok(categories))
}

/// POST /api/categories
async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<Json<AppResponse<ProductCategory>>> {
    payload.validate()?;
    let category = blocking(&state, move |c| c.add_category(payload.name)).await?;
    Ok(ok(category))
}

/// PATCH /api/categories/{id}
async fn update(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> AppResult<Json<AppResponse<ProductCategory>>> {
    payload.validate()?;
    let category = blocking(&state, move |c| c.update_category(id, payload.name)).await?;
    Ok(ok(category))
}

/// DELETE /api/categories/{id}
async fn remove(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AppResponse<ProductCategory>>> {
    let category = blocking(&state, move |c| c.delete_category(id)).await?;
    Ok(ok(category))
}

/// DELETE /api/categories/{id}/products
async fn remove_products(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AppResponse<Vec<Product>>>> {
    let removed = blocking(&state, move |c| c.delete_products_by_category(id)).await?;
    Ok(ok(removed))
}
