//! Order Session API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/sessions | GET | 会话列表 |
//! | /api/sessions | POST | 创建会话 (初始为 closed) |
//! | /api/sessions/{id} | GET | 会话详情 |
//! | /api/sessions/{id} | PATCH | 更新桌号 / 状态，广播 SESSION_UPDATED |
//! | /api/sessions/{id}/ordered-products | GET | 已点菜品 |
//! | /api/sessions/{id}/bill | GET | 账单 |
//! | /api/sessions/{id}/pay | POST | 结账，广播 SESSION_UPDATED |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use shared::models::{Bill, OrderSession, OrderSessionUpdate, OrderedProduct, SessionStatus};
use uuid::Uuid;
use validator::Validate;

use super::blocking;
use crate::core::ServerState;
use crate::utils::{AppResponse, AppResult, ok};

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/sessions", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).patch(update))
        .route("/{id}/ordered-products", get(ordered_products))
        .route("/{id}/bill", get(bill))
        .route("/{id}/pay", post(pay))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[validate(range(min = 1))]
    pub table_number: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    #[validate(range(min = 1))]
    pub table_number: Option<i32>,
    pub status: Option<SessionStatus>,
}

impl From<UpdateSessionRequest> for OrderSessionUpdate {
    fn from(req: UpdateSessionRequest) -> Self {
        Self {
            table_number: req.table_number,
            status: req.status,
        }
    }
}

/// GET /api/sessions
async fn list(State(state): State<ServerState>) -> AppResult<Json<AppResponse<Vec<OrderSession>>>> {
    let sessions = blocking(&state, |c| c.list_sessions()).await?;
    Ok(ok(sessions))
}

/// POST /api/sessions - 桌号缺省时使用 DEFAULT_TABLE_NUMBER
async fn create(
    State(state): State<ServerState>,
    payload: Option<Json<CreateSessionRequest>>,
) -> AppResult<Json<AppResponse<OrderSession>>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate()?;
    let table_number = payload
        .table_number
        .unwrap_or(state.config.default_table_number);
    let session = blocking(&state, move |c| c.create_session(table_number)).await?;
    Ok(ok(session))
}

/// GET /api/sessions/{id}
async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AppResponse<OrderSession>>> {
    let session = blocking(&state, move |c| c.get_session(id)).await?;
    Ok(ok(session))
}

/// PATCH /api/sessions/{id}
async fn update(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSessionRequest>,
) -> AppResult<Json<AppResponse<OrderSession>>> {
    payload.validate()?;
    let update = OrderSessionUpdate::from(payload);
    let session = blocking(&state, move |c| c.update_session(id, update)).await?;

    // 广播会话变更
    state.dispatcher.publish_session_update(&session);

    Ok(ok(session))
}

/// GET /api/sessions/{id}/ordered-products
async fn ordered_products(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AppResponse<Vec<OrderedProduct>>>> {
    let items = blocking(&state, move |c| c.list_ordered_products(id)).await?;
    Ok(ok(items))
}

/// GET /api/sessions/{id}/bill
async fn bill(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AppResponse<Bill>>> {
    let bill = blocking(&state, move |c| c.get_bill(id)).await?;
    Ok(ok(bill))
}

/// POST /api/sessions/{id}/pay
async fn pay(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AppResponse<OrderSession>>> {
    let session = blocking(&state, move |c| c.pay_bill(id)).await?;

    state.dispatcher.publish_session_update(&session);

    Ok(ok(session))
}
