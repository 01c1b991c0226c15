use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        orders::OrderWithItems,
        temp_orders::{MergeTempOrderRequest, TempOrderList, TempOrderWithItems},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{ListFilter, TempOrder},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_temp_orders))
        .route("/{id}", get(get_temp_order))
        .route("/{id}/merge", post(merge_temp_order))
        .route("/{id}/reject", post(reject_temp_order))
}

#[utoipa::path(
    get,
    path = "/api/temp-orders",
    params(
        ("search" = Option<String>, Query, description = "Case-insensitive match on customer name or phone"),
        ("date_from" = Option<String>, Query, description = "First creation day, YYYY-MM-DD"),
        ("date_to" = Option<String>, Query, description = "Last creation day, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Temp orders of the caller's shop, newest first", body = ApiResponse<TempOrderList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Temp orders"
)]
pub async fn list_temp_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<ListFilter>,
) -> AppResult<Json<ApiResponse<TempOrderList>>> {
    let temp_orders = state
        .orders
        .get_temp_orders_by_shop(user.shop_id, filter)
        .await?;
    let meta = Meta::total(temp_orders.len());
    Ok(Json(ApiResponse::success(
        "OK",
        TempOrderList { items: temp_orders },
        Some(meta),
    )))
}

#[utoipa::path(
    get,
    path = "/api/temp-orders/{id}",
    params(("id" = Uuid, Path, description = "Temp order id")),
    responses(
        (status = 200, description = "Temp order with its lines", body = ApiResponse<TempOrderWithItems>),
        (status = 404, description = "Temp order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Temp orders"
)]
pub async fn get_temp_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TempOrderWithItems>>> {
    let temp_order = state
        .orders
        .get_temp_order_by_id(id, Some(user.shop_id))
        .await?;
    Ok(Json(ApiResponse::success("OK", temp_order, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/temp-orders/{id}/merge",
    params(("id" = Uuid, Path, description = "Temp order id")),
    request_body = MergeTempOrderRequest,
    responses(
        (status = 200, description = "Temp order accepted into an order", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Temp order or target order not found"),
        (status = 409, description = "Temp order already handled, or customer already has an active order"),
    ),
    security(("bearer_auth" = [])),
    tag = "Temp orders"
)]
pub async fn merge_temp_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MergeTempOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let merged = state
        .orders
        .merge_temp_order(id, payload.customer_id, user.shop_id, payload.active_order_id)
        .await?;
    Ok(Json(ApiResponse::success("Temp order merged", merged, None)))
}

#[utoipa::path(
    post,
    path = "/api/temp-orders/{id}/reject",
    params(("id" = Uuid, Path, description = "Temp order id")),
    responses(
        (status = 200, description = "Temp order rejected", body = ApiResponse<TempOrder>),
        (status = 404, description = "Temp order not found"),
        (status = 409, description = "Temp order already handled"),
    ),
    security(("bearer_auth" = [])),
    tag = "Temp orders"
)]
pub async fn reject_temp_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TempOrder>>> {
    let rejected = state.orders.reject_temp_order(id, user.shop_id).await?;
    Ok(Json(ApiResponse::success("Temp order rejected", rejected, None)))
}
