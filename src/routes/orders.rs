use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CreateOrderItemRequest, CreateOrderRequest, Deleted, OrderItemList, OrderList,
        OrderWithItems,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{ListFilter, Order, OrderItem, OrderItemPatch, OrderPatch},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/{id}", get(get_order).patch(update_order).delete(delete_order))
        .route("/{id}/items", get(list_order_items).post(create_order_item))
        .route(
            "/{id}/items/{item_id}",
            get(get_order_item)
                .patch(update_order_item)
                .delete(delete_order_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("search" = Option<String>, Query, description = "Case-insensitive match on customer name"),
        ("date_from" = Option<String>, Query, description = "First creation day, YYYY-MM-DD"),
        ("date_to" = Option<String>, Query, description = "Last creation day, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Orders of the caller's shop, newest first", body = ApiResponse<OrderList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<ListFilter>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let orders = state.orders.get_orders_by_shop(user.shop_id, filter).await?;
    let meta = Meta::total(orders.len());
    Ok(Json(ApiResponse::success(
        "OK",
        OrderList { items: orders },
        Some(meta),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = ApiResponse<Order>),
        (status = 409, description = "Customer already has an active order"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state
        .orders
        .create_order(payload.customer_id, user.shop_id, payload.notes)
        .await?;
    Ok(Json(ApiResponse::success("Order created", order, None)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its lines", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let order = state.orders.get_order_by_id(id, Some(user.shop_id)).await?;
    Ok(Json(ApiResponse::success("OK", order, Some(Meta::empty()))))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = OrderPatch,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<Order>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<OrderPatch>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state
        .orders
        .update_order_by_id(id, Some(user.shop_id), patch)
        .await?;
    Ok(Json(ApiResponse::success("Order updated", order, None)))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order and its lines deleted", body = ApiResponse<Deleted>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    state.orders.delete_order_by_id(id, Some(user.shop_id)).await?;
    Ok(Json(ApiResponse::success("Order deleted", Deleted { id }, None)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/items",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Lines of the order", body = ApiResponse<OrderItemList>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Order items"
)]
pub async fn list_order_items(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderItemList>>> {
    let items = state
        .orders
        .get_order_items_by_order(id, Some(user.shop_id))
        .await?;
    let meta = Meta::total(items.len());
    Ok(Json(ApiResponse::success(
        "OK",
        OrderItemList { items },
        Some(meta),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/items",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = CreateOrderItemRequest,
    responses(
        (status = 200, description = "Line added", body = ApiResponse<OrderItem>),
        (status = 404, description = "Order or product not found"),
        (status = 409, description = "Product already on the order"),
    ),
    security(("bearer_auth" = [])),
    tag = "Order items"
)]
pub async fn create_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateOrderItemRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let item = state
        .orders
        .create_order_item(id, Some(user.shop_id), payload.product_id, payload.quantity)
        .await?;
    Ok(Json(ApiResponse::success("Order item created", item, None)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id")
    ),
    responses(
        (status = 200, description = "Order line", body = ApiResponse<OrderItem>),
        (status = 404, description = "Order or line not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Order items"
)]
pub async fn get_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let item = state
        .orders
        .get_order_item_by_id(id, Some(user.shop_id), item_id)
        .await?;
    Ok(Json(ApiResponse::success("OK", item, None)))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id")
    ),
    request_body = OrderItemPatch,
    responses(
        (status = 200, description = "Line updated", body = ApiResponse<OrderItem>),
        (status = 404, description = "Order or line not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Order items"
)]
pub async fn update_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(patch): Json<OrderItemPatch>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let item = state
        .orders
        .update_order_item_by_id(id, Some(user.shop_id), item_id, patch)
        .await?;
    Ok(Json(ApiResponse::success("Order item updated", item, None)))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id")
    ),
    responses(
        (status = 200, description = "Line deleted", body = ApiResponse<Deleted>),
        (status = 404, description = "Order or line not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Order items"
)]
pub async fn delete_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    state
        .orders
        .delete_order_item_by_id(id, Some(user.shop_id), item_id)
        .await?;
    Ok(Json(ApiResponse::success(
        "Order item deleted",
        Deleted { id: item_id },
        None,
    )))
}
