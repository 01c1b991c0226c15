use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};

use crate::{
    dto::temp_orders::{CreateTempOrderRequest, TempOrderWithItems},
    error::AppResult,
    response::ApiResponse,
    state::AppState,
};

// Customer-facing; the share token is the only credential.
pub fn router() -> Router<AppState> {
    Router::new().route("/shops/{share_token}/temp-orders", post(submit_temp_order))
}

#[utoipa::path(
    post,
    path = "/api/public/shops/{share_token}/temp-orders",
    description = "Records a draft order for staff review. Lines naming the same product \
        are combined into one line with the summed quantity, so the response may list fewer \
        items than were submitted.",
    params(("share_token" = String, Path, description = "Public token of the shop")),
    request_body = CreateTempOrderRequest,
    responses(
        (
            status = 200,
            description = "Temp order submitted",
            body = ApiResponse<TempOrderWithItems>
        ),
        (status = 400, description = "Invalid lines or missing customer name"),
        (status = 404, description = "Unknown shop or product"),
    ),
    tag = "Public"
)]
pub async fn submit_temp_order(
    State(state): State<AppState>,
    Path(share_token): Path<String>,
    Json(payload): Json<CreateTempOrderRequest>,
) -> AppResult<Json<ApiResponse<TempOrderWithItems>>> {
    let created = state
        .orders
        .create_temp_order(&share_token, payload)
        .await?;
    Ok(Json(ApiResponse::success("Temp order submitted", created, None)))
}
