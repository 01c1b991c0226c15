use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        orders::{
            CreateOrderItemRequest, CreateOrderRequest, Deleted, OrderItemList, OrderList,
            OrderWithItems,
        },
        temp_orders::{
            CreateTempOrderRequest, MergeTempOrderRequest, TempOrderLine, TempOrderList,
            TempOrderWithItems,
        },
    },
    models::{
        ListFilter, Order, OrderItem, OrderItemPatch, OrderPatch, OrderStatus, TempOrder,
        TempOrderItem, TempOrderStatus,
    },
    response::{ApiResponse, Meta},
    routes::{health, orders, public, temp_orders},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        orders::list_order_items,
        orders::create_order_item,
        orders::get_order_item,
        orders::update_order_item,
        orders::delete_order_item,
        temp_orders::list_temp_orders,
        temp_orders::get_temp_order,
        temp_orders::merge_temp_order,
        temp_orders::reject_temp_order,
        public::submit_temp_order
    ),
    components(
        schemas(
            Order,
            OrderItem,
            OrderStatus,
            TempOrder,
            TempOrderItem,
            TempOrderStatus,
            OrderPatch,
            OrderItemPatch,
            ListFilter,
            CreateOrderRequest,
            CreateOrderItemRequest,
            CreateTempOrderRequest,
            TempOrderLine,
            MergeTempOrderRequest,
            OrderList,
            OrderItemList,
            OrderWithItems,
            TempOrderList,
            TempOrderWithItems,
            Deleted,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderItem>,
            ApiResponse<OrderList>,
            ApiResponse<OrderItemList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<TempOrder>,
            ApiResponse<TempOrderList>,
            ApiResponse<TempOrderWithItems>,
            ApiResponse<Deleted>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Staff order endpoints"),
        (name = "Order items", description = "Lines of a staff order"),
        (name = "Temp orders", description = "Customer drafts awaiting staff review"),
        (
            name = "Public",
            description = "Customer-facing endpoints reached through a shop share token"
        ),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
