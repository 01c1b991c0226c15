pub mod merge_service;
pub mod order_item_service;
pub mod order_service;
pub mod temp_order_service;

pub use order_service::OrderService;
