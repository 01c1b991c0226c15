pub mod auth;
pub mod orders;
pub mod temp_orders;
