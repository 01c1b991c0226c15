pub mod customers;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod shops;
pub mod temp_order_items;
pub mod temp_orders;

pub use customers::Entity as Customers;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use shops::Entity as Shops;
pub use temp_order_items::Entity as TempOrderItems;
pub use temp_orders::Entity as TempOrders;
