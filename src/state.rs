use std::sync::Arc;

use crate::{
    config::MergeTotals,
    db::OrmConn,
    repository::{OrmOrderItemRepository, OrmOrderRepository},
    services::OrderService,
};

pub type AppOrderService = OrderService<OrmConn, OrmOrderRepository, OrmOrderItemRepository>;

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub orders: Arc<AppOrderService>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(orm: OrmConn, jwt_secret: &str, merge_totals: MergeTotals) -> Self {
        let orders = OrderService::new(
            orm.clone(),
            OrmOrderRepository::new(orm.clone()),
            OrmOrderItemRepository::new(orm.clone()),
        )
        .with_merge_totals(merge_totals);
        Self {
            orm,
            orders: Arc::new(orders),
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
