use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "temp_order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub temp_order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: i64,
    pub quantity: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::temp_orders::Entity",
        from = "Column::TempOrderId",
        to = "super::temp_orders::Column::Id"
    )]
    TempOrders,
}

impl Related<super::temp_orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TempOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
