use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{order_item, user};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
  #[sea_orm(string_value = "standard")]
  #[default]
  Standard,
  #[sea_orm(string_value = "express")]
  Express,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  #[sea_orm(string_value = "pending")]
  #[default]
  Pending,
  #[sea_orm(string_value = "confirmed")]
  Confirmed,
  #[sea_orm(string_value = "shipping")]
  Shipping,
  #[sea_orm(string_value = "delivered")]
  Delivered,
  #[sea_orm(string_value = "cancelled")]
  Cancelled,
}

impl OrderStatus {
  pub fn can_become(self, next: OrderStatus) -> bool {
    use OrderStatus::*;

    matches!(
      (self, next),
      (Pending, Confirmed)
        | (Confirmed, Shipping)
        | (Shipping, Delivered)
        | (Pending | Confirmed, Cancelled)
    )
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(indexed)]
  pub user_id: i32,
  pub subtotal: i64,
  pub shipping_fee: i64,
  pub discount_amount: i64,
  pub total: i64,
  pub shipping_method: ShippingMethod,
  pub status: OrderStatus,
  pub shipping_address: String,
  pub distance_km: Option<f64>,
  pub discount_id: Option<i32>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UserId",
    to = "user::Column::Id",
    on_delete = "Cascade"
  )]
  User,
  #[sea_orm(has_many = "order_item::Entity")]
  Items,
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl Related<order_item::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Items.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
