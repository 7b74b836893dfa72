use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{discount, order, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discount_usages")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub discount_id: i32,
  pub user_id: i32,
  pub order_id: i32,
  pub used_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "discount::Entity",
    from = "Column::DiscountId",
    to = "discount::Column::Id",
    on_delete = "Restrict"
  )]
  Discount,
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UserId",
    to = "user::Column::Id",
    on_delete = "Cascade"
  )]
  User,
  #[sea_orm(
    belongs_to = "order::Entity",
    from = "Column::OrderId",
    to = "order::Column::Id",
    on_delete = "Cascade"
  )]
  Order,
}

impl Related<discount::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Discount.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
