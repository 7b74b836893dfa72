use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{address, cart_item, order, participant};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub name: String,
  #[sea_orm(unique)]
  pub email: String,
  pub avatar_url: Option<String>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "cart_item::Entity")]
  CartItems,
  #[sea_orm(has_one = "address::Entity")]
  Address,
  #[sea_orm(has_many = "order::Entity")]
  Orders,
  #[sea_orm(has_many = "participant::Entity")]
  Participations,
}

impl Related<cart_item::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::CartItems.def()
  }
}

impl Related<address::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Address.def()
  }
}

impl Related<order::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Orders.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
