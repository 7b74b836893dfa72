use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::cart_item;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub name: String,
  #[sea_orm(column_type = "Text", nullable)]
  pub description: Option<String>,
  pub price: i64,
  pub stock: i32,
  pub image_url: Option<String>,
  pub is_active: bool,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "cart_item::Entity")]
  CartItems,
}

impl Related<cart_item::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::CartItems.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
