use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::discount_usage;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
  #[sea_orm(string_value = "percentage")]
  #[default]
  Percentage,
  #[sea_orm(string_value = "fixed")]
  Fixed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub code: String,
  pub description: Option<String>,
  pub discount_type: DiscountType,
  pub value: i64,
  pub min_order_value: i64,
  pub max_discount: Option<i64>,
  pub usage_limit: Option<i32>,
  pub max_uses_per_user: Option<i32>,
  pub starts_at: Option<DateTime>,
  pub expires_at: Option<DateTime>,
  pub is_active: bool,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "discount_usage::Entity")]
  Usages,
}

impl Related<discount_usage::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Usages.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
