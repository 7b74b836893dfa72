use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
  #[sea_orm(string_value = "active")]
  #[default]
  Active,
  #[sea_orm(string_value = "inactive")]
  Inactive,
}

/// `[min_distance, max_distance)` in kilometers mapped to a flat fee.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipping_fees")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub min_distance: f64,
  pub max_distance: f64,
  pub fee: i64,
  pub status: FeeStatus,
}

impl Model {
  pub fn covers(&self, distance_km: f64) -> bool {
    self.min_distance <= distance_km && distance_km < self.max_distance
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
