use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "address_infos")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub user_id: i32,
  pub country: String,
  pub city_id: i32,
  pub district_id: i32,
  pub ward_id: i32,
  pub address: String,
  pub exact_address: Option<String>,
  pub longitude: Option<f64>,
  pub latitude: Option<f64>,
  pub updated_at: DateTime,
}

impl Model {
  /// Destination handed to the distance matrix: coordinates when known.
  pub fn destination(&self) -> String {
    match (self.latitude, self.longitude) {
      (Some(lat), Some(lng)) => format!("{lat},{lng}"),
      _ => self
        .exact_address
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(&self.address)
        .to_string(),
    }
  }
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
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
