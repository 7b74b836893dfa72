use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{message, participant};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conversations")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub title: Option<String>,
  pub is_group: bool,
  pub created_by: i32,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "participant::Entity")]
  Participants,
  #[sea_orm(has_many = "message::Entity")]
  Messages,
}

impl Related<participant::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Participants.def()
  }
}

impl Related<message::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Messages.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
