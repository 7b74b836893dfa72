use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::message;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message_reads")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub message_id: i32,
  #[sea_orm(primary_key, auto_increment = false)]
  pub user_id: i32,
  pub read_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "message::Entity",
    from = "Column::MessageId",
    to = "message::Column::Id",
    on_delete = "Cascade"
  )]
  Message,
}

impl Related<message::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Message.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
