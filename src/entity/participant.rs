use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{conversation, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conversation_participants")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub conversation_id: i32,
  #[sea_orm(primary_key, auto_increment = false)]
  pub user_id: i32,
  pub joined_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "conversation::Entity",
    from = "Column::ConversationId",
    to = "conversation::Column::Id",
    on_delete = "Cascade"
  )]
  Conversation,
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UserId",
    to = "user::Column::Id",
    on_delete = "Cascade"
  )]
  User,
}

impl Related<conversation::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Conversation.def()
  }
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
