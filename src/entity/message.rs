use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{attachment, conversation};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
  #[sea_orm(string_value = "text")]
  #[default]
  Text,
  #[sea_orm(string_value = "file")]
  File,
  #[sea_orm(string_value = "image")]
  Image,
  #[sea_orm(string_value = "video")]
  Video,
  #[sea_orm(string_value = "audio")]
  Audio,
  /// Images and videos sent together.
  #[sea_orm(string_value = "media")]
  Media,
  #[sea_orm(string_value = "call")]
  Call,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(indexed)]
  pub conversation_id: i32,
  pub sender_id: i32,
  pub message_type: MessageType,
  #[sea_orm(column_type = "Text", nullable)]
  pub content: Option<String>,
  pub is_deleted: bool,
  pub created_at: DateTime,
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
  #[sea_orm(has_many = "attachment::Entity")]
  Attachments,
}

impl Related<conversation::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Conversation.def()
  }
}

impl Related<attachment::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Attachments.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
