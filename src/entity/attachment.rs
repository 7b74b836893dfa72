use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Kind {
  #[sea_orm(string_value = "file")]
  File,
  #[sea_orm(string_value = "image")]
  Image,
  #[sea_orm(string_value = "video")]
  Video,
  #[sea_orm(string_value = "audio")]
  Audio,
}

impl Kind {
  pub fn as_str(self) -> &'static str {
    match self {
      Kind::File => "file",
      Kind::Image => "image",
      Kind::Video => "video",
      Kind::Audio => "audio",
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message_attachments")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(indexed)]
  pub message_id: i32,
  pub kind: Kind,
  pub url: String,
  pub file_name: String,
  pub mime_type: String,
  pub size: i64,
  pub duration: Option<f64>,
  /// JSON array of bar heights in `0..=100`.
  #[sea_orm(column_type = "Text", nullable)]
  pub waveform: Option<String>,
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
