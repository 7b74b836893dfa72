use sea_orm_migration::prelude::*;

use super::m20261001_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Conversations::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Conversations::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Conversations::Title).string().null())
          .col(
            ColumnDef::new(Conversations::IsGroup)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Conversations::CreatedBy).integer().not_null())
          .col(ColumnDef::new(Conversations::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Conversations::UpdatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(ConversationParticipants::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ConversationParticipants::ConversationId)
              .integer()
              .not_null(),
          )
          .col(
            ColumnDef::new(ConversationParticipants::UserId)
              .integer()
              .not_null(),
          )
          .col(
            ColumnDef::new(ConversationParticipants::JoinedAt)
              .date_time()
              .not_null(),
          )
          .primary_key(
            Index::create()
              .col(ConversationParticipants::ConversationId)
              .col(ConversationParticipants::UserId),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_participants_conversation")
              .from(
                ConversationParticipants::Table,
                ConversationParticipants::ConversationId,
              )
              .to(Conversations::Table, Conversations::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_participants_user")
              .from(
                ConversationParticipants::Table,
                ConversationParticipants::UserId,
              )
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(Messages::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Messages::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Messages::ConversationId).integer().not_null())
          .col(ColumnDef::new(Messages::SenderId).integer().not_null())
          .col(
            ColumnDef::new(Messages::MessageType)
              .string()
              .not_null()
              .default("text"),
          )
          .col(ColumnDef::new(Messages::Content).text().null())
          .col(
            ColumnDef::new(Messages::IsDeleted)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Messages::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_messages_conversation")
              .from(Messages::Table, Messages::ConversationId)
              .to(Conversations::Table, Conversations::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_messages_conversation")
          .table(Messages::Table)
          .col(Messages::ConversationId)
          .col(Messages::Id)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(MessageAttachments::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(MessageAttachments::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(MessageAttachments::MessageId).integer().not_null(),
          )
          .col(ColumnDef::new(MessageAttachments::Kind).string().not_null())
          .col(ColumnDef::new(MessageAttachments::Url).string().not_null())
          .col(ColumnDef::new(MessageAttachments::FileName).string().not_null())
          .col(ColumnDef::new(MessageAttachments::MimeType).string().not_null())
          .col(ColumnDef::new(MessageAttachments::Size).big_integer().not_null())
          .col(ColumnDef::new(MessageAttachments::Duration).double().null())
          .col(ColumnDef::new(MessageAttachments::Waveform).text().null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_attachments_message")
              .from(MessageAttachments::Table, MessageAttachments::MessageId)
              .to(Messages::Table, Messages::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(MessageReads::Table)
          .if_not_exists()
          .col(ColumnDef::new(MessageReads::MessageId).integer().not_null())
          .col(ColumnDef::new(MessageReads::UserId).integer().not_null())
          .col(ColumnDef::new(MessageReads::ReadAt).date_time().not_null())
          .primary_key(
            Index::create()
              .col(MessageReads::MessageId)
              .col(MessageReads::UserId),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_message_reads_message")
              .from(MessageReads::Table, MessageReads::MessageId)
              .to(Messages::Table, Messages::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(MessageReads::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(MessageAttachments::Table).to_owned())
      .await?;
    manager.drop_table(Table::drop().table(Messages::Table).to_owned()).await?;
    manager
      .drop_table(
        Table::drop().table(ConversationParticipants::Table).to_owned(),
      )
      .await?;
    manager
      .drop_table(Table::drop().table(Conversations::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
enum Conversations {
  Table,
  Id,
  Title,
  IsGroup,
  CreatedBy,
  CreatedAt,
  UpdatedAt,
}

#[derive(DeriveIden)]
enum ConversationParticipants {
  Table,
  ConversationId,
  UserId,
  JoinedAt,
}

#[derive(DeriveIden)]
enum Messages {
  Table,
  Id,
  ConversationId,
  SenderId,
  MessageType,
  Content,
  IsDeleted,
  CreatedAt,
}

#[derive(DeriveIden)]
enum MessageAttachments {
  Table,
  Id,
  MessageId,
  Kind,
  Url,
  FileName,
  MimeType,
  Size,
  Duration,
  Waveform,
}

#[derive(DeriveIden)]
enum MessageReads {
  Table,
  MessageId,
  UserId,
  ReadAt,
}
