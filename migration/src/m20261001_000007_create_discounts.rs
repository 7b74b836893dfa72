use sea_orm_migration::prelude::*;

use super::{
  m20261001_000001_create_users::Users, m20261001_000006_create_orders::Orders,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Discounts::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Discounts::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Discounts::Code).string().not_null().unique_key())
          .col(ColumnDef::new(Discounts::Description).string().null())
          .col(
            ColumnDef::new(Discounts::DiscountType)
              .string()
              .not_null()
              .default("percentage"),
          )
          .col(ColumnDef::new(Discounts::Value).big_integer().not_null())
          .col(
            ColumnDef::new(Discounts::MinOrderValue)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Discounts::MaxDiscount).big_integer().null())
          .col(ColumnDef::new(Discounts::UsageLimit).integer().null())
          .col(ColumnDef::new(Discounts::MaxUsesPerUser).integer().null())
          .col(ColumnDef::new(Discounts::StartsAt).date_time().null())
          .col(ColumnDef::new(Discounts::ExpiresAt).date_time().null())
          .col(
            ColumnDef::new(Discounts::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(ColumnDef::new(Discounts::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(DiscountUsages::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(DiscountUsages::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(DiscountUsages::DiscountId).integer().not_null())
          .col(ColumnDef::new(DiscountUsages::UserId).integer().not_null())
          .col(ColumnDef::new(DiscountUsages::OrderId).integer().not_null())
          .col(ColumnDef::new(DiscountUsages::UsedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_discount_usages_discount")
              .from(DiscountUsages::Table, DiscountUsages::DiscountId)
              .to(Discounts::Table, Discounts::Id)
              .on_delete(ForeignKeyAction::Restrict),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_discount_usages_user")
              .from(DiscountUsages::Table, DiscountUsages::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_discount_usages_order")
              .from(DiscountUsages::Table, DiscountUsages::OrderId)
              .to(Orders::Table, Orders::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_discount_usages_triple")
          .table(DiscountUsages::Table)
          .col(DiscountUsages::DiscountId)
          .col(DiscountUsages::UserId)
          .col(DiscountUsages::OrderId)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(DiscountUsages::Table).to_owned())
      .await?;
    manager.drop_table(Table::drop().table(Discounts::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
enum Discounts {
  Table,
  Id,
  Code,
  Description,
  DiscountType,
  Value,
  MinOrderValue,
  MaxDiscount,
  UsageLimit,
  MaxUsesPerUser,
  StartsAt,
  ExpiresAt,
  IsActive,
  CreatedAt,
}

#[derive(DeriveIden)]
enum DiscountUsages {
  Table,
  Id,
  DiscountId,
  UserId,
  OrderId,
  UsedAt,
}
