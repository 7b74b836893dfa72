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
          .table(Orders::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Orders::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Orders::UserId).integer().not_null())
          .col(ColumnDef::new(Orders::Subtotal).big_integer().not_null())
          .col(ColumnDef::new(Orders::ShippingFee).big_integer().not_null())
          .col(
            ColumnDef::new(Orders::DiscountAmount)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Orders::Total).big_integer().not_null())
          .col(
            ColumnDef::new(Orders::ShippingMethod)
              .string()
              .not_null()
              .default("standard"),
          )
          .col(
            ColumnDef::new(Orders::Status)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(ColumnDef::new(Orders::ShippingAddress).string().not_null())
          .col(ColumnDef::new(Orders::DistanceKm).double().null())
          .col(ColumnDef::new(Orders::DiscountId).integer().null())
          .col(ColumnDef::new(Orders::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_orders_user")
              .from(Orders::Table, Orders::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_orders_user")
          .table(Orders::Table)
          .col(Orders::UserId)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(OrderItems::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(OrderItems::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
          .col(ColumnDef::new(OrderItems::ProductId).integer().not_null())
          .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
          .col(ColumnDef::new(OrderItems::UnitPrice).big_integer().not_null())
          .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_order_items_order")
              .from(OrderItems::Table, OrderItems::OrderId)
              .to(Orders::Table, Orders::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(OrderItems::Table).to_owned())
      .await?;
    manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Orders {
  Table,
  Id,
  UserId,
  Subtotal,
  ShippingFee,
  DiscountAmount,
  Total,
  ShippingMethod,
  Status,
  ShippingAddress,
  DistanceKm,
  DiscountId,
  CreatedAt,
}

#[derive(DeriveIden)]
enum OrderItems {
  Table,
  Id,
  OrderId,
  ProductId,
  ProductName,
  UnitPrice,
  Quantity,
}
