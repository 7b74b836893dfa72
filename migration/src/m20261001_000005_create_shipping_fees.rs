use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(ShippingFees::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ShippingFees::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(ShippingFees::MinDistance).double().not_null())
          .col(ColumnDef::new(ShippingFees::MaxDistance).double().not_null())
          .col(ColumnDef::new(ShippingFees::Fee).big_integer().not_null())
          .col(
            ColumnDef::new(ShippingFees::Status)
              .string()
              .not_null()
              .default("active"),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ShippingFees::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
enum ShippingFees {
  Table,
  Id,
  MinDistance,
  MaxDistance,
  Fee,
  Status,
}
