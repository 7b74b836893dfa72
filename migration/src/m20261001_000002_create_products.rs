use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Products::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Products::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Products::Name).string().not_null())
          .col(ColumnDef::new(Products::Description).text().null())
          .col(ColumnDef::new(Products::Price).big_integer().not_null())
          .col(
            ColumnDef::new(Products::Stock).integer().not_null().default(0),
          )
          .col(ColumnDef::new(Products::ImageUrl).string().null())
          .col(
            ColumnDef::new(Products::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(ColumnDef::new(Products::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Products::UpdatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_products_name")
          .table(Products::Table)
          .col(Products::Name)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Products::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Products {
  Table,
  Id,
  Name,
  Description,
  Price,
  Stock,
  ImageUrl,
  IsActive,
  CreatedAt,
  UpdatedAt,
}
