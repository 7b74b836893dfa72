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
          .table(AddressInfos::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(AddressInfos::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(AddressInfos::UserId)
              .integer()
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(AddressInfos::Country).string().not_null())
          .col(ColumnDef::new(AddressInfos::CityId).integer().not_null())
          .col(ColumnDef::new(AddressInfos::DistrictId).integer().not_null())
          .col(ColumnDef::new(AddressInfos::WardId).integer().not_null())
          .col(ColumnDef::new(AddressInfos::Address).string().not_null())
          .col(ColumnDef::new(AddressInfos::ExactAddress).string().null())
          .col(ColumnDef::new(AddressInfos::Longitude).double().null())
          .col(ColumnDef::new(AddressInfos::Latitude).double().null())
          .col(ColumnDef::new(AddressInfos::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_address_infos_user")
              .from(AddressInfos::Table, AddressInfos::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(AddressInfos::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
enum AddressInfos {
  Table,
  Id,
  UserId,
  Country,
  CityId,
  DistrictId,
  WardId,
  Address,
  ExactAddress,
  Longitude,
  Latitude,
  UpdatedAt,
}
