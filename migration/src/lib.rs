pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_users;
mod m20261001_000002_create_products;
mod m20261001_000003_create_cart_items;
mod m20261001_000004_create_address_infos;
mod m20261001_000005_create_shipping_fees;
mod m20261001_000006_create_orders;
mod m20261001_000007_create_discounts;
mod m20261008_000008_create_chat;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20261001_000001_create_users::Migration),
      Box::new(m20261001_000002_create_products::Migration),
      Box::new(m20261001_000003_create_cart_items::Migration),
      Box::new(m20261001_000004_create_address_infos::Migration),
      Box::new(m20261001_000005_create_shipping_fees::Migration),
      Box::new(m20261001_000006_create_orders::Migration),
      Box::new(m20261001_000007_create_discounts::Migration),
      Box::new(m20261008_000008_create_chat::Migration),
    ]
  }
}
