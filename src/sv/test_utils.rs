//! Shared test utilities for database setup

#[cfg(test)]
pub mod test_db {
  use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait,
    Schema,
  };

  use crate::entity::*;

  async fn create<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
  ) {
    let stmt = schema.create_table_from_entity(entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();
  }

  /// Creates an in-memory SQLite database with all required tables
  pub async fn setup() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let schema = Schema::new(DbBackend::Sqlite);

    create(&db, &schema, user::Entity).await;
    create(&db, &schema, product::Entity).await;
    create(&db, &schema, cart_item::Entity).await;
    create(&db, &schema, address::Entity).await;
    create(&db, &schema, shipping_fee::Entity).await;
    create(&db, &schema, order::Entity).await;
    create(&db, &schema, order_item::Entity).await;
    create(&db, &schema, discount::Entity).await;
    create(&db, &schema, discount_usage::Entity).await;
    create(&db, &schema, conversation::Entity).await;
    create(&db, &schema, participant::Entity).await;
    create(&db, &schema, message::Entity).await;
    create(&db, &schema, attachment::Entity).await;
    create(&db, &schema, message_read::Entity).await;

    db
  }
}

#[cfg(test)]
pub mod fixtures {
  use async_trait::async_trait;
  use sea_orm::DatabaseConnection;

  use crate::{
    entity::{product, user},
    prelude::*,
    sv::{self, distance::DistanceProvider, product::ProductInput},
  };

  /// Distance provider answering with a fixed value, or failing.
  pub struct FixedDistance(pub Option<u64>);

  #[async_trait]
  impl DistanceProvider for FixedDistance {
    async fn distance_meters(&self, _: &str, _: &str) -> Result<u64> {
      self.0.ok_or_else(|| Error::Distance("OVER_QUERY_LIMIT".into()))
    }
  }

  pub async fn user(db: &DatabaseConnection, name: &str) -> user::Model {
    sv::User::new(db)
      .create(name, &format!("{name}@example.com"), None)
      .await
      .unwrap()
  }

  pub async fn product(
    db: &DatabaseConnection,
    name: &str,
    price: i64,
    stock: i32,
  ) -> product::Model {
    sv::Product::new(db)
      .create(ProductInput {
        name: name.into(),
        description: None,
        price,
        stock,
        image_url: None,
      })
      .await
      .unwrap()
  }
}
