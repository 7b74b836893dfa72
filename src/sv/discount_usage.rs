use serde::Deserialize;

use crate::{
  entity::{discount_usage, order},
  prelude::*,
  sv,
  utils::{self, Page, PageReq},
};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UsageFilter {
  pub discount_id: Option<i32>,
  pub user_id: Option<i32>,
}

/// Append-only record of which user redeemed which discount on which order.
pub struct DiscountUsage<'a> {
  db: &'a DatabaseConnection,
}

/// Existence check followed by the insert, on whatever connection the caller
/// holds. A repeated (discount, user, order) triple is refused.
pub async fn record<C: ConnectionTrait>(
  conn: &C,
  discount_id: i32,
  user_id: i32,
  order_id: i32,
) -> Result<discount_usage::Model> {
  let existing = discount_usage::Entity::find()
    .filter(discount_usage::Column::DiscountId.eq(discount_id))
    .filter(discount_usage::Column::UserId.eq(user_id))
    .filter(discount_usage::Column::OrderId.eq(order_id))
    .one(conn)
    .await?;

  if existing.is_some() {
    return Err(Error::DiscountAlreadyUsed);
  }

  let usage = discount_usage::ActiveModel {
    id: NotSet,
    discount_id: Set(discount_id),
    user_id: Set(user_id),
    order_id: Set(order_id),
    used_at: Set(utils::now()),
  };

  // the unique index catches a concurrent insert that slipped past the check
  usage.insert(conn).await.map_err(|err| {
    if Error::is_unique_violation(&err) {
      Error::DiscountAlreadyUsed
    } else {
      Error::Db(err)
    }
  })
}

pub async fn count<C: ConnectionTrait>(
  conn: &C,
  discount_id: i32,
  user_id: Option<i32>,
) -> Result<u64> {
  let mut query = discount_usage::Entity::find()
    .filter(discount_usage::Column::DiscountId.eq(discount_id));

  if let Some(user_id) = user_id {
    query = query.filter(discount_usage::Column::UserId.eq(user_id));
  }

  Ok(query.count(conn).await?)
}

impl<'a> DiscountUsage<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(
    &self,
    discount_id: i32,
    user_id: i32,
    order_id: i32,
  ) -> Result<discount_usage::Model> {
    sv::Discount::new(self.db).get(discount_id).await?;
    sv::User::new(self.db).get(user_id).await?;
    order::Entity::find_by_id(order_id)
      .one(self.db)
      .await?
      .ok_or(Error::OrderNotFound)?;

    let txn = self.db.begin().await?;
    let usage = record(&txn, discount_id, user_id, order_id).await?;
    txn.commit().await?;

    info!(
      "discount {discount_id} used by user {user_id} on order {order_id}"
    );
    Ok(usage)
  }

  pub async fn list(
    &self,
    filter: UsageFilter,
    page: PageReq,
  ) -> Result<Page<discount_usage::Model>> {
    let mut query = discount_usage::Entity::find();

    if let Some(discount_id) = filter.discount_id {
      query = query.filter(discount_usage::Column::DiscountId.eq(discount_id));
    }
    if let Some(user_id) = filter.user_id {
      query = query.filter(discount_usage::Column::UserId.eq(user_id));
    }

    let query = query
      .order_by_desc(discount_usage::Column::UsedAt)
      .order_by_desc(discount_usage::Column::Id);

    utils::paginate(self.db, query, page).await
  }

  pub async fn count_for(
    &self,
    discount_id: i32,
    user_id: Option<i32>,
  ) -> Result<u64> {
    count(self.db, discount_id, user_id).await
  }

  /// Admin-only removal.
  pub async fn delete(&self, id: i32) -> Result<()> {
    let result =
      discount_usage::Entity::delete_by_id(id).exec(self.db).await?;
    if result.rows_affected == 0 {
      return Err(Error::DiscountUsageNotFound);
    }
    warn!("discount usage {id} removed");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::{OrderStatus, ShippingMethod, order},
    sv::{
      discount::{Discount, DiscountInput},
      test_utils::{fixtures, test_db},
    },
  };

  async fn order(db: &DatabaseConnection, user_id: i32) -> order::Model {
    order::ActiveModel {
      id: NotSet,
      user_id: Set(user_id),
      subtotal: Set(100_000),
      shipping_fee: Set(0),
      discount_amount: Set(0),
      total: Set(100_000),
      shipping_method: Set(ShippingMethod::Standard),
      status: Set(OrderStatus::Pending),
      shipping_address: Set("12 Le Loi".into()),
      distance_km: Set(None),
      discount_id: Set(None),
      created_at: Set(utils::now()),
    }
    .insert(db)
    .await
    .unwrap()
  }

  async fn discount(db: &DatabaseConnection, code: &str) -> i32 {
    Discount::new(db).create(DiscountInput::percent(code, 10)).await.unwrap().id
  }

  #[tokio::test]
  async fn test_second_usage_of_same_triple_fails() {
    let db = test_db::setup().await;
    let user = fixtures::user(&db, "an").await;
    let order = order(&db, user.id).await;
    let discount_id = discount(&db, "TET10").await;
    let ledger = DiscountUsage::new(&db);

    ledger.create(discount_id, user.id, order.id).await.unwrap();
    let again = ledger.create(discount_id, user.id, order.id).await;

    assert!(matches!(again, Err(Error::DiscountAlreadyUsed)));
    assert_eq!(ledger.count_for(discount_id, None).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_usage_for_missing_rows() {
    let db = test_db::setup().await;
    let user = fixtures::user(&db, "an").await;
    let order = order(&db, user.id).await;
    let discount_id = discount(&db, "TET10").await;
    let ledger = DiscountUsage::new(&db);

    assert!(matches!(
      ledger.create(discount_id, user.id, 999).await,
      Err(Error::OrderNotFound)
    ));
    assert!(matches!(
      ledger.create(discount_id, 999, order.id).await,
      Err(Error::UserNotFound)
    ));
    assert!(matches!(
      ledger.create(999, user.id, order.id).await,
      Err(Error::DiscountNotFound)
    ));
    assert_eq!(ledger.count_for(discount_id, None).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_used_discount_is_not_deleted() {
    let db = test_db::setup().await;
    let user = fixtures::user(&db, "an").await;
    let order = order(&db, user.id).await;
    let discount_id = discount(&db, "TET10").await;
    let ledger = DiscountUsage::new(&db);
    let usage = ledger.create(discount_id, user.id, order.id).await.unwrap();

    let result = Discount::new(&db).delete(discount_id).await;
    assert!(matches!(result, Err(Error::DiscountInUse(1))));
    assert_eq!(ledger.count_for(discount_id, None).await.unwrap(), 1);

    ledger.delete(usage.id).await.unwrap();
    Discount::new(&db).delete(discount_id).await.unwrap();
  }

  #[tokio::test]
  async fn test_same_discount_on_another_order() {
    let db = test_db::setup().await;
    let user = fixtures::user(&db, "an").await;
    let first = order(&db, user.id).await;
    let second = order(&db, user.id).await;
    let discount_id = discount(&db, "TET10").await;
    let ledger = DiscountUsage::new(&db);

    ledger.create(discount_id, user.id, first.id).await.unwrap();
    ledger.create(discount_id, user.id, second.id).await.unwrap();

    assert_eq!(ledger.count_for(discount_id, Some(user.id)).await.unwrap(), 2);
  }

  #[tokio::test]
  async fn test_list_filters_and_paginates() {
    let db = test_db::setup().await;
    let an = fixtures::user(&db, "an").await;
    let binh = fixtures::user(&db, "binh").await;
    let tet = discount(&db, "TET10").await;
    let summer = discount(&db, "SUMMER").await;
    let ledger = DiscountUsage::new(&db);

    for _ in 0..3 {
      let order = order(&db, an.id).await;
      ledger.create(tet, an.id, order.id).await.unwrap();
    }
    let order_b = order(&db, binh.id).await;
    ledger.create(tet, binh.id, order_b.id).await.unwrap();
    ledger.create(summer, binh.id, order_b.id).await.unwrap();

    let by_discount = ledger
      .list(
        UsageFilter { discount_id: Some(tet), user_id: None },
        PageReq::new(1, 2),
      )
      .await
      .unwrap();
    assert_eq!(by_discount.total, 4);
    assert_eq!(by_discount.total_pages, 2);
    assert_eq!(by_discount.items.len(), 2);

    let by_user = ledger
      .list(
        UsageFilter { discount_id: None, user_id: Some(binh.id) },
        PageReq::default(),
      )
      .await
      .unwrap();
    assert_eq!(by_user.total, 2);
  }

  #[tokio::test]
  async fn test_delete() {
    let db = test_db::setup().await;
    let user = fixtures::user(&db, "an").await;
    let order = order(&db, user.id).await;
    let discount_id = discount(&db, "TET10").await;
    let ledger = DiscountUsage::new(&db);

    let usage = ledger.create(discount_id, user.id, order.id).await.unwrap();
    ledger.delete(usage.id).await.unwrap();

    assert!(matches!(
      ledger.delete(usage.id).await,
      Err(Error::DiscountUsageNotFound)
    ));
    ledger.create(discount_id, user.id, order.id).await.unwrap();
  }
}
