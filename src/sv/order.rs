use serde::Serialize;

use crate::{
  entity::{OrderStatus, order, order_item, product},
  prelude::*,
  utils::{self, Page, PageReq},
};

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
  #[serde(flatten)]
  pub order: order::Model,
  pub items: Vec<order_item::Model>,
}

pub struct Order<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Order<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn get(&self, id: i32) -> Result<OrderDetail> {
    let order = order::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::OrderNotFound)?;
    let items = order.find_related(order_item::Entity).all(self.db).await?;

    Ok(OrderDetail { order, items })
  }

  pub async fn by_user(
    &self,
    user_id: i32,
    page: PageReq,
  ) -> Result<Page<order::Model>> {
    let query = order::Entity::find()
      .filter(order::Column::UserId.eq(user_id))
      .order_by_desc(order::Column::CreatedAt)
      .order_by_desc(order::Column::Id);

    utils::paginate(self.db, query, page).await
  }

  /// Cancelling puts the ordered quantities back in stock.
  pub async fn set_status(
    &self,
    id: i32,
    status: OrderStatus,
  ) -> Result<order::Model> {
    let txn = self.db.begin().await?;

    let order = order::Entity::find_by_id(id)
      .one(&txn)
      .await?
      .ok_or(Error::OrderNotFound)?;

    if !order.status.can_become(status) {
      return Err(Error::InvalidArgs(format!(
        "Order cannot move from {:?} to {:?}",
        order.status, status
      )));
    }

    if status == OrderStatus::Cancelled {
      let items = order.find_related(order_item::Entity).all(&txn).await?;
      let now = utils::now();

      for item in items {
        let Some(product) =
          product::Entity::find_by_id(item.product_id).one(&txn).await?
        else {
          warn!("order {id} refers to missing product {}", item.product_id);
          continue;
        };
        let stock = product.stock.saturating_add(item.quantity);
        product::ActiveModel {
          stock: Set(stock),
          updated_at: Set(now),
          ..product.into()
        }
        .update(&txn)
        .await?;
      }
    }

    let updated = order::ActiveModel { status: Set(status), ..order.into() }
      .update(&txn)
      .await?;

    txn.commit().await?;
    info!("order {id} is now {status:?}");
    Ok(updated)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::ShippingMethod,
    sv::test_utils::{fixtures, test_db},
  };

  async fn pending(db: &DatabaseConnection) -> order::Model {
    let user = fixtures::user(db, "an").await;
    order::ActiveModel {
      id: NotSet,
      user_id: Set(user.id),
      subtotal: Set(10_000),
      shipping_fee: Set(15_000),
      discount_amount: Set(0),
      total: Set(25_000),
      shipping_method: Set(ShippingMethod::Standard),
      status: Set(OrderStatus::Pending),
      shipping_address: Set("12 Le Loi".into()),
      distance_km: Set(Some(3.0)),
      discount_id: Set(None),
      created_at: Set(utils::now()),
    }
    .insert(db)
    .await
    .unwrap()
  }

  #[tokio::test]
  async fn test_status_flow() {
    let db = test_db::setup().await;
    let order = pending(&db).await;
    let sv = Order::new(&db);

    sv.set_status(order.id, OrderStatus::Confirmed).await.unwrap();
    sv.set_status(order.id, OrderStatus::Shipping).await.unwrap();

    assert!(matches!(
      sv.set_status(order.id, OrderStatus::Cancelled).await,
      Err(Error::InvalidArgs(_))
    ));

    let done = sv.set_status(order.id, OrderStatus::Delivered).await.unwrap();
    assert_eq!(done.status, OrderStatus::Delivered);
  }

  #[tokio::test]
  async fn test_cancel_restocks_items() {
    let db = test_db::setup().await;
    let order = pending(&db).await;
    let tea = fixtures::product(&db, "Tea", 5_000, 8).await;

    order_item::ActiveModel {
      id: NotSet,
      order_id: Set(order.id),
      product_id: Set(tea.id),
      product_name: Set(tea.name.clone()),
      unit_price: Set(tea.price),
      quantity: Set(2),
    }
    .insert(&db)
    .await
    .unwrap();

    let sv = Order::new(&db);
    let cancelled =
      sv.set_status(order.id, OrderStatus::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let tea = crate::sv::Product::new(&db).get(tea.id).await.unwrap();
    assert_eq!(tea.stock, 10);

    assert!(sv.set_status(order.id, OrderStatus::Cancelled).await.is_err());
    let tea = crate::sv::Product::new(&db).get(tea.id).await.unwrap();
    assert_eq!(tea.stock, 10);
  }

  #[tokio::test]
  async fn test_missing_order() {
    let db = test_db::setup().await;
    assert!(matches!(Order::new(&db).get(5).await, Err(Error::OrderNotFound)));
  }
}
