use serde::{Deserialize, Serialize};

use crate::{
  config::ShippingPolicy,
  entity::{OrderStatus, ShippingMethod, cart_item, order, order_item, product},
  prelude::*,
  sv::{
    self,
    cart::{CartLine, subtotal},
    discount::AppliedDiscount,
    discount_usage,
    distance::DistanceProvider,
    shipping::ShippingQuote,
  },
  utils,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutReq {
  pub product_ids: Vec<i32>,
  #[serde(default)]
  pub method: ShippingMethod,
  pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
  pub items: Vec<CartLine>,
  pub subtotal: i64,
  pub shipping: ShippingQuote,
  pub discount: Option<AppliedDiscount>,
  pub total: i64,
  pub shipping_address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
  pub order: order::Model,
  pub items: Vec<order_item::Model>,
  /// Set when the order went through without a distance, at fee 0.
  pub shipping_error: Option<String>,
}

pub fn total(subtotal: i64, shipping_fee: i64, discount: i64) -> i64 {
  subtotal.saturating_sub(discount).max(0).saturating_add(shipping_fee)
}

pub struct Checkout<'a> {
  db: &'a DatabaseConnection,
  distance: &'a dyn DistanceProvider,
  policy: &'a ShippingPolicy,
}

impl<'a> Checkout<'a> {
  pub fn new(
    db: &'a DatabaseConnection,
    distance: &'a dyn DistanceProvider,
    policy: &'a ShippingPolicy,
  ) -> Self {
    Self { db, distance, policy }
  }

  pub async fn summary(
    &self,
    user_id: i32,
    req: &CheckoutReq,
  ) -> Result<OrderSummary> {
    if req.product_ids.is_empty() {
      return Err(Error::EmptyCheckout);
    }

    let address = sv::Address::new(self.db).get(user_id).await?;
    let items =
      sv::Cart::new(self.db).lines(user_id, Some(&req.product_ids)).await?;
    if items.is_empty() {
      return Err(Error::EmptyCheckout);
    }

    let subtotal = subtotal(&items);
    let shipping = sv::Shipping::new(self.db)
      .quote(self.distance, self.policy, &address.destination(), req.method)
      .await?;

    let discount = match req.discount_code.as_deref().map(str::trim) {
      Some(code) if !code.is_empty() => Some(
        sv::Discount::new(self.db).evaluate(code, user_id, subtotal).await?,
      ),
      _ => None,
    };

    let discount_amount = discount.as_ref().map_or(0, |d| d.amount);

    Ok(OrderSummary {
      total: total(subtotal, shipping.fee, discount_amount),
      items,
      subtotal,
      shipping,
      discount,
      shipping_address: address
        .exact_address
        .clone()
        .unwrap_or_else(|| address.address.clone()),
    })
  }

  /// Writes the order, takes stock, books the discount and empties the
  /// purchased cart lines, all in one transaction.
  pub async fn place(
    &self,
    user_id: i32,
    req: &CheckoutReq,
  ) -> Result<PlacedOrder> {
    let summary = self.summary(user_id, req).await?;
    let now = utils::now();

    let txn = self.db.begin().await?;

    for line in &summary.items {
      let product = product::Entity::find_by_id(line.product_id)
        .one(&txn)
        .await?
        .ok_or(Error::ProductNotFound)?;

      if !product.is_active {
        return Err(Error::ProductUnavailable(product.id));
      }
      if product.stock < line.quantity {
        return Err(Error::OutOfStock {
          product_id: product.id,
          available: product.stock,
        });
      }

      let stock = product.stock - line.quantity;
      product::ActiveModel {
        stock: Set(stock),
        updated_at: Set(now),
        ..product.into()
      }
      .update(&txn)
      .await?;
    }

    let discount_amount = summary.discount.as_ref().map_or(0, |d| d.amount);
    let order = order::ActiveModel {
      id: NotSet,
      user_id: Set(user_id),
      subtotal: Set(summary.subtotal),
      shipping_fee: Set(summary.shipping.fee),
      discount_amount: Set(discount_amount),
      total: Set(summary.total),
      shipping_method: Set(req.method),
      status: Set(OrderStatus::Pending),
      shipping_address: Set(summary.shipping_address.clone()),
      distance_km: Set(summary.shipping.distance_km),
      discount_id: Set(summary.discount.as_ref().map(|d| d.discount_id)),
      created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(summary.items.len());
    for line in &summary.items {
      let item = order_item::ActiveModel {
        id: NotSet,
        order_id: Set(order.id),
        product_id: Set(line.product_id),
        product_name: Set(line.name.clone()),
        unit_price: Set(line.unit_price),
        quantity: Set(line.quantity),
      }
      .insert(&txn)
      .await?;
      items.push(item);
    }

    if let Some(discount) = &summary.discount {
      discount_usage::record(&txn, discount.discount_id, user_id, order.id)
        .await?;
    }

    let purchased: Vec<i32> =
      summary.items.iter().map(|line| line.product_id).collect();
    cart_item::Entity::delete_many()
      .filter(cart_item::Column::UserId.eq(user_id))
      .filter(cart_item::Column::ProductId.is_in(purchased))
      .exec(&txn)
      .await?;

    txn.commit().await?;

    info!(
      "order {} placed by user {user_id}: {} items, total {}",
      order.id,
      items.len(),
      order.total
    );

    Ok(PlacedOrder { order, items, shipping_error: summary.shipping.error })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::FeeStatus,
    sv::{
      address::AddressInput,
      discount::DiscountInput,
      shipping::BandInput,
      test_utils::{fixtures, fixtures::FixedDistance, test_db},
    },
  };

  fn policy() -> ShippingPolicy {
    ShippingPolicy { origin: "shop".into(), express_surcharge: 15_000 }
  }

  struct Shop {
    db: DatabaseConnection,
    user_id: i32,
    tea: i32,
    cake: i32,
  }

  async fn shop() -> Shop {
    let db = test_db::setup().await;
    let user = fixtures::user(&db, "an").await;
    let tea = fixtures::product(&db, "Tea", 25_000, 10).await;
    let cake = fixtures::product(&db, "Cake", 40_000, 1).await;

    sv::Address::new(&db)
      .upsert(
        user.id,
        AddressInput {
          country: "VN".into(),
          city_id: 79,
          district_id: 760,
          ward_id: 26734,
          address: "12 Le Loi".into(),
          exact_address: None,
          longitude: None,
          latitude: None,
        },
      )
      .await
      .unwrap();

    let shipping = sv::Shipping::new(&db);
    for (min, max, fee) in [(0.0, 5.0, 15_000), (5.0, 20.0, 30_000)] {
      shipping
        .create(BandInput {
          min_distance: min,
          max_distance: max,
          fee,
          status: FeeStatus::Active,
        })
        .await
        .unwrap();
    }

    let cart = sv::Cart::new(&db);
    cart.add(user.id, tea.id, 2).await.unwrap();
    cart.add(user.id, cake.id, 1).await.unwrap();

    Shop { db, user_id: user.id, tea: tea.id, cake: cake.id }
  }

  fn req(product_ids: Vec<i32>, method: ShippingMethod) -> CheckoutReq {
    CheckoutReq { product_ids, method, discount_code: None }
  }

  #[test]
  fn test_total_composition() {
    assert_eq!(total(90_000, 15_000, 0), 105_000);
    assert_eq!(total(90_000, 15_000, 10_000), 95_000);
    assert_eq!(total(10_000, 15_000, 50_000), 15_000);
    assert_eq!(total(i64::MAX, 15_000, 0), i64::MAX);
  }

  #[tokio::test]
  async fn test_summary_of_selected_items() {
    let shop = shop().await;
    let distance = FixedDistance(Some(3_000));
    let policy = policy();

    let summary = Checkout::new(&shop.db, &distance, &policy)
      .summary(shop.user_id, &req(vec![shop.tea], ShippingMethod::Standard))
      .await
      .unwrap();

    assert_eq!(summary.items.len(), 1);
    assert_eq!(summary.subtotal, 50_000);
    assert_eq!(summary.shipping.fee, 15_000);
    assert_eq!(summary.total, 65_000);
  }

  #[tokio::test]
  async fn test_express_summary() {
    let shop = shop().await;
    let distance = FixedDistance(Some(8_000));
    let policy = policy();

    let summary = Checkout::new(&shop.db, &distance, &policy)
      .summary(
        shop.user_id,
        &req(vec![shop.tea, shop.cake], ShippingMethod::Express),
      )
      .await
      .unwrap();

    assert_eq!(summary.subtotal, 90_000);
    assert_eq!(summary.shipping.fee, 45_000);
    assert_eq!(summary.total, 135_000);
  }

  #[tokio::test]
  async fn test_place_order() {
    let shop = shop().await;
    let distance = FixedDistance(Some(3_000));
    let policy = policy();

    let placed = Checkout::new(&shop.db, &distance, &policy)
      .place(
        shop.user_id,
        &req(vec![shop.tea, shop.cake], ShippingMethod::Standard),
      )
      .await
      .unwrap();

    assert_eq!(placed.order.total, 105_000);
    assert_eq!(placed.items.len(), 2);
    assert!(placed.shipping_error.is_none());

    let products = sv::Product::new(&shop.db);
    assert_eq!(products.get(shop.tea).await.unwrap().stock, 8);
    assert_eq!(products.get(shop.cake).await.unwrap().stock, 0);
    let cart = sv::Cart::new(&shop.db).items(shop.user_id).await.unwrap();
    assert!(cart.is_empty());
  }

  #[tokio::test]
  async fn test_place_without_distance() {
    let shop = shop().await;
    let distance = FixedDistance(None);
    let policy = policy();

    let placed = Checkout::new(&shop.db, &distance, &policy)
      .place(shop.user_id, &req(vec![shop.tea], ShippingMethod::Express))
      .await
      .unwrap();

    assert_eq!(placed.order.shipping_fee, 0);
    assert_eq!(placed.order.total, 50_000);
    assert!(placed.shipping_error.is_some());
  }

  #[tokio::test]
  async fn test_out_of_stock_rolls_back() {
    let shop = shop().await;
    let distance = FixedDistance(Some(3_000));
    let policy = policy();

    sv::Product::new(&shop.db).adjust_stock(shop.cake, -1).await.unwrap();

    let result = Checkout::new(&shop.db, &distance, &policy)
      .place(
        shop.user_id,
        &req(vec![shop.tea, shop.cake], ShippingMethod::Standard),
      )
      .await;

    assert!(matches!(result, Err(Error::OutOfStock { .. })));
    let tea = sv::Product::new(&shop.db).get(shop.tea).await.unwrap();
    assert_eq!(tea.stock, 10);
    let cart = sv::Cart::new(&shop.db).items(shop.user_id).await.unwrap();
    assert_eq!(cart.len(), 2);
  }

  #[tokio::test]
  async fn test_discount_is_booked_once_per_user() {
    let shop = shop().await;
    let distance = FixedDistance(Some(3_000));
    let policy = policy();

    let mut input = DiscountInput::percent("WELCOME", 10);
    input.max_uses_per_user = Some(1);
    let discount = sv::Discount::new(&shop.db).create(input).await.unwrap();

    let checkout = Checkout::new(&shop.db, &distance, &policy);
    let mut with_code = req(vec![shop.tea], ShippingMethod::Standard);
    with_code.discount_code = Some("welcome".into());

    let placed = checkout.place(shop.user_id, &with_code).await.unwrap();
    assert_eq!(placed.order.discount_amount, 5_000);
    assert_eq!(placed.order.total, 60_000);

    let used = sv::DiscountUsage::new(&shop.db)
      .count_for(discount.id, Some(shop.user_id))
      .await
      .unwrap();
    assert_eq!(used, 1);

    sv::Cart::new(&shop.db).add(shop.user_id, shop.tea, 1).await.unwrap();
    let again = checkout.summary(shop.user_id, &with_code).await;
    assert!(matches!(again, Err(Error::DiscountRejected(_))));
  }

  #[tokio::test]
  async fn test_nothing_selected() {
    let shop = shop().await;
    let distance = FixedDistance(Some(3_000));
    let policy = policy();

    let result = Checkout::new(&shop.db, &distance, &policy)
      .summary(shop.user_id, &req(vec![], ShippingMethod::Standard))
      .await;

    assert!(matches!(result, Err(Error::EmptyCheckout)));
  }
}
