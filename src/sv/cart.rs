use serde::Serialize;

use crate::{
  entity::{cart_item, product},
  prelude::*,
  sv, utils,
};

pub struct Cart<'a> {
  db: &'a DatabaseConnection,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
  pub id: i32,
  pub product_id: i32,
  pub name: String,
  pub image_url: Option<String>,
  pub unit_price: i64,
  pub quantity: i32,
  pub stock: i32,
  pub line_total: i64,
}

impl CartLine {
  fn new(item: cart_item::Model, product: product::Model) -> Self {
    Self {
      id: item.id,
      product_id: product.id,
      name: product.name,
      image_url: product.image_url,
      unit_price: product.price,
      quantity: item.quantity,
      stock: product.stock,
      line_total: product.price.saturating_mul(item.quantity as i64),
    }
  }
}

pub fn subtotal(lines: &[CartLine]) -> i64 {
  lines.iter().map(|line| line.line_total).fold(0, i64::saturating_add)
}

impl<'a> Cart<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  async fn find(
    &self,
    user_id: i32,
    product_id: i32,
  ) -> Result<Option<cart_item::Model>> {
    Ok(
      cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .one(self.db)
        .await?,
    )
  }

  fn check_quantity(product: &product::Model, quantity: i32) -> Result<()> {
    if !product.is_active {
      return Err(Error::ProductUnavailable(product.id));
    }
    if quantity > product.stock {
      return Err(Error::OutOfStock {
        product_id: product.id,
        available: product.stock,
      });
    }
    Ok(())
  }

  /// Adds to the cart; a product already in the cart has its quantity raised.
  pub async fn add(
    &self,
    user_id: i32,
    product_id: i32,
    quantity: i32,
  ) -> Result<cart_item::Model> {
    if quantity < 1 {
      return Err(Error::InvalidArgs("Quantity must be at least 1".into()));
    }

    sv::User::new(self.db).get(user_id).await?;
    let product = sv::Product::new(self.db).get(product_id).await?;

    match self.find(user_id, product_id).await? {
      Some(item) => {
        let quantity = item.quantity.checked_add(quantity).ok_or(
          Error::OutOfStock { product_id, available: product.stock },
        )?;
        Self::check_quantity(&product, quantity)?;

        Ok(
          cart_item::ActiveModel { quantity: Set(quantity), ..item.into() }
            .update(self.db)
            .await?,
        )
      }
      None => {
        Self::check_quantity(&product, quantity)?;

        let item = cart_item::ActiveModel {
          id: NotSet,
          user_id: Set(user_id),
          product_id: Set(product_id),
          quantity: Set(quantity),
          created_at: Set(utils::now()),
        };
        Ok(item.insert(self.db).await?)
      }
    }
  }

  pub async fn set_quantity(
    &self,
    user_id: i32,
    product_id: i32,
    quantity: i32,
  ) -> Result<cart_item::Model> {
    if quantity < 1 {
      return Err(Error::InvalidArgs("Quantity must be at least 1".into()));
    }

    let item = self
      .find(user_id, product_id)
      .await?
      .ok_or(Error::CartItemNotFound)?;
    let product = sv::Product::new(self.db).get(product_id).await?;
    Self::check_quantity(&product, quantity)?;

    Ok(
      cart_item::ActiveModel { quantity: Set(quantity), ..item.into() }
        .update(self.db)
        .await?,
    )
  }

  pub async fn remove(&self, user_id: i32, product_id: i32) -> Result<()> {
    let result = cart_item::Entity::delete_many()
      .filter(cart_item::Column::UserId.eq(user_id))
      .filter(cart_item::Column::ProductId.eq(product_id))
      .exec(self.db)
      .await?;

    if result.rows_affected == 0 {
      return Err(Error::CartItemNotFound);
    }
    Ok(())
  }

  pub async fn items(&self, user_id: i32) -> Result<Vec<CartLine>> {
    self.lines(user_id, None).await
  }

  /// Cart lines, optionally narrowed to the given products.
  pub async fn lines(
    &self,
    user_id: i32,
    product_ids: Option<&[i32]>,
  ) -> Result<Vec<CartLine>> {
    let mut query =
      cart_item::Entity::find().filter(cart_item::Column::UserId.eq(user_id));

    if let Some(ids) = product_ids {
      query =
        query.filter(cart_item::Column::ProductId.is_in(ids.iter().copied()));
    }

    let rows = query
      .order_by_asc(cart_item::Column::CreatedAt)
      .order_by_asc(cart_item::Column::Id)
      .find_also_related(product::Entity)
      .all(self.db)
      .await?;

    Ok(
      rows
        .into_iter()
        .filter_map(|(item, product)| {
          product.map(|product| CartLine::new(item, product))
        })
        .collect(),
    )
  }

  pub async fn clear(&self, user_id: i32, product_ids: &[i32]) -> Result<u64> {
    let result = cart_item::Entity::delete_many()
      .filter(cart_item::Column::UserId.eq(user_id))
      .filter(cart_item::Column::ProductId.is_in(product_ids.iter().copied()))
      .exec(self.db)
      .await?;
    Ok(result.rows_affected)
  }
}
