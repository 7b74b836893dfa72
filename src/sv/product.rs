use sea_orm::Condition;
use serde::Deserialize;

use crate::{
  entity::product,
  prelude::*,
  utils::{self, Page, PageReq},
};

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
  pub name: String,
  pub description: Option<String>,
  pub price: i64,
  #[serde(default)]
  pub stock: i32,
  pub image_url: Option<String>,
}

/// Partial update; absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price: Option<i64>,
  pub stock: Option<i32>,
  pub image_url: Option<String>,
  pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
  pub q: Option<String>,
  pub active: Option<bool>,
}

pub struct Product<'a> {
  db: &'a DatabaseConnection,
}

fn validate(name: &str, price: i64, stock: i32) -> Result<()> {
  if name.trim().is_empty() {
    return Err(Error::InvalidArgs("Product name is required".into()));
  }
  if price < 0 {
    return Err(Error::InvalidArgs("Price cannot be negative".into()));
  }
  if stock < 0 {
    return Err(Error::InvalidArgs("Stock cannot be negative".into()));
  }
  Ok(())
}

impl<'a> Product<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, input: ProductInput) -> Result<product::Model> {
    validate(&input.name, input.price, input.stock)?;

    let now = utils::now();
    let product = product::ActiveModel {
      id: NotSet,
      name: Set(input.name.trim().to_string()),
      description: Set(input.description),
      price: Set(input.price),
      stock: Set(input.stock),
      image_url: Set(input.image_url),
      is_active: Set(true),
      created_at: Set(now),
      updated_at: Set(now),
    };

    Ok(product.insert(self.db).await?)
  }

  pub async fn by_id(&self, id: i32) -> Result<Option<product::Model>> {
    Ok(product::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn get(&self, id: i32) -> Result<product::Model> {
    self.by_id(id).await?.ok_or(Error::ProductNotFound)
  }

  pub async fn list(
    &self,
    filter: ProductFilter,
    page: PageReq,
  ) -> Result<Page<product::Model>> {
    let mut cond = Condition::all();

    if let Some(q) = filter.q.as_deref().map(str::trim)
      && !q.is_empty()
    {
      cond = cond.add(product::Column::Name.contains(q));
    }
    if let Some(active) = filter.active {
      cond = cond.add(product::Column::IsActive.eq(active));
    }

    let select = product::Entity::find()
      .filter(cond)
      .order_by_desc(product::Column::CreatedAt)
      .order_by_desc(product::Column::Id);

    utils::paginate(self.db, select, page).await
  }

  pub async fn update(
    &self,
    id: i32,
    patch: ProductPatch,
  ) -> Result<product::Model> {
    let product = self.get(id).await?;

    let name = patch.name.unwrap_or_else(|| product.name.clone());
    let price = patch.price.unwrap_or(product.price);
    let stock = patch.stock.unwrap_or(product.stock);
    validate(&name, price, stock)?;

    let description = patch.description.or(product.description.clone());
    let image_url = patch.image_url.or(product.image_url.clone());
    let is_active = patch.is_active.unwrap_or(product.is_active);

    let updated = product::ActiveModel {
      name: Set(name.trim().to_string()),
      description: Set(description),
      price: Set(price),
      stock: Set(stock),
      image_url: Set(image_url),
      is_active: Set(is_active),
      updated_at: Set(utils::now()),
      ..product.into()
    }
    .update(self.db)
    .await?;

    Ok(updated)
  }

  /// Products stay referenced by carts and order history, so removal only
  /// hides them from the catalog.
  pub async fn deactivate(&self, id: i32) -> Result<product::Model> {
    self
      .update(id, ProductPatch { is_active: Some(false), ..Default::default() })
      .await
  }

  pub async fn adjust_stock(
    &self,
    id: i32,
    delta: i32,
  ) -> Result<product::Model> {
    let txn = self.db.begin().await?;

    let product = product::Entity::find_by_id(id)
      .one(&txn)
      .await?
      .ok_or(Error::ProductNotFound)?;

    let stock = product
      .stock
      .checked_add(delta)
      .ok_or_else(|| Error::InvalidArgs("Stock is out of range".into()))?;
    if stock < 0 {
      return Err(Error::OutOfStock {
        product_id: id,
        available: product.stock,
      });
    }

    let updated = product::ActiveModel {
      stock: Set(stock),
      updated_at: Set(utils::now()),
      ..product.into()
    }
    .update(&txn)
    .await?;

    txn.commit().await?;
    info!("stock of product {id} adjusted by {delta} to {stock}");
    Ok(updated)
  }

  pub async fn low_stock(&self, threshold: i32) -> Result<Vec<product::Model>> {
    Ok(
      product::Entity::find()
        .filter(product::Column::IsActive.eq(true))
        .filter(product::Column::Stock.lte(threshold))
        .order_by_asc(product::Column::Stock)
        .all(self.db)
        .await?,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::test_utils::{fixtures, test_db};

  #[tokio::test]
  async fn test_create_rejects_negative_price() {
    let db = test_db::setup().await;

    let result = Product::new(&db)
      .create(ProductInput {
        name: "Mug".into(),
        description: None,
        price: -1,
        stock: 1,
        image_url: None,
      })
      .await;

    assert!(matches!(result, Err(Error::InvalidArgs(_))));
  }

  #[tokio::test]
  async fn test_list_filters_and_paginates() {
    let db = test_db::setup().await;
    for i in 0..5 {
      fixtures::product(&db, &format!("Tea {i}"), 1000, 10).await;
    }
    fixtures::product(&db, "Coffee", 2000, 10).await;

    let sv = Product::new(&db);
    let page = sv
      .list(
        ProductFilter { q: Some("Tea".into()), active: None },
        PageReq::new(2, 2),
      )
      .await
      .unwrap();

    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items.len(), 2);
  }

  #[tokio::test]
  async fn test_deactivated_hidden_from_active_list() {
    let db = test_db::setup().await;
    let sv = Product::new(&db);
    let mug = fixtures::product(&db, "Mug", 1000, 1).await;
    fixtures::product(&db, "Cup", 1000, 1).await;

    sv.deactivate(mug.id).await.unwrap();

    let page = sv
      .list(
        ProductFilter { q: None, active: Some(true) },
        PageReq::default(),
      )
      .await
      .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].name, "Cup");
  }

  #[tokio::test]
  async fn test_adjust_stock_never_negative() {
    let db = test_db::setup().await;
    let sv = Product::new(&db);
    let mug = fixtures::product(&db, "Mug", 1000, 3).await;

    assert_eq!(sv.adjust_stock(mug.id, -2).await.unwrap().stock, 1);
    assert!(matches!(
      sv.adjust_stock(mug.id, -2).await,
      Err(Error::OutOfStock { available: 1, .. })
    ));
    assert_eq!(sv.get(mug.id).await.unwrap().stock, 1);
  }

  #[tokio::test]
  async fn test_adjust_stock_out_of_range() {
    let db = test_db::setup().await;
    let sv = Product::new(&db);
    let mug = fixtures::product(&db, "Mug", 1000, 3).await;

    let result = sv.adjust_stock(mug.id, i32::MAX).await;
    assert!(matches!(result, Err(Error::InvalidArgs(_))));
    assert_eq!(sv.get(mug.id).await.unwrap().stock, 3);
  }

  #[tokio::test]
  async fn test_low_stock() {
    let db = test_db::setup().await;
    fixtures::product(&db, "Rare", 1000, 2).await;
    fixtures::product(&db, "Common", 1000, 50).await;

    let low = Product::new(&db).low_stock(5).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].name, "Rare");
  }
}
