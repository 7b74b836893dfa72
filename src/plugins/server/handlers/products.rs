use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{
  entity::product,
  plugins::server::{Created, Reply, created, ok},
  prelude::*,
  state::AppState,
  sv::product::{ProductFilter, ProductInput, ProductPatch},
  utils::{Page, PageReq},
};

pub async fn list(
  State(app): State<Arc<AppState>>,
  Query(filter): Query<ProductFilter>,
  Query(page): Query<PageReq>,
) -> Reply<Page<product::Model>> {
  ok(app.sv().product.list(filter, page).await?)
}

pub async fn create(
  State(app): State<Arc<AppState>>,
  Json(input): Json<ProductInput>,
) -> Created<product::Model> {
  created(app.sv().product.create(input).await?)
}

pub async fn get(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
) -> Reply<product::Model> {
  ok(app.sv().product.get(id).await?)
}

pub async fn update(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
  Json(patch): Json<ProductPatch>,
) -> Reply<product::Model> {
  ok(app.sv().product.update(id, patch).await?)
}

pub async fn deactivate(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
) -> Reply<product::Model> {
  ok(app.sv().product.deactivate(id).await?)
}

#[derive(Deserialize)]
pub struct StockDelta {
  delta: i32,
}

pub async fn adjust_stock(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
  Json(req): Json<StockDelta>,
) -> Reply<product::Model> {
  ok(app.sv().product.adjust_stock(id, req.delta).await?)
}

#[derive(Deserialize)]
pub struct Threshold {
  threshold: Option<i32>,
}

pub async fn low_stock(
  State(app): State<Arc<AppState>>,
  Query(req): Query<Threshold>,
) -> Reply<Vec<product::Model>> {
  let threshold = req.threshold.unwrap_or(app.config.low_stock_threshold);
  ok(app.sv().product.low_stock(threshold).await?)
}
