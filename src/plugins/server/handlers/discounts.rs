use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{
  entity::{discount, discount_usage},
  plugins::server::{Created, Reply, created, ok},
  prelude::*,
  state::AppState,
  sv::{discount::DiscountInput, discount_usage::UsageFilter},
  utils::{Page, PageReq},
};

pub async fn list(
  State(app): State<Arc<AppState>>,
) -> Reply<Vec<discount::Model>> {
  ok(app.sv().discount.all().await?)
}

pub async fn create(
  State(app): State<Arc<AppState>>,
  Json(input): Json<DiscountInput>,
) -> Created<discount::Model> {
  created(app.sv().discount.create(input).await?)
}

pub async fn get(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
) -> Reply<discount::Model> {
  ok(app.sv().discount.get(id).await?)
}

pub async fn update(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
  Json(input): Json<DiscountInput>,
) -> Reply<discount::Model> {
  ok(app.sv().discount.update(id, input).await?)
}

pub async fn delete(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
) -> Reply<()> {
  ok(app.sv().discount.delete(id).await?)
}

pub async fn usages(
  State(app): State<Arc<AppState>>,
  Query(filter): Query<UsageFilter>,
  Query(page): Query<PageReq>,
) -> Reply<Page<discount_usage::Model>> {
  ok(app.sv().usage.list(filter, page).await?)
}

#[derive(Deserialize)]
pub struct NewUsage {
  discount_id: i32,
  user_id: i32,
  order_id: i32,
}

pub async fn record_usage(
  State(app): State<Arc<AppState>>,
  Json(req): Json<NewUsage>,
) -> Created<discount_usage::Model> {
  let usage = app
    .sv()
    .usage
    .create(req.discount_id, req.user_id, req.order_id)
    .await?;
  created(usage)
}

pub async fn delete_usage(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
) -> Reply<()> {
  ok(app.sv().usage.delete(id).await?)
}
