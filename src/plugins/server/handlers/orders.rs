use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{
  entity::{OrderStatus, order},
  plugins::server::{Created, Reply, created, ok},
  prelude::*,
  state::AppState,
  sv::{
    checkout::{CheckoutReq, OrderSummary, PlacedOrder},
    order::OrderDetail,
  },
  utils::{Page, PageReq},
};

pub async fn summary(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i32>,
  Json(req): Json<CheckoutReq>,
) -> Reply<OrderSummary> {
  ok(app.sv().checkout.summary(user_id, &req).await?)
}

pub async fn place(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i32>,
  Json(req): Json<CheckoutReq>,
) -> Created<PlacedOrder> {
  created(app.sv().checkout.place(user_id, &req).await?)
}

pub async fn list(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i32>,
  Query(page): Query<PageReq>,
) -> Reply<Page<order::Model>> {
  ok(app.sv().order.by_user(user_id, page).await?)
}

pub async fn get(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
) -> Reply<OrderDetail> {
  ok(app.sv().order.get(id).await?)
}

#[derive(Deserialize)]
pub struct StatusReq {
  status: OrderStatus,
}

pub async fn set_status(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
  Json(req): Json<StatusReq>,
) -> Reply<order::Model> {
  ok(app.sv().order.set_status(id, req.status).await?)
}
