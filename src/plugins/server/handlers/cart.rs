use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;

use crate::{
  entity::{address, cart_item},
  plugins::server::{Created, Reply, created, ok},
  prelude::*,
  state::AppState,
  sv::{address::AddressInput, cart::CartLine},
};

#[derive(Deserialize)]
pub struct AddItem {
  product_id: i32,
  #[serde(default = "one")]
  quantity: i32,
}

fn one() -> i32 {
  1
}

#[derive(Deserialize)]
pub struct Quantity {
  quantity: i32,
}

pub async fn items(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i32>,
) -> Reply<Vec<CartLine>> {
  ok(app.sv().cart.items(user_id).await?)
}

pub async fn add(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i32>,
  Json(req): Json<AddItem>,
) -> Created<cart_item::Model> {
  created(app.sv().cart.add(user_id, req.product_id, req.quantity).await?)
}

pub async fn set_quantity(
  State(app): State<Arc<AppState>>,
  Path((user_id, product_id)): Path<(i32, i32)>,
  Json(req): Json<Quantity>,
) -> Reply<cart_item::Model> {
  ok(app.sv().cart.set_quantity(user_id, product_id, req.quantity).await?)
}

pub async fn remove(
  State(app): State<Arc<AppState>>,
  Path((user_id, product_id)): Path<(i32, i32)>,
) -> Reply<()> {
  ok(app.sv().cart.remove(user_id, product_id).await?)
}

pub async fn address(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i32>,
) -> Reply<address::Model> {
  ok(app.sv().address.get(user_id).await?)
}

pub async fn save_address(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i32>,
  Json(input): Json<AddressInput>,
) -> Reply<address::Model> {
  ok(app.sv().address.upsert(user_id, input).await?)
}
