use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;

use crate::{
  entity::{ShippingMethod, shipping_fee},
  plugins::server::{Created, Reply, created, ok},
  prelude::*,
  state::AppState,
  sv::shipping::{BandInput, ShippingQuote},
};

pub async fn list(
  State(app): State<Arc<AppState>>,
) -> Reply<Vec<shipping_fee::Model>> {
  ok(app.sv().shipping.list().await?)
}

pub async fn create(
  State(app): State<Arc<AppState>>,
  Json(input): Json<BandInput>,
) -> Created<shipping_fee::Model> {
  created(app.sv().shipping.create(input).await?)
}

pub async fn update(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
  Json(input): Json<BandInput>,
) -> Reply<shipping_fee::Model> {
  ok(app.sv().shipping.update(id, input).await?)
}

pub async fn delete(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
) -> Reply<()> {
  ok(app.sv().shipping.delete(id).await?)
}

/// Either a raw destination or a user whose saved address is used.
#[derive(Deserialize)]
pub struct QuoteReq {
  address: Option<String>,
  user_id: Option<i32>,
  #[serde(default)]
  method: ShippingMethod,
}

pub async fn quote(
  State(app): State<Arc<AppState>>,
  Json(req): Json<QuoteReq>,
) -> Reply<ShippingQuote> {
  let sv = app.sv();

  let destination = match (req.address, req.user_id) {
    (Some(address), _) if !address.trim().is_empty() => address,
    (_, Some(user_id)) => sv.address.get(user_id).await?.destination(),
    _ => {
      return Err(Error::InvalidArgs(
        "Either address or user_id is required".into(),
      ));
    }
  };

  let quote = sv
    .shipping
    .quote(
      app.distance.as_ref(),
      &app.config.shipping,
      &destination,
      req.method,
    )
    .await?;
  ok(quote)
}
