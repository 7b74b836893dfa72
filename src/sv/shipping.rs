use serde::{Deserialize, Serialize};

use crate::{
  config::ShippingPolicy,
  entity::{FeeStatus, ShippingMethod, shipping_fee},
  prelude::*,
  sv::distance::DistanceProvider,
};

#[derive(Debug, Clone, Deserialize)]
pub struct BandInput {
  pub min_distance: f64,
  pub max_distance: f64,
  pub fee: i64,
  #[serde(default)]
  pub status: FeeStatus,
}

/// Fee for one destination. A failed distance lookup still produces a quote:
/// fee 0 with `error` set, and the caller decides what to show.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingQuote {
  pub method: ShippingMethod,
  pub distance_km: Option<f64>,
  pub band_id: Option<i32>,
  pub base_fee: i64,
  pub surcharge: i64,
  pub fee: i64,
  pub error: Option<String>,
}

impl ShippingQuote {
  fn failed(method: ShippingMethod, error: String) -> Self {
    Self {
      method,
      distance_km: None,
      band_id: None,
      base_fee: 0,
      surcharge: 0,
      fee: 0,
      error: Some(error),
    }
  }
}

pub fn meters_to_km(meters: u64) -> f64 {
  meters as f64 / 1000.0
}

/// First band (by `min_distance`) with `min <= d < max`.
pub fn match_band(
  bands: &[shipping_fee::Model],
  distance_km: f64,
) -> Option<&shipping_fee::Model> {
  bands.iter().find(|band| band.covers(distance_km))
}

fn validate(input: &BandInput) -> Result<()> {
  if !input.min_distance.is_finite() || !input.max_distance.is_finite() {
    return Err(Error::InvalidArgs("Distances must be finite".into()));
  }
  if input.min_distance < 0.0 {
    return Err(Error::InvalidArgs("Min distance cannot be negative".into()));
  }
  if input.max_distance <= input.min_distance {
    return Err(Error::InvalidArgs(
      "Max distance must be greater than min distance".into(),
    ));
  }
  if input.fee < 0 {
    return Err(Error::InvalidArgs("Fee cannot be negative".into()));
  }
  Ok(())
}

pub struct Shipping<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Shipping<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, input: BandInput) -> Result<shipping_fee::Model> {
    validate(&input)?;

    let band = shipping_fee::ActiveModel {
      id: NotSet,
      min_distance: Set(input.min_distance),
      max_distance: Set(input.max_distance),
      fee: Set(input.fee),
      status: Set(input.status),
    };
    Ok(band.insert(self.db).await?)
  }

  pub async fn update(
    &self,
    id: i32,
    input: BandInput,
  ) -> Result<shipping_fee::Model> {
    validate(&input)?;

    let band = shipping_fee::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::ShippingFeeNotFound)?;

    Ok(
      shipping_fee::ActiveModel {
        min_distance: Set(input.min_distance),
        max_distance: Set(input.max_distance),
        fee: Set(input.fee),
        status: Set(input.status),
        ..band.into()
      }
      .update(self.db)
      .await?,
    )
  }

  pub async fn delete(&self, id: i32) -> Result<()> {
    let result = shipping_fee::Entity::delete_by_id(id).exec(self.db).await?;
    if result.rows_affected == 0 {
      return Err(Error::ShippingFeeNotFound);
    }
    Ok(())
  }

  pub async fn list(&self) -> Result<Vec<shipping_fee::Model>> {
    Ok(
      shipping_fee::Entity::find()
        .order_by_asc(shipping_fee::Column::MinDistance)
        .order_by_asc(shipping_fee::Column::Id)
        .all(self.db)
        .await?,
    )
  }

  pub async fn active_bands(&self) -> Result<Vec<shipping_fee::Model>> {
    Ok(
      shipping_fee::Entity::find()
        .filter(shipping_fee::Column::Status.eq(FeeStatus::Active))
        .order_by_asc(shipping_fee::Column::MinDistance)
        .order_by_asc(shipping_fee::Column::Id)
        .all(self.db)
        .await?,
    )
  }

  pub async fn find_band(
    &self,
    distance_km: f64,
  ) -> Result<Option<shipping_fee::Model>> {
    let bands = self.active_bands().await?;
    Ok(match_band(&bands, distance_km).cloned())
  }

  pub async fn quote(
    &self,
    distance: &dyn DistanceProvider,
    policy: &ShippingPolicy,
    destination: &str,
    method: ShippingMethod,
  ) -> Result<ShippingQuote> {
    if destination.trim().is_empty() {
      return Err(Error::InvalidArgs("Destination address is required".into()));
    }

    let lookup = distance.distance_meters(&policy.origin, destination).await;
    let meters = match lookup {
      Ok(meters) => meters,
      Err(err) => {
        warn!("shipping quote for {destination:?} without distance: {err}");
        return Ok(ShippingQuote::failed(method, err.to_string()));
      }
    };

    let distance_km = meters_to_km(meters);
    let band = self.find_band(distance_km).await?;
    let base_fee = band.as_ref().map_or(0, |band| band.fee);
    let surcharge = match method {
      ShippingMethod::Express => policy.express_surcharge,
      ShippingMethod::Standard => 0,
    };

    Ok(ShippingQuote {
      method,
      distance_km: Some(distance_km),
      band_id: band.map(|band| band.id),
      base_fee,
      surcharge,
      fee: base_fee.saturating_add(surcharge),
      error: None,
    })
  }
}
