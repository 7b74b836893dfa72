use serde::Deserialize;

use crate::{entity::address, prelude::*, sv, utils};

#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
  pub country: String,
  pub city_id: i32,
  pub district_id: i32,
  pub ward_id: i32,
  pub address: String,
  pub exact_address: Option<String>,
  pub longitude: Option<f64>,
  pub latitude: Option<f64>,
}

pub struct Address<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Address<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn by_user(&self, user_id: i32) -> Result<Option<address::Model>> {
    Ok(
      address::Entity::find()
        .filter(address::Column::UserId.eq(user_id))
        .one(self.db)
        .await?,
    )
  }

  pub async fn get(&self, user_id: i32) -> Result<address::Model> {
    self.by_user(user_id).await?.ok_or(Error::AddressNotFound)
  }

  /// One address per user; a second save overwrites the first.
  pub async fn upsert(
    &self,
    user_id: i32,
    input: AddressInput,
  ) -> Result<address::Model> {
    if input.address.trim().is_empty() {
      return Err(Error::InvalidArgs("Address is required".into()));
    }
    if let Some(lat) = input.latitude
      && !(-90.0..=90.0).contains(&lat)
    {
      return Err(Error::InvalidArgs("Latitude out of range".into()));
    }
    if let Some(lng) = input.longitude
      && !(-180.0..=180.0).contains(&lng)
    {
      return Err(Error::InvalidArgs("Longitude out of range".into()));
    }

    sv::User::new(self.db).get(user_id).await?;

    let existing = self.by_user(user_id).await?;
    let model = address::ActiveModel {
      id: existing.as_ref().map_or(NotSet, |row| Set(row.id)),
      user_id: Set(user_id),
      country: Set(input.country),
      city_id: Set(input.city_id),
      district_id: Set(input.district_id),
      ward_id: Set(input.ward_id),
      address: Set(input.address.trim().to_string()),
      exact_address: Set(input.exact_address),
      longitude: Set(input.longitude),
      latitude: Set(input.latitude),
      updated_at: Set(utils::now()),
    };

    let saved = match existing {
      Some(_) => model.update(self.db).await?,
      None => model.insert(self.db).await?,
    };
    Ok(saved)
  }
}
