use serde::{Deserialize, Serialize};

use crate::{
  entity::{DiscountType, discount},
  prelude::*,
  sv::discount_usage,
  utils,
};

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountInput {
  pub code: String,
  pub description: Option<String>,
  #[serde(default)]
  pub discount_type: DiscountType,
  pub value: i64,
  #[serde(default)]
  pub min_order_value: i64,
  pub max_discount: Option<i64>,
  pub usage_limit: Option<i32>,
  pub max_uses_per_user: Option<i32>,
  pub starts_at: Option<DateTime>,
  pub expires_at: Option<DateTime>,
  #[serde(default = "active")]
  pub is_active: bool,
}

fn active() -> bool {
  true
}

impl DiscountInput {
  #[cfg(test)]
  pub fn percent(code: &str, value: i64) -> Self {
    Self {
      code: code.into(),
      description: None,
      discount_type: DiscountType::Percentage,
      value,
      min_order_value: 0,
      max_discount: None,
      usage_limit: None,
      max_uses_per_user: None,
      starts_at: None,
      expires_at: None,
      is_active: true,
    }
  }

  fn validate(&self) -> Result<()> {
    if self.code.trim().is_empty() {
      return Err(Error::InvalidArgs("Discount code is required".into()));
    }
    if self.value <= 0 {
      return Err(Error::InvalidArgs("Discount value must be positive".into()));
    }
    if self.discount_type == DiscountType::Percentage && self.value > 100 {
      return Err(Error::InvalidArgs(
        "Percentage discount cannot exceed 100".into(),
      ));
    }
    if self.min_order_value < 0 || self.max_discount.is_some_and(|m| m < 0) {
      return Err(Error::InvalidArgs("Amounts cannot be negative".into()));
    }
    if let (Some(start), Some(end)) = (self.starts_at, self.expires_at)
      && end <= start
    {
      return Err(Error::InvalidArgs("Discount ends before it starts".into()));
    }
    Ok(())
  }
}

/// Discount resolved against a subtotal.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedDiscount {
  pub discount_id: i32,
  pub code: String,
  pub amount: i64,
}

/// Amount taken off `subtotal`, never more than the subtotal itself.
pub fn amount_off(discount: &discount::Model, subtotal: i64) -> i64 {
  let raw = match discount.discount_type {
    DiscountType::Percentage => {
      let off = i128::from(subtotal) * i128::from(discount.value) / 100;
      i64::try_from(off).unwrap_or(i64::MAX)
    }
    DiscountType::Fixed => discount.value,
  };
  let capped = discount.max_discount.map_or(raw, |max| raw.min(max));
  capped.clamp(0, subtotal.max(0))
}

pub struct Discount<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Discount<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, input: DiscountInput) -> Result<discount::Model> {
    input.validate()?;
    let code = input.code.trim().to_uppercase();

    if self.by_code(&code).await?.is_some() {
      return Err(Error::InvalidArgs(format!("Code {code} already exists")));
    }

    let discount = discount::ActiveModel {
      id: NotSet,
      code: Set(code),
      description: Set(input.description),
      discount_type: Set(input.discount_type),
      value: Set(input.value),
      min_order_value: Set(input.min_order_value),
      max_discount: Set(input.max_discount),
      usage_limit: Set(input.usage_limit),
      max_uses_per_user: Set(input.max_uses_per_user),
      starts_at: Set(input.starts_at),
      expires_at: Set(input.expires_at),
      is_active: Set(input.is_active),
      created_at: Set(utils::now()),
    };
    Ok(discount.insert(self.db).await?)
  }

  pub async fn update(
    &self,
    id: i32,
    input: DiscountInput,
  ) -> Result<discount::Model> {
    input.validate()?;
    let discount = self.get(id).await?;
    let code = input.code.trim().to_uppercase();

    if let Some(other) = self.by_code(&code).await?
      && other.id != id
    {
      return Err(Error::InvalidArgs(format!("Code {code} already exists")));
    }

    Ok(
      discount::ActiveModel {
        code: Set(code),
        description: Set(input.description),
        discount_type: Set(input.discount_type),
        value: Set(input.value),
        min_order_value: Set(input.min_order_value),
        max_discount: Set(input.max_discount),
        usage_limit: Set(input.usage_limit),
        max_uses_per_user: Set(input.max_uses_per_user),
        starts_at: Set(input.starts_at),
        expires_at: Set(input.expires_at),
        is_active: Set(input.is_active),
        ..discount.into()
      }
      .update(self.db)
      .await?,
    )
  }

  /// Refused while the ledger still references the discount; deactivate it
  /// instead, or remove the usages first.
  pub async fn delete(&self, id: i32) -> Result<()> {
    let used = discount_usage::count(self.db, id, None).await?;
    if used > 0 {
      return Err(Error::DiscountInUse(used));
    }

    let result = discount::Entity::delete_by_id(id).exec(self.db).await?;
    if result.rows_affected == 0 {
      return Err(Error::DiscountNotFound);
    }
    Ok(())
  }

  pub async fn get(&self, id: i32) -> Result<discount::Model> {
    discount::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::DiscountNotFound)
  }

  pub async fn by_code(&self, code: &str) -> Result<Option<discount::Model>> {
    Ok(
      discount::Entity::find()
        .filter(discount::Column::Code.eq(code.trim().to_uppercase()))
        .one(self.db)
        .await?,
    )
  }

  pub async fn all(&self) -> Result<Vec<discount::Model>> {
    Ok(
      discount::Entity::find()
        .order_by_desc(discount::Column::CreatedAt)
        .all(self.db)
        .await?,
    )
  }

  /// Checks every redemption rule for `user_id` and returns what the code is
  /// worth on `subtotal`.
  pub async fn evaluate(
    &self,
    code: &str,
    user_id: i32,
    subtotal: i64,
  ) -> Result<AppliedDiscount> {
    let discount =
      self.by_code(code).await?.ok_or(Error::DiscountNotFound)?;
    let now = utils::now();

    let reject = |reason: &str| -> Result<AppliedDiscount> {
      Err(Error::DiscountRejected(reason.into()))
    };

    if !discount.is_active {
      return reject("code is disabled");
    }
    if discount.starts_at.is_some_and(|start| now < start) {
      return reject("code is not active yet");
    }
    if discount.expires_at.is_some_and(|end| now >= end) {
      return reject("code has expired");
    }
    if subtotal < discount.min_order_value {
      return Err(Error::DiscountRejected(format!(
        "order must be at least {}",
        discount.min_order_value
      )));
    }

    if let Some(limit) = discount.usage_limit {
      let used = discount_usage::count(self.db, discount.id, None).await?;
      if used >= limit.max(0) as u64 {
        return reject("usage limit reached");
      }
    }
    if let Some(limit) = discount.max_uses_per_user {
      let used =
        discount_usage::count(self.db, discount.id, Some(user_id)).await?;
      if used >= limit.max(0) as u64 {
        return reject("you have already used this code");
      }
    }

    Ok(AppliedDiscount {
      discount_id: discount.id,
      amount: amount_off(&discount, subtotal),
      code: discount.code,
    })
  }
}
