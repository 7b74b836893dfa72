use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};

use crate::plugins::server::Envelope;

/// Why a staged attachment was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Attachment {
  #[error("unsupported file type: {0}")]
  UnsupportedType(String),
  #[error("{kind} exceeds the {limit_mb}MB limit")]
  TooLarge { kind: &'static str, limit_mb: u64 },
  #[error("at most {limit} {group} per message")]
  TooMany { group: &'static str, limit: usize },
  #[error("cannot mix {staged} with {incoming} in one message")]
  MixedCategories { staged: &'static str, incoming: &'static str },
  #[error("empty file")]
  Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("database error: {0}")]
  Db(#[from] DbErr),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("{0}")]
  InvalidArgs(String),

  #[error("user not found")]
  UserNotFound,
  #[error("product not found")]
  ProductNotFound,
  #[error("product {0} is not available")]
  ProductUnavailable(i32),
  #[error("not enough stock for product {product_id} ({available} left)")]
  OutOfStock { product_id: i32, available: i32 },
  #[error("cart item not found")]
  CartItemNotFound,
  #[error("nothing selected for checkout")]
  EmptyCheckout,
  #[error("address not found")]
  AddressNotFound,
  #[error("shipping fee not found")]
  ShippingFeeNotFound,
  #[error("distance lookup failed: {0}")]
  Distance(String),

  #[error("discount not found")]
  DiscountNotFound,
  #[error("discount cannot be applied: {0}")]
  DiscountRejected(String),
  #[error("discount already used for this order")]
  DiscountAlreadyUsed,
  #[error("discount has {0} recorded usages")]
  DiscountInUse(u64),
  #[error("discount usage not found")]
  DiscountUsageNotFound,
  #[error("order not found")]
  OrderNotFound,

  #[error("conversation not found")]
  ConversationNotFound,
  #[error("message not found")]
  MessageNotFound,
  #[error("user is not a participant of this conversation")]
  NotParticipant,
  #[error(transparent)]
  Attachment(#[from] Attachment),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn status(&self) -> StatusCode {
    match self {
      Error::UserNotFound
      | Error::ProductNotFound
      | Error::CartItemNotFound
      | Error::AddressNotFound
      | Error::ShippingFeeNotFound
      | Error::DiscountNotFound
      | Error::DiscountUsageNotFound
      | Error::OrderNotFound
      | Error::ConversationNotFound
      | Error::MessageNotFound => StatusCode::NOT_FOUND,
      Error::Db(_) | Error::Io(_) | Error::Distance(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
      _ => StatusCode::BAD_REQUEST,
    }
  }

  pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
      tracing::error!("request failed: {self}");
      "Internal server error".to_string()
    } else {
      self.to_string()
    };

    (status, Json(Envelope::<()>::failure(message))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn not_found_maps_to_404() {
    assert_eq!(Error::ProductNotFound.status(), StatusCode::NOT_FOUND);
    assert_eq!(Error::DiscountUsageNotFound.status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn business_rules_map_to_400() {
    assert_eq!(Error::DiscountAlreadyUsed.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
      Error::Attachment(Attachment::Empty).status(),
      StatusCode::BAD_REQUEST
    );
  }

  #[test]
  fn infrastructure_maps_to_500() {
    let err = Error::Db(DbErr::Custom("boom".into()));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
