use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use crate::prelude::*;

pub const GOMAPS_DISTANCE_URL: &str =
  "https://maps.gomaps.pro/maps/api/distancematrix/json";

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  pub upload_dir: PathBuf,
  pub distance_api_url: String,
  pub distance_api_key: Option<String>,
  pub distance_timeout: Duration,
  pub shipping: ShippingPolicy,
  pub typing_ttl: Duration,
  pub call_ring_timeout: Duration,
  pub low_stock_threshold: i32,
}

/// Where parcels leave from and what express delivery costs on top.
#[derive(Debug, Clone)]
pub struct ShippingPolicy {
  pub origin: String,
  pub express_surcharge: i64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: "sqlite:storefront.db?mode=rwc".into(),
      port: 3000,
      upload_dir: PathBuf::from("uploads"),
      distance_api_url: GOMAPS_DISTANCE_URL.into(),
      distance_api_key: None,
      distance_timeout: Duration::from_secs(10),
      shipping: ShippingPolicy {
        origin: "Ho Chi Minh City, Vietnam".into(),
        express_surcharge: 15_000,
      },
      typing_ttl: Duration::from_secs(6),
      call_ring_timeout: Duration::from_secs(45),
      low_stock_threshold: 5,
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let default = Self::default();

    Ok(Self {
      database_url: env::var("DATABASE_URL")
        .unwrap_or(default.database_url),
      port: parse_or("PORT", default.port)?,
      upload_dir: env::var("UPLOAD_DIR")
        .map(PathBuf::from)
        .unwrap_or(default.upload_dir),
      distance_api_url: env::var("DISTANCE_API_URL")
        .unwrap_or(default.distance_api_url),
      distance_api_key: env::var("DISTANCE_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty()),
      distance_timeout: duration_or(
        "DISTANCE_TIMEOUT",
        default.distance_timeout,
      )?,
      shipping: ShippingPolicy {
        origin: env::var("SHOP_ORIGIN").unwrap_or(default.shipping.origin),
        express_surcharge: parse_or(
          "EXPRESS_SURCHARGE",
          default.shipping.express_surcharge,
        )?,
      },
      typing_ttl: duration_or("TYPING_TTL", default.typing_ttl)?,
      call_ring_timeout: duration_or(
        "CALL_RING_TIMEOUT",
        default.call_ring_timeout,
      )?,
      low_stock_threshold: parse_or(
        "LOW_STOCK_THRESHOLD",
        default.low_stock_threshold,
      )?,
    })
  }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
  T: FromStr + Display,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  match env::var(key) {
    Ok(raw) => raw
      .trim()
      .parse()
      .with_context(|| format!("Invalid {key} value: `{raw}`")),
    Err(_) => {
      debug!("{key} not set, using default: {default}");
      Ok(default)
    }
  }
}

fn duration_or(key: &str, default: Duration) -> anyhow::Result<Duration> {
  match env::var(key) {
    Ok(raw) => humantime::parse_duration(raw.trim())
      .with_context(|| format!("Invalid {key} duration: `{raw}`")),
    Err(_) => Ok(default),
  }
}
