//! Driving distance lookups against a Google-compatible distance matrix
//! endpoint (Google Maps, GoMaps). One request per lookup: no retry, no cache.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::prelude::*;

#[async_trait]
pub trait DistanceProvider: Send + Sync {
  /// Driving distance in meters between two addresses or `lat,lng` pairs.
  async fn distance_meters(
    &self,
    origin: &str,
    destination: &str,
  ) -> Result<u64>;
}

#[derive(Debug, Deserialize)]
pub struct MatrixResponse {
  pub status: String,
  #[serde(default)]
  pub error_message: Option<String>,
  #[serde(default)]
  pub rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
pub struct MatrixRow {
  #[serde(default)]
  pub elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
pub struct MatrixElement {
  pub status: String,
  pub distance: Option<TextValue>,
  pub duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
pub struct TextValue {
  pub text: String,
  pub value: u64,
}

impl MatrixResponse {
  /// Distance of the first origin/destination pair.
  pub fn first_distance(&self) -> Result<u64> {
    if self.status != "OK" {
      let detail = self.error_message.as_deref().unwrap_or_default();
      return Err(Error::Distance(format!("{} {detail}", self.status)));
    }

    let element = self
      .rows
      .first()
      .and_then(|row| row.elements.first())
      .ok_or_else(|| Error::Distance("empty matrix".into()))?;

    if element.status != "OK" {
      return Err(Error::Distance(element.status.clone()));
    }

    element
      .distance
      .as_ref()
      .map(|distance| distance.value)
      .ok_or_else(|| Error::Distance("no distance in response".into()))
  }
}

#[derive(Clone)]
pub struct DistanceMatrix {
  client: Client,
  base_url: String,
  api_key: Option<String>,
}

impl DistanceMatrix {
  pub fn new(
    base_url: impl Into<String>,
    api_key: Option<String>,
    timeout: Duration,
  ) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::Distance(format!("Client setup failed: {}", e)))?;

    Ok(Self { client, base_url: base_url.into(), api_key })
  }
}

#[async_trait]
impl DistanceProvider for DistanceMatrix {
  async fn distance_meters(
    &self,
    origin: &str,
    destination: &str,
  ) -> Result<u64> {
    let key = self
      .api_key
      .as_deref()
      .ok_or_else(|| Error::Distance("API key is not configured".into()))?;

    let response = self
      .client
      .get(&self.base_url)
      .query(&[
        ("origins", origin),
        ("destinations", destination),
        ("mode", "driving"),
        ("key", key),
      ])
      .send()
      .await
      .map_err(|e| Error::Distance(format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
      return Err(Error::Distance(format!("HTTP {}", response.status())));
    }

    let matrix: MatrixResponse = response.json().await.map_err(|e| {
      Error::Distance(format!("Failed to parse response: {}", e))
    })?;

    let meters = matrix.first_distance()?;
    debug!("distance {origin:?} -> {destination:?}: {meters}m");
    Ok(meters)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_ok_response() {
    let body = r#"{
      "destination_addresses": ["District 7, Ho Chi Minh City"],
      "origin_addresses": ["District 1, Ho Chi Minh City"],
      "rows": [{"elements": [{
        "distance": {"text": "7.4 km", "value": 7412},
        "duration": {"text": "21 mins", "value": 1260},
        "status": "OK"
      }]}],
      "status": "OK"
    }"#;

    let matrix: MatrixResponse = json::from_str(body).unwrap();
    assert_eq!(matrix.first_distance().unwrap(), 7412);
  }

  #[test]
  fn top_level_failure_is_an_error() {
    let body = r#"{"rows": [], "status": "REQUEST_DENIED",
      "error_message": "The provided API key is invalid."}"#;

    let matrix: MatrixResponse = json::from_str(body).unwrap();
    assert!(matches!(matrix.first_distance(), Err(Error::Distance(_))));
  }

  #[test]
  fn unreachable_destination_is_an_error() {
    let body = r#"{"rows": [{"elements": [{"status": "ZERO_RESULTS"}]}],
      "status": "OK"}"#;

    let matrix: MatrixResponse = json::from_str(body).unwrap();
    match matrix.first_distance() {
      Err(Error::Distance(status)) => assert_eq!(status, "ZERO_RESULTS"),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test]
  async fn missing_key_fails_without_request() {
    let matrix =
      DistanceMatrix::new("http://127.0.0.1:9", None, Duration::from_secs(1))
        .unwrap();

    let result = matrix.distance_meters("a", "b").await;
    assert!(matches!(result, Err(Error::Distance(_))));
  }
}
