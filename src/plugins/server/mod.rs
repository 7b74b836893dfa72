mod handlers;

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  http::StatusCode,
  routing::{delete, get, post, put},
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  services::ServeDir,
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

/// Five videos at the cap plus the form fields around them.
const BODY_LIMIT: usize = 80 * 1024 * 1024;

/// Response body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl<T> Envelope<T> {
  pub fn ok(data: T) -> Self {
    Self { success: true, data: Some(data), message: None }
  }

  pub fn failure(message: impl Into<String>) -> Self {
    Self { success: false, data: None, message: Some(message.into()) }
  }
}

pub type Reply<T> = Result<Json<Envelope<T>>>;
pub type Created<T> = Result<(StatusCode, Json<Envelope<T>>)>;

pub fn ok<T>(data: T) -> Reply<T> {
  Ok(Json(Envelope::ok(data)))
}

pub fn created<T>(data: T) -> Created<T> {
  Ok((StatusCode::CREATED, Json(Envelope::ok(data))))
}

pub fn router(app: Arc<AppState>) -> Router {
  use handlers::*;

  let uploads = ServeDir::new(&app.config.upload_dir);

  Router::new()
    .route("/health", get(health))
    .route("/api/users", post(users::create))
    .route("/api/users/online", get(users::online))
    .route("/api/users/{id}", get(users::get))
    .route("/api/products", get(products::list).post(products::create))
    .route("/api/products/low-stock", get(products::low_stock))
    .route(
      "/api/products/{id}",
      get(products::get).put(products::update).delete(products::deactivate),
    )
    .route("/api/products/{id}/stock", post(products::adjust_stock))
    .route("/api/users/{id}/cart", get(cart::items).post(cart::add))
    .route(
      "/api/users/{id}/cart/{product_id}",
      put(cart::set_quantity).delete(cart::remove),
    )
    .route(
      "/api/users/{id}/address",
      get(cart::address).put(cart::save_address),
    )
    .route("/api/shipping-fees", get(shipping::list).post(shipping::create))
    .route(
      "/api/shipping-fees/{id}",
      put(shipping::update).delete(shipping::delete),
    )
    .route("/api/shipping/quote", post(shipping::quote))
    .route("/api/discounts", get(discounts::list).post(discounts::create))
    .route(
      "/api/discounts/{id}",
      get(discounts::get).put(discounts::update).delete(discounts::delete),
    )
    .route(
      "/api/discount-usages",
      get(discounts::usages).post(discounts::record_usage),
    )
    .route("/api/discount-usages/{id}", delete(discounts::delete_usage))
    .route("/api/users/{id}/checkout/summary", post(orders::summary))
    .route("/api/users/{id}/orders", get(orders::list).post(orders::place))
    .route("/api/orders/{id}", get(orders::get))
    .route("/api/orders/{id}/status", put(orders::set_status))
    .route(
      "/api/users/{id}/conversations",
      get(chat::conversations).post(chat::create_group),
    )
    .route("/api/conversations/direct", post(chat::direct))
    .route(
      "/api/conversations/{id}/messages",
      get(chat::history).post(chat::send),
    )
    .route("/api/conversations/{id}/read", post(chat::mark_read))
    .route("/api/messages/{id}", delete(chat::delete))
    .route("/ws", get(ws::upgrade))
    .nest_service("/uploads", uploads)
    .layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(
          CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        ),
    )
    .with_state(app)
}

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(100)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let governor_limiter = governor_conf.limiter().clone();

    tokio::spawn(async move {
      loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        governor_limiter.retain_recent();
      }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));
    let router = router(app)
      .layer(GovernorLayer::new(governor_conf))
      .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;

    info!("HTTP server listening on {addr}");

    tokio::spawn(async move {
      if let Err(err) = axum::serve(listener, router).await {
        error!("HTTP server stopped: {err}");
      }
    });

    Ok(())
  }
}
