use crate::{
  config::Config,
  prelude::*,
  realtime::{EndedCall, Hub, ServerEvent},
  sv::{
    self,
    attachment::Storage,
    chat::MessageView,
    distance::{DistanceMatrix, DistanceProvider},
  },
};

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  pub distance: Arc<dyn DistanceProvider>,
  pub storage: Storage,
  pub hub: Hub,
}

/// Services borrowed from the shared state for one request.
pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub product: sv::Product<'a>,
  pub cart: sv::Cart<'a>,
  pub address: sv::Address<'a>,
  pub shipping: sv::Shipping<'a>,
  pub discount: sv::Discount<'a>,
  pub usage: sv::DiscountUsage<'a>,
  pub checkout: sv::Checkout<'a>,
  pub order: sv::Order<'a>,
  pub chat: sv::Chat<'a>,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    let db = Database::connect(&config.database_url)
      .await
      .context("Failed to connect to database")?;

    migration::Migrator::up(&db, None)
      .await
      .context("Failed to run migrations")?;

    let distance = DistanceMatrix::new(
      config.distance_api_url.clone(),
      config.distance_api_key.clone(),
      config.distance_timeout,
    )?;
    if config.distance_api_key.is_none() {
      warn!("DISTANCE_API_KEY is not set, shipping quotes will carry fee 0");
    }

    tokio::fs::create_dir_all(&config.upload_dir)
      .await
      .with_context(|| format!("Cannot create {:?}", config.upload_dir))?;

    Ok(Self::from_parts(db, config, Arc::new(distance)))
  }

  pub fn from_parts(
    db: DatabaseConnection,
    config: Config,
    distance: Arc<dyn DistanceProvider>,
  ) -> Self {
    Self {
      storage: Storage::new(config.upload_dir.clone()),
      hub: Hub::new(config.typing_ttl, config.call_ring_timeout),
      db,
      config,
      distance,
    }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db),
      product: sv::Product::new(&self.db),
      cart: sv::Cart::new(&self.db),
      address: sv::Address::new(&self.db),
      shipping: sv::Shipping::new(&self.db),
      discount: sv::Discount::new(&self.db),
      usage: sv::DiscountUsage::new(&self.db),
      checkout: sv::Checkout::new(
        &self.db,
        self.distance.as_ref(),
        &self.config.shipping,
      ),
      order: sv::Order::new(&self.db),
      chat: sv::Chat::new(&self.db),
    }
  }

  /// Writes a `call` line for each finished call and pushes it to the room.
  pub async fn log_calls(&self, ended: Vec<EndedCall>) {
    let chat = sv::Chat::new(&self.db);

    for call in ended {
      let logged =
        chat.log_call(call.conversation_id, call.caller, call.outcome).await;
      match logged {
        Ok(message) => {
          let members =
            chat.participants(call.conversation_id).await.unwrap_or_default();
          let view = MessageView { message, attachments: Vec::new() };
          self.hub.send_many(&members, ServerEvent::NewMessage(view));
        }
        Err(err) => error!("failed to log call {}: {err}", call.call_id),
      }
    }
  }
}
