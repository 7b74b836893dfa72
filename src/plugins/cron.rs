use std::time::Instant;

use async_trait::async_trait;
use tokio::time;

use crate::{plugins::Plugin, prelude::*, state::AppState};

/// Sweeps stale realtime state: typing flags past their TTL and calls that
/// rang out without an answer.
pub struct Gc {
  pub every: Duration,
}

impl Default for Gc {
  fn default() -> Self {
    Self { every: Duration::from_secs(1) }
  }
}

#[async_trait]
impl Plugin for Gc {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let every = self.every;

    tokio::spawn(async move {
      let mut interval = time::interval(every);
      loop {
        interval.tick().await;
        sweep(&app).await;
      }
    });

    Ok(())
  }
}

pub async fn sweep(app: &AppState) {
  let now = Instant::now();

  let typing = app.hub.expire_typing(now);
  if typing > 0 {
    trace!("expired {typing} typing indicators");
  }

  let missed = app.hub.expire_calls(now);
  if !missed.is_empty() {
    info!("{} unanswered calls timed out", missed.len());
    app.log_calls(missed).await;
  }
}

#[cfg(test)]
mod tests {
  use tokio_test::assert_ok;

  use super::*;
  use crate::{
    config::Config,
    entity::MessageType,
    sv::{
      self,
      test_utils::{fixtures, fixtures::FixedDistance, test_db},
    },
  };

  #[tokio::test]
  async fn test_sweep_logs_missed_calls() {
    let db = test_db::setup().await;
    let an = fixtures::user(&db, "an").await;
    let binh = fixtures::user(&db, "binh").await;
    let room = assert_ok!(sv::Chat::new(&db).direct(an.id, binh.id).await);

    let config = Config {
      call_ring_timeout: Duration::ZERO,
      typing_ttl: Duration::ZERO,
      ..Config::default()
    };
    let app =
      AppState::from_parts(db, config, Arc::new(FixedDistance(Some(0))));

    let (_, _a) = app.hub.connect(an.id);
    let (_, _b) = app.hub.connect(binh.id);
    app.hub.offer(room.id, an.id, binh.id, json::Value::Null, false);
    app.hub.typing(room.id, binh.id, true, &[an.id, binh.id]);

    sweep(&app).await;

    assert!(!app.hub.is_typing(room.id, binh.id));
    let history =
      assert_ok!(app.sv().chat.history(room.id, an.id, None, 10).await);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].message.message_type, MessageType::Call);
    assert_eq!(history[0].message.content.as_deref(), Some("Missed call"));
  }
}
