use axum::{
  Json,
  extract::{Multipart, Path, Query, State, multipart::Field},
};
use serde::Deserialize;

use crate::{
  entity::{conversation, message},
  plugins::server::{Created, Reply, created, ok},
  prelude::*,
  realtime::ServerEvent,
  state::AppState,
  sv::{
    attachment::{Group, Staging, Upload},
    chat::{ConversationView, MessageView},
  },
};

pub async fn conversations(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i32>,
) -> Reply<Vec<ConversationView>> {
  app.sv().user.get(user_id).await?;
  ok(app.sv().chat.list(user_id).await?)
}

#[derive(Deserialize)]
pub struct NewGroup {
  title: Option<String>,
  member_ids: Vec<i32>,
}

pub async fn create_group(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i32>,
  Json(req): Json<NewGroup>,
) -> Created<conversation::Model> {
  let chat = app.sv().chat;
  created(chat.create_group(user_id, req.title, &req.member_ids).await?)
}

#[derive(Deserialize)]
pub struct DirectReq {
  user_id: i32,
  peer_id: i32,
}

pub async fn direct(
  State(app): State<Arc<AppState>>,
  Json(req): Json<DirectReq>,
) -> Reply<conversation::Model> {
  ok(app.sv().chat.direct(req.user_id, req.peer_id).await?)
}

#[derive(Deserialize)]
pub struct HistoryQuery {
  user_id: i32,
  before: Option<i32>,
  #[serde(default = "page_size")]
  limit: u64,
}

fn page_size() -> u64 {
  50
}

pub async fn history(
  State(app): State<Arc<AppState>>,
  Path(conversation_id): Path<i32>,
  Query(q): Query<HistoryQuery>,
) -> Reply<Vec<MessageView>> {
  let chat = app.sv().chat;
  ok(chat.history(conversation_id, q.user_id, q.before, q.limit).await?)
}

async fn text(field: Field<'_>) -> Result<String> {
  field
    .text()
    .await
    .map_err(|err| Error::InvalidArgs(format!("Malformed form field: {err}")))
}

/// Multipart form: `sender_id`, optional `content`, any number of `files`,
/// and for a voice note `duration` plus `waveform` (JSON array of peaks).
pub async fn send(
  State(app): State<Arc<AppState>>,
  Path(conversation_id): Path<i32>,
  mut form: Multipart,
) -> Created<MessageView> {
  let mut sender_id = None;
  let mut content = None;
  let mut duration = None;
  let mut peaks: Option<Vec<f32>> = None;
  let mut staging = Staging::new();

  while let Some(field) = form
    .next_field()
    .await
    .map_err(|err| Error::InvalidArgs(format!("Malformed upload: {err}")))?
  {
    let name = field.name().unwrap_or_default().to_string();
    match name.as_str() {
      "sender_id" => {
        let raw = text(field).await?;
        let id = raw
          .trim()
          .parse()
          .map_err(|_| Error::InvalidArgs("Invalid sender_id".into()))?;
        sender_id = Some(id);
      }
      "content" => content = Some(text(field).await?),
      "duration" => {
        let raw = text(field).await?;
        duration = raw.trim().parse::<f64>().ok();
      }
      "waveform" => {
        let raw = text(field).await?;
        let parsed = json::from_str(&raw)
          .map_err(|_| Error::InvalidArgs("Invalid waveform".into()))?;
        peaks = Some(parsed);
      }
      "files" | "files[]" | "file" => {
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mime = field
          .content_type()
          .unwrap_or("application/octet-stream")
          .to_string();
        let bytes = field.bytes().await.map_err(|err| {
          Error::InvalidArgs(format!("Failed to read {file_name}: {err}"))
        })?;
        staging.push(Upload::new(file_name, mime, bytes.to_vec())?)?;
      }
      other => trace!("ignoring form field {other:?}"),
    }
  }

  let sender_id = sender_id
    .ok_or_else(|| Error::InvalidArgs("sender_id is required".into()))?;

  let staging = match (duration, peaks) {
    (Some(duration), peaks) if staging.group() == Some(Group::Audio) => {
      let peaks = peaks.unwrap_or_default();
      let mut voiced = Staging::new();
      for file in staging.into_files() {
        voiced.push(file.with_audio_meta(duration, &peaks))?;
      }
      voiced
    }
    _ => staging,
  };

  let sv = app.sv();
  let view = sv
    .chat
    .send(conversation_id, sender_id, content, staging, &app.storage)
    .await?;

  let members = sv.chat.participants(conversation_id).await?;
  app.hub.send_many(&members, ServerEvent::NewMessage(view.clone()));

  created(view)
}

#[derive(Deserialize)]
pub struct ReaderReq {
  user_id: i32,
}

pub async fn mark_read(
  State(app): State<Arc<AppState>>,
  Path(conversation_id): Path<i32>,
  Json(req): Json<ReaderReq>,
) -> Reply<Vec<i32>> {
  let chat = app.sv().chat;
  let message_ids = chat.mark_read(conversation_id, req.user_id).await?;

  if !message_ids.is_empty() {
    let members = chat.participants(conversation_id).await?;
    app.hub.send_many(
      &members,
      ServerEvent::MessageRead {
        conversation_id,
        user_id: req.user_id,
        message_ids: message_ids.clone(),
      },
    );
  }
  ok(message_ids)
}

pub async fn delete(
  State(app): State<Arc<AppState>>,
  Path(message_id): Path<i32>,
  Query(req): Query<ReaderReq>,
) -> Reply<message::Model> {
  let chat = app.sv().chat;
  let deleted = chat.delete(message_id, req.user_id).await?;

  let members = chat.participants(deleted.conversation_id).await?;
  app.hub.send_many(
    &members,
    ServerEvent::MessageDeleted {
      conversation_id: deleted.conversation_id,
      message_id,
    },
  );
  ok(deleted)
}
