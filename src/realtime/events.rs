use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sv::chat::MessageView;

/// Frames a connected client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
  #[serde(rename = "typing")]
  Typing { conversation_id: i32, is_typing: bool },
  #[serde(rename = "call:offer")]
  CallOffer {
    conversation_id: i32,
    to: i32,
    sdp: json::Value,
    #[serde(default)]
    video: bool,
  },
  #[serde(rename = "call:answer")]
  CallAnswer { call_id: Uuid, sdp: json::Value },
  #[serde(rename = "call:ice-candidate")]
  IceCandidate { call_id: Uuid, candidate: json::Value },
  #[serde(rename = "call:reject")]
  CallReject { call_id: Uuid },
  #[serde(rename = "call:end")]
  CallEnd { call_id: Uuid },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
  #[serde(rename = "new:message")]
  NewMessage(MessageView),
  #[serde(rename = "message:read")]
  MessageRead { conversation_id: i32, user_id: i32, message_ids: Vec<i32> },
  #[serde(rename = "message:deleted")]
  MessageDeleted { conversation_id: i32, message_id: i32 },
  #[serde(rename = "typing")]
  Typing { conversation_id: i32, user_id: i32, is_typing: bool },
  #[serde(rename = "presence")]
  Presence { user_id: i32, online: bool },

  #[serde(rename = "call:offer")]
  CallOffer {
    call_id: Uuid,
    conversation_id: i32,
    from: i32,
    sdp: json::Value,
    video: bool,
  },
  #[serde(rename = "call:ringing")]
  CallRinging { call_id: Uuid, conversation_id: i32, to: i32 },
  #[serde(rename = "call:answer")]
  CallAnswer { call_id: Uuid, from: i32, sdp: json::Value },
  #[serde(rename = "call:ice-candidate")]
  IceCandidate { call_id: Uuid, from: i32, candidate: json::Value },
  #[serde(rename = "call:reject")]
  CallReject { call_id: Uuid, from: i32 },
  #[serde(rename = "call:end")]
  CallEnd { call_id: Uuid, from: i32 },
  #[serde(rename = "call:busy")]
  CallBusy { conversation_id: i32, user_id: i32 },
  #[serde(rename = "call:unavailable")]
  CallUnavailable { conversation_id: i32, user_id: i32 },
  #[serde(rename = "call:missed")]
  CallMissed { call_id: Uuid, conversation_id: i32 },

  #[serde(rename = "error")]
  Error { message: String },
}

impl ServerEvent {
  pub fn error(message: impl Into<String>) -> Self {
    ServerEvent::Error { message: message.into() }
  }
}
