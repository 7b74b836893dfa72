use axum::{
  extract::{
    Query, State, WebSocketUpgrade,
    ws::{Message, WebSocket},
  },
  response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::{
  prelude::*,
  realtime::{ClientEvent, ServerEvent},
  state::AppState,
};

#[derive(Deserialize)]
pub struct Connect {
  user_id: i32,
}

pub async fn upgrade(
  State(app): State<Arc<AppState>>,
  Query(req): Query<Connect>,
  ws: WebSocketUpgrade,
) -> Result<Response> {
  app.sv().user.get(req.user_id).await?;
  Ok(ws.on_upgrade(move |socket| session(socket, app, req.user_id)))
}

async fn session(socket: WebSocket, app: Arc<AppState>, user_id: i32) {
  let (conn, mut events) = app.hub.connect(user_id);
  let (mut sink, mut stream) = socket.split();

  let writer = tokio::spawn(async move {
    while let Some(event) = events.recv().await {
      let frame = match json::to_string(&event) {
        Ok(frame) => frame,
        Err(err) => {
          error!("failed to encode event: {err}");
          continue;
        }
      };
      if sink.send(Message::Text(frame.into())).await.is_err() {
        break;
      }
    }
  });

  while let Some(Ok(frame)) = stream.next().await {
    match frame {
      Message::Text(text) => {
        match json::from_str::<ClientEvent>(text.as_str()) {
          Ok(event) => dispatch(&app, user_id, event).await,
          Err(err) => {
            debug!("bad frame from user {user_id}: {err}");
            app.hub.send(user_id, ServerEvent::error("Unknown event"));
          }
        }
      }
      Message::Close(_) => break,
      _ => {}
    }
  }

  let ended = app.hub.disconnect(user_id, conn);
  app.log_calls(ended).await;
  writer.abort();
}

async fn dispatch(app: &AppState, user_id: i32, event: ClientEvent) {
  let hub = &app.hub;
  let chat = app.sv().chat;

  match event {
    ClientEvent::Typing { conversation_id, is_typing } => {
      match chat.ensure_participant(conversation_id, user_id).await {
        Ok(()) => {
          let members =
            chat.participants(conversation_id).await.unwrap_or_default();
          hub.typing(conversation_id, user_id, is_typing, &members);
        }
        Err(err) => {
          hub.send(user_id, ServerEvent::error(err.to_string()));
        }
      }
    }
    ClientEvent::CallOffer { conversation_id, to, sdp, video } => {
      let allowed = async {
        chat.ensure_participant(conversation_id, user_id).await?;
        chat.ensure_participant(conversation_id, to).await
      };
      match allowed.await {
        Ok(()) => {
          hub.offer(conversation_id, user_id, to, sdp, video);
        }
        Err(err) => {
          hub.send(user_id, ServerEvent::error(err.to_string()));
        }
      }
    }
    ClientEvent::CallAnswer { call_id, sdp } => {
      hub.answer(user_id, call_id, sdp);
    }
    ClientEvent::IceCandidate { call_id, candidate } => {
      hub.ice_candidate(user_id, call_id, candidate);
    }
    ClientEvent::CallReject { call_id } => {
      let ended = hub.reject(user_id, call_id);
      app.log_calls(ended.into_iter().collect()).await;
    }
    ClientEvent::CallEnd { call_id } => {
      let ended = hub.end(user_id, call_id);
      app.log_calls(ended.into_iter().collect()).await;
    }
  }
}
