use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;

use crate::{
  entity::user,
  plugins::server::{Created, Reply, created, ok},
  prelude::*,
  state::AppState,
};

#[derive(Deserialize)]
pub struct NewUser {
  name: String,
  email: String,
  avatar_url: Option<String>,
}

pub async fn create(
  State(app): State<Arc<AppState>>,
  Json(req): Json<NewUser>,
) -> Created<user::Model> {
  let user = app
    .sv()
    .user
    .create(&req.name, &req.email, req.avatar_url)
    .await?;
  created(user)
}

pub async fn get(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i32>,
) -> Reply<user::Model> {
  ok(app.sv().user.get(id).await?)
}

pub async fn online(State(app): State<Arc<AppState>>) -> Reply<Vec<i32>> {
  ok(app.hub.online())
}
