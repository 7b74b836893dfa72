use serde::Serialize;

use crate::{
  entity::{
    MessageType, attachment, conversation, message, message_read, participant,
  },
  prelude::*,
  sv::{
    self,
    attachment::{Staging, Storage, Stored, waveform},
  },
  utils,
};

pub const MAX_HISTORY: u64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
  #[serde(flatten)]
  pub message: message::Model,
  pub attachments: Vec<attachment::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
  #[serde(flatten)]
  pub conversation: conversation::Model,
  pub participants: Vec<i32>,
  pub last_message: Option<message::Model>,
  pub unread: u64,
}

/// How a call ended, for the call log line.
#[derive(Debug, Clone, Copy)]
pub enum CallOutcome {
  Completed(TimeDelta),
  Missed,
  Rejected,
}

impl CallOutcome {
  fn describe(self) -> String {
    match self {
      CallOutcome::Completed(took) => {
        format!("Call ended, {}", utils::format_duration(took))
      }
      CallOutcome::Missed => "Missed call".into(),
      CallOutcome::Rejected => "Call declined".into(),
    }
  }
}

pub struct Chat<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Chat<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn get(&self, id: i32) -> Result<conversation::Model> {
    conversation::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::ConversationNotFound)
  }

  pub async fn participants(&self, conversation_id: i32) -> Result<Vec<i32>> {
    let rows = participant::Entity::find()
      .filter(participant::Column::ConversationId.eq(conversation_id))
      .order_by_asc(participant::Column::JoinedAt)
      .order_by_asc(participant::Column::UserId)
      .all(self.db)
      .await?;
    Ok(rows.into_iter().map(|row| row.user_id).collect())
  }

  pub async fn ensure_participant(
    &self,
    conversation_id: i32,
    user_id: i32,
  ) -> Result<()> {
    self.get(conversation_id).await?;
    participant::Entity::find_by_id((conversation_id, user_id))
      .one(self.db)
      .await?
      .map(|_| ())
      .ok_or(Error::NotParticipant)
  }

  pub async fn create_group(
    &self,
    creator: i32,
    title: Option<String>,
    members: &[i32],
  ) -> Result<conversation::Model> {
    let mut ids = vec![creator];
    for &member in members {
      if !ids.contains(&member) {
        ids.push(member);
      }
    }
    if ids.len() < 2 {
      return Err(Error::InvalidArgs(
        "A conversation needs at least two participants".into(),
      ));
    }

    let found = sv::User::new(self.db).by_ids(&ids).await?;
    if found.len() != ids.len() {
      return Err(Error::UserNotFound);
    }

    let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    self.open(creator, title, true, &ids).await
  }

  /// Existing one-to-one conversation between `a` and `b`, or a new one.
  pub async fn direct(&self, a: i32, b: i32) -> Result<conversation::Model> {
    if a == b {
      return Err(Error::InvalidArgs(
        "Cannot start a chat with yourself".into(),
      ));
    }

    let users = sv::User::new(self.db);
    users.get(a).await?;
    users.get(b).await?;

    let mine: Vec<i32> = participant::Entity::find()
      .filter(participant::Column::UserId.eq(a))
      .inner_join(conversation::Entity)
      .filter(conversation::Column::IsGroup.eq(false))
      .all(self.db)
      .await?
      .into_iter()
      .map(|row| row.conversation_id)
      .collect();

    if !mine.is_empty() {
      let shared = participant::Entity::find()
        .filter(participant::Column::UserId.eq(b))
        .filter(participant::Column::ConversationId.is_in(mine))
        .one(self.db)
        .await?;
      if let Some(shared) = shared {
        return self.get(shared.conversation_id).await;
      }
    }

    self.open(a, None, false, &[a, b]).await
  }

  async fn open(
    &self,
    creator: i32,
    title: Option<String>,
    is_group: bool,
    members: &[i32],
  ) -> Result<conversation::Model> {
    let now = utils::now();
    let txn = self.db.begin().await?;

    let conversation = conversation::ActiveModel {
      id: NotSet,
      title: Set(title),
      is_group: Set(is_group),
      created_by: Set(creator),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let rows = members.iter().map(|&user_id| participant::ActiveModel {
      conversation_id: Set(conversation.id),
      user_id: Set(user_id),
      joined_at: Set(now),
    });
    participant::Entity::insert_many(rows)
      .exec_without_returning(&txn)
      .await?;

    txn.commit().await?;

    info!(
      "conversation {} opened by user {creator} with {} members",
      conversation.id,
      members.len()
    );
    Ok(conversation)
  }

  /// Conversations of `user_id`, most recently active first.
  pub async fn list(&self, user_id: i32) -> Result<Vec<ConversationView>> {
    let conversations = conversation::Entity::find()
      .inner_join(participant::Entity)
      .filter(participant::Column::UserId.eq(user_id))
      .order_by_desc(conversation::Column::UpdatedAt)
      .order_by_desc(conversation::Column::Id)
      .all(self.db)
      .await?;

    let mut views = Vec::with_capacity(conversations.len());
    for conversation in conversations {
      let last_message = message::Entity::find()
        .filter(message::Column::ConversationId.eq(conversation.id))
        .order_by_desc(message::Column::CreatedAt)
        .order_by_desc(message::Column::Id)
        .one(self.db)
        .await?;

      views.push(ConversationView {
        participants: self.participants(conversation.id).await?,
        unread: self.unread(conversation.id, user_id).await?,
        last_message,
        conversation,
      });
    }
    Ok(views)
  }

  pub async fn unread(
    &self,
    conversation_id: i32,
    user_id: i32,
  ) -> Result<u64> {
    let incoming = message::Entity::find()
      .filter(message::Column::ConversationId.eq(conversation_id))
      .filter(message::Column::SenderId.ne(user_id))
      .filter(message::Column::IsDeleted.eq(false))
      .count(self.db)
      .await?;

    let read = message_read::Entity::find()
      .filter(message_read::Column::UserId.eq(user_id))
      .inner_join(message::Entity)
      .filter(message::Column::ConversationId.eq(conversation_id))
      .filter(message::Column::SenderId.ne(user_id))
      .filter(message::Column::IsDeleted.eq(false))
      .count(self.db)
      .await?;

    Ok(incoming.saturating_sub(read))
  }

  /// Stores the staged files, then writes the message and its attachments in
  /// one transaction. Files are removed again if the write fails.
  pub async fn send(
    &self,
    conversation_id: i32,
    sender_id: i32,
    content: Option<String>,
    staging: Staging,
    storage: &Storage,
  ) -> Result<MessageView> {
    let content =
      content.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    if content.is_none() && staging.is_empty() {
      return Err(Error::InvalidArgs("Message is empty".into()));
    }
    self.ensure_participant(conversation_id, sender_id).await?;

    let message_type = if staging.is_empty() {
      MessageType::Text
    } else {
      staging.message_type()
    };
    let files = staging.into_files();

    let mut stored: Vec<Stored> = Vec::with_capacity(files.len());
    for file in &files {
      match storage.save(file).await {
        Ok(file) => stored.push(file),
        Err(err) => {
          storage.discard(&stored).await;
          return Err(err);
        }
      }
    }

    let written = self
      .write(conversation_id, sender_id, message_type, content, &files, &stored)
      .await;
    if written.is_err() {
      storage.discard(&stored).await;
    }
    let view = written?;

    debug!(
      "message {} ({:?}) in conversation {conversation_id} from {sender_id}",
      view.message.id, view.message.message_type
    );
    Ok(view)
  }

  async fn write(
    &self,
    conversation_id: i32,
    sender_id: i32,
    message_type: MessageType,
    content: Option<String>,
    files: &[sv::attachment::Upload],
    stored: &[Stored],
  ) -> Result<MessageView> {
    let now = utils::now();
    let txn = self.db.begin().await?;

    let message = message::ActiveModel {
      id: NotSet,
      conversation_id: Set(conversation_id),
      sender_id: Set(sender_id),
      message_type: Set(message_type),
      content: Set(content),
      is_deleted: Set(false),
      created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let mut attachments = Vec::with_capacity(files.len());
    for (file, stored) in files.iter().zip(stored) {
      let row = attachment::ActiveModel {
        id: NotSet,
        message_id: Set(message.id),
        kind: Set(file.kind),
        url: Set(stored.url.clone()),
        file_name: Set(file.file_name.clone()),
        mime_type: Set(file.mime_type.clone()),
        size: Set(file.bytes.len() as i64),
        duration: Set(file.duration),
        waveform: Set(file.waveform.as_deref().map(waveform::encode)),
      }
      .insert(&txn)
      .await?;
      attachments.push(row);
    }

    self.touch(&txn, conversation_id, now).await?;
    txn.commit().await?;

    Ok(MessageView { message, attachments })
  }

  async fn touch<C: ConnectionTrait>(
    &self,
    conn: &C,
    conversation_id: i32,
    at: DateTime,
  ) -> Result<()> {
    conversation::ActiveModel {
      id: Set(conversation_id),
      updated_at: Set(at),
      ..Default::default()
    }
    .update(conn)
    .await?;
    Ok(())
  }

  /// Newest first. `before` is a message id cursor.
  pub async fn history(
    &self,
    conversation_id: i32,
    user_id: i32,
    before: Option<i32>,
    limit: u64,
  ) -> Result<Vec<MessageView>> {
    self.ensure_participant(conversation_id, user_id).await?;

    let mut query = message::Entity::find()
      .filter(message::Column::ConversationId.eq(conversation_id));
    if let Some(before) = before {
      query = query.filter(message::Column::Id.lt(before));
    }

    let messages = query
      .order_by_desc(message::Column::Id)
      .limit(limit.clamp(1, MAX_HISTORY))
      .all(self.db)
      .await?;

    let ids: Vec<i32> = messages
      .iter()
      .filter(|message| !message.is_deleted)
      .map(|message| message.id)
      .collect();

    let mut by_message: HashMap<i32, Vec<attachment::Model>> = HashMap::new();
    if !ids.is_empty() {
      let rows = attachment::Entity::find()
        .filter(attachment::Column::MessageId.is_in(ids))
        .order_by_asc(attachment::Column::Id)
        .all(self.db)
        .await?;
      for row in rows {
        by_message.entry(row.message_id).or_default().push(row);
      }
    }

    Ok(
      messages
        .into_iter()
        .map(|message| MessageView {
          attachments: by_message.remove(&message.id).unwrap_or_default(),
          message,
        })
        .collect(),
    )
  }

  /// Soft delete; only the sender may remove a message.
  pub async fn delete(
    &self,
    message_id: i32,
    user_id: i32,
  ) -> Result<message::Model> {
    let message = message::Entity::find_by_id(message_id)
      .one(self.db)
      .await?
      .ok_or(Error::MessageNotFound)?;

    if message.sender_id != user_id {
      return Err(Error::InvalidArgs(
        "Only the sender can delete a message".into(),
      ));
    }
    if message.is_deleted {
      return Ok(message);
    }

    let deleted = message::ActiveModel {
      is_deleted: Set(true),
      content: Set(None),
      ..message.into()
    }
    .update(self.db)
    .await?;

    info!("message {message_id} deleted by user {user_id}");
    Ok(deleted)
  }

  /// Marks every unread incoming message as read and returns their ids.
  pub async fn mark_read(
    &self,
    conversation_id: i32,
    user_id: i32,
  ) -> Result<Vec<i32>> {
    self.ensure_participant(conversation_id, user_id).await?;

    let incoming: Vec<i32> = message::Entity::find()
      .filter(message::Column::ConversationId.eq(conversation_id))
      .filter(message::Column::SenderId.ne(user_id))
      .filter(message::Column::IsDeleted.eq(false))
      .all(self.db)
      .await?
      .into_iter()
      .map(|message| message.id)
      .collect();
    if incoming.is_empty() {
      return Ok(Vec::new());
    }

    let already: HashSet<i32> = message_read::Entity::find()
      .filter(message_read::Column::UserId.eq(user_id))
      .filter(message_read::Column::MessageId.is_in(incoming.clone()))
      .all(self.db)
      .await?
      .into_iter()
      .map(|read| read.message_id)
      .collect();

    let fresh: Vec<i32> =
      incoming.into_iter().filter(|id| !already.contains(id)).collect();
    if fresh.is_empty() {
      return Ok(fresh);
    }

    let now = utils::now();
    let rows = fresh.iter().map(|&message_id| message_read::ActiveModel {
      message_id: Set(message_id),
      user_id: Set(user_id),
      read_at: Set(now),
    });
    message_read::Entity::insert_many(rows)
      .exec_without_returning(self.db)
      .await?;

    Ok(fresh)
  }

  /// Leaves a `call` line in the conversation once a call is over.
  pub async fn log_call(
    &self,
    conversation_id: i32,
    caller_id: i32,
    outcome: CallOutcome,
  ) -> Result<message::Model> {
    self.ensure_participant(conversation_id, caller_id).await?;

    let now = utils::now();
    let txn = self.db.begin().await?;
    let message = message::ActiveModel {
      id: NotSet,
      conversation_id: Set(conversation_id),
      sender_id: Set(caller_id),
      message_type: Set(MessageType::Call),
      content: Set(Some(outcome.describe())),
      is_deleted: Set(false),
      created_at: Set(now),
    }
    .insert(&txn)
    .await?;
    self.touch(&txn, conversation_id, now).await?;
    txn.commit().await?;

    Ok(message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::AttachmentKind,
    error::Attachment as Reject,
    sv::{
      attachment::Upload,
      test_utils::{fixtures, test_db},
    },
  };

  fn text(body: &str) -> Option<String> {
    Some(body.into())
  }

  fn storage(dir: &tempfile::TempDir) -> Storage {
    Storage::new(dir.path())
  }

  #[tokio::test]
  async fn test_direct_is_reused() {
    let db = test_db::setup().await;
    let an = fixtures::user(&db, "an").await;
    let binh = fixtures::user(&db, "binh").await;
    let chat = Chat::new(&db);

    let first = chat.direct(an.id, binh.id).await.unwrap();
    let again = chat.direct(binh.id, an.id).await.unwrap();

    assert_eq!(first.id, again.id);
    assert!(!first.is_group);
    assert_eq!(chat.participants(first.id).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_group_needs_known_users() {
    let db = test_db::setup().await;
    let an = fixtures::user(&db, "an").await;
    let chat = Chat::new(&db);

    assert!(matches!(
      chat.create_group(an.id, None, &[]).await,
      Err(Error::InvalidArgs(_))
    ));
    assert!(matches!(
      chat.create_group(an.id, None, &[99]).await,
      Err(Error::UserNotFound)
    ));
  }

  #[tokio::test]
  async fn test_send_and_unread() {
    let db = test_db::setup().await;
    let an = fixtures::user(&db, "an").await;
    let binh = fixtures::user(&db, "binh").await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(dir.path());
    let chat = Chat::new(&db);
    let room = chat.direct(an.id, binh.id).await.unwrap();

    chat
      .send(room.id, an.id, text("hi"), Staging::new(), &storage)
      .await
      .unwrap();
    chat
      .send(room.id, an.id, text("there?"), Staging::new(), &storage)
      .await
      .unwrap();

    let listed = chat.list(binh.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].unread, 2);
    assert_eq!(
      listed[0].last_message.as_ref().and_then(|m| m.content.as_deref()),
      Some("there?")
    );

    let read = chat.mark_read(room.id, binh.id).await.unwrap();
    assert_eq!(read.len(), 2);
    assert_eq!(chat.unread(room.id, binh.id).await.unwrap(), 0);
    assert!(chat.mark_read(room.id, binh.id).await.unwrap().is_empty());
    assert_eq!(chat.unread(room.id, an.id).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_outsider_cannot_send() {
    let db = test_db::setup().await;
    let an = fixtures::user(&db, "an").await;
    let binh = fixtures::user(&db, "binh").await;
    let chi = fixtures::user(&db, "chi").await;
    let dir = tempfile::tempdir().unwrap();
    let chat = Chat::new(&db);
    let room = chat.direct(an.id, binh.id).await.unwrap();

    let result = chat
      .send(room.id, chi.id, text("hey"), Staging::new(), &storage(&dir))
      .await;
    assert!(matches!(result, Err(Error::NotParticipant)));
  }

  #[tokio::test]
  async fn test_media_message_with_attachments() {
    let db = test_db::setup().await;
    let an = fixtures::user(&db, "an").await;
    let binh = fixtures::user(&db, "binh").await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(dir.path());
    let chat = Chat::new(&db);
    let room = chat.direct(an.id, binh.id).await.unwrap();

    let mut staging = Staging::new();
    let png = Upload::new("a.png", "image/png", vec![1; 8]).unwrap();
    let mp4 = Upload::new("b.mp4", "video/mp4", vec![1; 8]).unwrap();
    let pdf = Upload::new("c.pdf", "application/pdf", vec![1]).unwrap();
    staging.push(png).unwrap();
    staging.push(mp4).unwrap();
    assert!(matches!(
      staging.push(pdf),
      Err(Reject::MixedCategories { .. })
    ));

    let sent =
      chat.send(room.id, an.id, None, staging, &storage).await.unwrap();
    assert_eq!(sent.message.message_type, MessageType::Media);
    assert_eq!(sent.attachments.len(), 2);
    assert_eq!(sent.attachments[1].kind, AttachmentKind::Video);

    let history = chat.history(room.id, binh.id, None, 50).await.unwrap();
    assert_eq!(history[0].attachments.len(), 2);
  }

  #[tokio::test]
  async fn test_voice_note_waveform() {
    let db = test_db::setup().await;
    let an = fixtures::user(&db, "an").await;
    let binh = fixtures::user(&db, "binh").await;
    let dir = tempfile::tempdir().unwrap();
    let chat = Chat::new(&db);
    let room = chat.direct(an.id, binh.id).await.unwrap();

    let voice = Upload::new("note.webm", "audio/webm", vec![1; 32])
      .unwrap()
      .with_audio_meta(3.5, &[0.2, 0.8, 0.4]);
    let mut staging = Staging::new();
    staging.push(voice).unwrap();

    let sent = chat
      .send(room.id, an.id, None, staging, &storage(&dir))
      .await
      .unwrap();
    let stored = &sent.attachments[0];
    assert_eq!(sent.message.message_type, MessageType::Audio);
    assert_eq!(stored.duration, Some(3.5));

    let bars: Vec<u8> =
      json::from_str(stored.waveform.as_deref().unwrap()).unwrap();
    assert_eq!(bars.len(), sv::attachment::WAVEFORM_BARS);
    assert_eq!(bars.iter().max(), Some(&100));
  }

  #[tokio::test]
  async fn test_history_cursor_and_soft_delete() {
    let db = test_db::setup().await;
    let an = fixtures::user(&db, "an").await;
    let binh = fixtures::user(&db, "binh").await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(dir.path());
    let chat = Chat::new(&db);
    let room = chat.direct(an.id, binh.id).await.unwrap();

    let mut ids = Vec::new();
    for i in 0..5 {
      let sent = chat
        .send(room.id, an.id, Some(format!("m{i}")), Staging::new(), &storage)
        .await
        .unwrap();
      ids.push(sent.message.id);
    }

    let latest = chat.history(room.id, an.id, None, 2).await.unwrap();
    assert_eq!(latest[0].message.id, ids[4]);
    assert_eq!(latest.len(), 2);

    let older =
      chat.history(room.id, an.id, Some(ids[3]), 10).await.unwrap();
    assert_eq!(older.len(), 3);
    assert_eq!(older[0].message.id, ids[2]);

    assert!(matches!(
      chat.delete(ids[0], binh.id).await,
      Err(Error::InvalidArgs(_))
    ));
    let deleted = chat.delete(ids[0], an.id).await.unwrap();
    assert!(deleted.is_deleted);
    assert_eq!(deleted.content, None);
    assert_eq!(chat.unread(room.id, binh.id).await.unwrap(), 4);
  }

  #[tokio::test]
  async fn test_call_log() {
    let db = test_db::setup().await;
    let an = fixtures::user(&db, "an").await;
    let binh = fixtures::user(&db, "binh").await;
    let chat = Chat::new(&db);
    let room = chat.direct(an.id, binh.id).await.unwrap();

    let line = chat
      .log_call(
        room.id,
        an.id,
        CallOutcome::Completed(TimeDelta::seconds(125)),
      )
      .await
      .unwrap();
    assert_eq!(line.message_type, MessageType::Call);
    assert_eq!(line.content.as_deref(), Some("Call ended, 2m 5s"));

    let missed = chat.log_call(room.id, an.id, CallOutcome::Missed).await;
    assert_eq!(missed.unwrap().content.as_deref(), Some("Missed call"));
  }
}
