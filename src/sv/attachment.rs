use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::{
  entity::{AttachmentKind as Kind, MessageType, attachment},
  error::Attachment as Reject,
  prelude::*,
};

pub const MB: u64 = 1024 * 1024;
pub const WAVEFORM_BARS: usize = 48;

static ALLOWED: &[(&str, Kind)] = &[
  ("application/pdf", Kind::File),
  ("application/msword", Kind::File),
  (
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    Kind::File,
  ),
  ("application/vnd.ms-excel", Kind::File),
  (
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    Kind::File,
  ),
  ("application/vnd.ms-powerpoint", Kind::File),
  (
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    Kind::File,
  ),
  ("application/zip", Kind::File),
  ("text/plain", Kind::File),
  ("text/csv", Kind::File),
  ("image/jpeg", Kind::Image),
  ("image/png", Kind::Image),
  ("image/gif", Kind::Image),
  ("image/webp", Kind::Image),
  ("video/mp4", Kind::Video),
  ("video/webm", Kind::Video),
  ("video/quicktime", Kind::Video),
  ("audio/mpeg", Kind::Audio),
  ("audio/mp4", Kind::Audio),
  ("audio/ogg", Kind::Audio),
  ("audio/wav", Kind::Audio),
  ("audio/webm", Kind::Audio),
];

/// Maps a MIME type onto an attachment kind. Parameters such as
/// `;codecs=opus` are ignored.
pub fn classify(mime: &str) -> Result<Kind, Reject> {
  let essence = mime.split(';').next().unwrap_or_default().trim();
  ALLOWED
    .iter()
    .find(|(allowed, _)| allowed.eq_ignore_ascii_case(essence))
    .map(|&(_, kind)| kind)
    .ok_or_else(|| Reject::UnsupportedType(mime.to_string()))
}

pub fn size_limit(kind: Kind) -> u64 {
  match kind {
    Kind::Video => 15 * MB,
    Kind::File | Kind::Image | Kind::Audio => 10 * MB,
  }
}

/// Kinds that may share one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
  Documents,
  Media,
  Audio,
}

impl Group {
  pub fn of(kind: Kind) -> Self {
    match kind {
      Kind::File => Group::Documents,
      Kind::Image | Kind::Video => Group::Media,
      Kind::Audio => Group::Audio,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Group::Documents => "documents",
      Group::Media => "images and videos",
      Group::Audio => "audio",
    }
  }

  pub fn limit(self) -> usize {
    match self {
      Group::Documents | Group::Media => 5,
      Group::Audio => 1,
    }
  }
}

/// A file received from the client, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct Upload {
  pub file_name: String,
  pub mime_type: String,
  pub kind: Kind,
  pub bytes: Vec<u8>,
  pub duration: Option<f64>,
  pub waveform: Option<Vec<u8>>,
}

impl Upload {
  pub fn new(
    file_name: impl Into<String>,
    mime_type: impl Into<String>,
    bytes: Vec<u8>,
  ) -> Result<Self, Reject> {
    let mime_type = mime_type.into();
    let kind = classify(&mime_type)?;

    if bytes.is_empty() {
      return Err(Reject::Empty);
    }
    let limit = size_limit(kind);
    if bytes.len() as u64 > limit {
      return Err(Reject::TooLarge {
        kind: kind.as_str(),
        limit_mb: limit / MB,
      });
    }

    Ok(Self {
      file_name: file_name.into(),
      mime_type,
      kind,
      bytes,
      duration: None,
      waveform: None,
    })
  }

  /// Voice notes carry their duration and raw peaks.
  pub fn with_audio_meta(mut self, duration: f64, peaks: &[f32]) -> Self {
    if self.kind == Kind::Audio {
      self.duration = Some(duration.max(0.0));
      self.waveform = Some(waveform::normalize(peaks, WAVEFORM_BARS));
    }
    self
  }
}

/// Files gathered for one pending message.
#[derive(Debug, Default)]
pub struct Staging {
  files: Vec<Upload>,
}

impl Staging {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn group(&self) -> Option<Group> {
    self.files.first().map(|file| Group::of(file.kind))
  }

  pub fn push(&mut self, upload: Upload) -> Result<(), Reject> {
    let incoming = Group::of(upload.kind);

    if let Some(staged) = self.group() {
      if staged != incoming {
        return Err(Reject::MixedCategories {
          staged: staged.as_str(),
          incoming: incoming.as_str(),
        });
      }
      if self.files.len() >= staged.limit() {
        return Err(Reject::TooMany {
          group: staged.as_str(),
          limit: staged.limit(),
        });
      }
    }

    self.files.push(upload);
    Ok(())
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn message_type(&self) -> MessageType {
    message_type(self.files.iter().map(|file| file.kind))
  }

  pub fn into_files(self) -> Vec<Upload> {
    self.files
  }
}

/// Type of a message carrying attachments of the given kinds.
pub fn message_type(kinds: impl IntoIterator<Item = Kind>) -> MessageType {
  let (mut images, mut videos) = (false, false);

  for kind in kinds {
    match kind {
      Kind::File => return MessageType::File,
      Kind::Audio => return MessageType::Audio,
      Kind::Image => images = true,
      Kind::Video => videos = true,
    }
  }

  match (images, videos) {
    (true, true) => MessageType::Media,
    (true, false) => MessageType::Image,
    (false, true) => MessageType::Video,
    (false, false) => MessageType::Text,
  }
}

/// Stored attachments split the way a message renders them.
#[derive(Debug, Default, Serialize)]
pub struct Grouped<'a> {
  pub media: Vec<&'a attachment::Model>,
  pub documents: Vec<&'a attachment::Model>,
  pub audio: Vec<&'a attachment::Model>,
}

pub fn group(attachments: &[attachment::Model]) -> Grouped<'_> {
  let mut grouped = Grouped::default();
  for item in attachments {
    match Group::of(item.kind) {
      Group::Media => grouped.media.push(item),
      Group::Documents => grouped.documents.push(item),
      Group::Audio => grouped.audio.push(item),
    }
  }
  grouped
}

#[derive(Debug, Clone)]
pub struct Stored {
  pub url: String,
  pub path: PathBuf,
}

/// Writes uploads under `<root>/chat/<kind>/`.
#[derive(Debug, Clone)]
pub struct Storage {
  root: PathBuf,
}

impl Storage {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub async fn save(&self, upload: &Upload) -> Result<Stored> {
    let dir = self.root.join("chat").join(upload.kind.as_str());
    tokio::fs::create_dir_all(&dir).await?;

    let name = match extension(&upload.file_name) {
      Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
      None => Uuid::new_v4().to_string(),
    };
    let path = dir.join(&name);
    tokio::fs::write(&path, &upload.bytes).await?;

    debug!(
      "stored {} ({} bytes) at {path:?}",
      upload.file_name,
      upload.bytes.len()
    );
    Ok(Stored {
      url: format!("/uploads/chat/{}/{name}", upload.kind.as_str()),
      path,
    })
  }

  /// Best effort cleanup after a failed send.
  pub async fn discard(&self, stored: &[Stored]) {
    for file in stored {
      if let Err(err) = tokio::fs::remove_file(&file.path).await {
        warn!("failed to remove {:?}: {err}", file.path);
      }
    }
  }
}

fn extension(file_name: &str) -> Option<String> {
  Path::new(file_name)
    .extension()
    .and_then(|ext| ext.to_str())
    .filter(|ext| !ext.is_empty() && ext.chars().all(char::is_alphanumeric))
    .map(str::to_ascii_lowercase)
}

pub mod waveform {
  /// Resamples raw peaks to `bars` buckets (max of each bucket) and scales
  /// them so the loudest bar is 100.
  pub fn normalize(peaks: &[f32], bars: usize) -> Vec<u8> {
    if bars == 0 {
      return Vec::new();
    }

    let clean: Vec<f32> = peaks
      .iter()
      .map(|peak| if peak.is_finite() { peak.abs() } else { 0.0 })
      .collect();
    if clean.is_empty() {
      return vec![0; bars];
    }

    let buckets: Vec<f32> = (0..bars)
      .map(|i| {
        let start = i * clean.len() / bars;
        let end = ((i + 1) * clean.len() / bars).max(start + 1);
        clean[start.min(clean.len() - 1)..end.min(clean.len())]
          .iter()
          .copied()
          .fold(0.0, f32::max)
      })
      .collect();

    let loudest = buckets.iter().copied().fold(0.0, f32::max);
    if loudest <= 0.0 {
      return vec![0; bars];
    }

    buckets
      .into_iter()
      .map(|bar| (bar / loudest * 100.0).round().clamp(0.0, 100.0) as u8)
      .collect()
  }

  pub fn encode(bars: &[u8]) -> String {
    json::to_string(bars).unwrap_or_else(|_| "[]".into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn upload(name: &str, mime: &str, size: usize) -> Upload {
    Upload::new(name, mime, vec![1; size]).unwrap()
  }

  #[test]
  fn test_classify() {
    assert_eq!(classify("image/png"), Ok(Kind::Image));
    assert_eq!(classify("audio/webm;codecs=opus"), Ok(Kind::Audio));
    assert_eq!(classify("Application/PDF"), Ok(Kind::File));
    assert!(matches!(
      classify("application/x-msdownload"),
      Err(Reject::UnsupportedType(_))
    ));
  }

  #[test]
  fn test_size_caps() {
    let video = Upload::new("a.mp4", "video/mp4", vec![0; 12 * MB as usize]);
    assert!(video.is_ok());

    let long =
      Upload::new("b.mp4", "video/mp4", vec![0; 15 * MB as usize + 1]);
    assert_eq!(
      long.unwrap_err(),
      Reject::TooLarge { kind: "video", limit_mb: 15 }
    );

    let doc =
      Upload::new("a.pdf", "application/pdf", vec![0; 11 * MB as usize]);
    assert_eq!(
      doc.unwrap_err(),
      Reject::TooLarge { kind: "file", limit_mb: 10 }
    );

    let empty = Upload::new("a.txt", "text/plain", Vec::new());
    assert_eq!(empty.unwrap_err(), Reject::Empty);
  }

  #[test]
  fn test_mixing_groups_is_rejected() {
    let mut staging = Staging::new();
    staging.push(upload("a.png", "image/png", 10)).unwrap();
    staging.push(upload("b.mp4", "video/mp4", 10)).unwrap();

    let err = staging.push(upload("c.pdf", "application/pdf", 10));
    assert!(matches!(err, Err(Reject::MixedCategories { .. })));
    assert_eq!(staging.message_type(), MessageType::Media);
  }

  #[test]
  fn test_count_caps() {
    let mut docs = Staging::new();
    for i in 0..5 {
      docs.push(upload(&format!("{i}.pdf"), "application/pdf", 10)).unwrap();
    }
    assert_eq!(
      docs.push(upload("6.pdf", "application/pdf", 10)),
      Err(Reject::TooMany { group: "documents", limit: 5 })
    );

    let mut media = Staging::new();
    for i in 0..3 {
      media.push(upload(&format!("{i}.png"), "image/png", 10)).unwrap();
    }
    for i in 3..5 {
      media.push(upload(&format!("{i}.mp4"), "video/mp4", 10)).unwrap();
    }
    assert_eq!(
      media.push(upload("6.png", "image/png", 10)),
      Err(Reject::TooMany { group: "images and videos", limit: 5 })
    );
    assert_eq!(media.len(), 5);

    let mut voice = Staging::new();
    voice.push(upload("a.ogg", "audio/ogg", 10)).unwrap();
    assert!(voice.push(upload("b.ogg", "audio/ogg", 10)).is_err());
    assert_eq!(voice.message_type(), MessageType::Audio);
  }

  #[test]
  fn test_message_type() {
    assert_eq!(message_type([Kind::Image, Kind::Image]), MessageType::Image);
    assert_eq!(message_type([Kind::Video]), MessageType::Video);
    assert_eq!(message_type([]), MessageType::Text);
  }

  #[test]
  fn test_waveform_normalized() {
    let peaks: Vec<f32> = (0..480).map(|i| (i % 10) as f32 / 20.0).collect();
    let bars = waveform::normalize(&peaks, WAVEFORM_BARS);

    assert_eq!(bars.len(), WAVEFORM_BARS);
    assert!(bars.iter().all(|&bar| bar == 100));

    let short = waveform::normalize(&[0.1, 0.4], 4);
    assert_eq!(short, vec![25, 25, 100, 100]);

    assert_eq!(waveform::normalize(&[], 3), vec![0, 0, 0]);
    assert_eq!(waveform::encode(&[0, 50]), "[0,50]");
  }

  #[test]
  fn test_grouping() {
    let item = |id, kind| attachment::Model {
      id,
      message_id: 1,
      kind,
      url: String::new(),
      file_name: String::new(),
      mime_type: String::new(),
      size: 1,
      duration: None,
      waveform: None,
    };
    let items =
      vec![item(1, Kind::Image), item(2, Kind::Video), item(3, Kind::File)];

    let grouped = group(&items);
    assert_eq!(grouped.media.len(), 2);
    assert_eq!(grouped.documents.len(), 1);
    assert!(grouped.audio.is_empty());
  }

  #[tokio::test]
  async fn test_storage_layout() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(dir.path());

    let photo = upload("Photo.JPG", "image/jpeg", 16);
    let stored = storage.save(&photo).await.unwrap();

    assert!(stored.url.starts_with("/uploads/chat/image/"));
    assert!(stored.url.ends_with(".jpg"));
    assert_eq!(tokio::fs::read(&stored.path).await.unwrap().len(), 16);

    storage.discard(std::slice::from_ref(&stored)).await;
    assert!(!stored.path.exists());
  }
}
