use serde::{Deserialize, Serialize};

use crate::prelude::*;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

pub fn now() -> DateTime {
  Utc::now().naive_utc()
}

pub fn format_duration(duration: TimeDelta) -> String {
  let secs = duration.num_seconds().max(0);
  if secs >= 3600 {
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
  } else {
    format!("{}m {}s", secs / 60, secs % 60)
  }
}

/// 1-based page request, clamped to sane bounds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageReq {
  #[serde(default = "first_page")]
  pub page: u64,
  #[serde(default = "default_limit")]
  pub limit: u64,
}

fn first_page() -> u64 {
  1
}

fn default_limit() -> u64 {
  DEFAULT_PAGE_SIZE
}

impl Default for PageReq {
  fn default() -> Self {
    Self { page: 1, limit: DEFAULT_PAGE_SIZE }
  }
}

impl PageReq {
  pub fn new(page: u64, limit: u64) -> Self {
    Self { page, limit }.clamped()
  }

  pub fn clamped(self) -> Self {
    Self { page: self.page.max(1), limit: self.limit.clamp(1, MAX_PAGE_SIZE) }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
  pub page: u64,
  pub limit: u64,
  pub total_pages: u64,
}

/// Runs a sea-orm paginator for the requested page.
pub async fn paginate<'db, C, S>(
  db: &'db C,
  select: S,
  req: PageReq,
) -> Result<Page<<S::Selector as sea_orm::SelectorTrait>::Item>>
where
  C: ConnectionTrait,
  S: PaginatorTrait<'db, C>,
{
  let req = req.clamped();
  let paginator = select.paginate(db, req.limit);
  let counts = paginator.num_items_and_pages().await?;
  let items = paginator.fetch_page(req.page - 1).await?;

  Ok(Page {
    items,
    total: counts.number_of_items,
    page: req.page,
    limit: req.limit,
    total_pages: counts.number_of_pages,
  })
}
