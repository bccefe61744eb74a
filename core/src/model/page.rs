// orderflow/src/model/page.rs

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 2000;

/// Zero-based page coordinates. The size is clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  page: u32,
  size: u32,
}

impl PageRequest {
  pub fn new(page: u32, size: u32) -> Self {
    Self {
      page,
      size: size.clamp(1, MAX_PAGE_SIZE),
    }
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page) * u64::from(self.size)
  }
}

impl Default for PageRequest {
  fn default() -> Self {
    Self::new(0, DEFAULT_PAGE_SIZE)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub content: Vec<T>,
  pub page: u32,
  pub size: u32,
  pub total_elements: u64,
  pub total_pages: u64,
}

impl<T> Page<T> {
  pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
    let size = u64::from(request.size());
    Self {
      content,
      page: request.page(),
      size: request.size(),
      total_elements,
      total_pages: total_elements.div_ceil(size),
    }
  }

  pub fn empty(request: PageRequest) -> Self {
    Self::new(Vec::new(), request, 0)
  }

  pub fn is_empty(&self) -> bool {
    self.content.is_empty()
  }
}
