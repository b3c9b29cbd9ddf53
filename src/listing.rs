//! Search and sort over a list snapshot.
//!
//! The projection borrows from the snapshot and never changes it.

use std::cmp::Ordering;

use crate::school::Teacher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  #[default]
  NameAsc,
  NameDesc,
  CreatedAsc,
  CreatedDesc,
}

impl SortOrder {
  /// Cycle through the orders, in declaration order.
  pub fn next(self) -> Self {
    match self {
      Self::NameAsc => Self::NameDesc,
      Self::NameDesc => Self::CreatedAsc,
      Self::CreatedAsc => Self::CreatedDesc,
      Self::CreatedDesc => Self::NameAsc,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::NameAsc => "name ↑",
      Self::NameDesc => "name ↓",
      Self::CreatedAsc => "created ↑",
      Self::CreatedDesc => "created ↓",
    }
  }

  fn compare(self, a: &Teacher, b: &Teacher) -> Ordering {
    match self {
      Self::NameAsc => by_name(a, b),
      Self::NameDesc => by_name(b, a),
      Self::CreatedAsc => a.created_at.cmp(&b.created_at),
      Self::CreatedDesc => b.created_at.cmp(&a.created_at),
    }
  }
}

fn by_name(a: &Teacher, b: &Teacher) -> Ordering {
  a.last_name
    .to_lowercase()
    .cmp(&b.last_name.to_lowercase())
    .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
}

/// Field a search query is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
  LastName,
  FirstName,
  Email,
  Phone,
  RegistrationCode,
}

impl SearchField {
  pub const ALL: [SearchField; 5] = [
    SearchField::LastName,
    SearchField::FirstName,
    SearchField::Email,
    SearchField::Phone,
    SearchField::RegistrationCode,
  ];

  pub fn value(self, teacher: &Teacher) -> &str {
    match self {
      Self::LastName => &teacher.last_name,
      Self::FirstName => &teacher.first_name,
      Self::Email => &teacher.email,
      Self::Phone => &teacher.phone,
      Self::RegistrationCode => &teacher.registration_code,
    }
  }
}

/// Case-insensitive substring filter over a set of fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
  query: String,
  fields: Vec<SearchField>,
}

impl Default for ListFilter {
  fn default() -> Self {
    Self {
      query: String::new(),
      fields: SearchField::ALL.to_vec(),
    }
  }
}

impl ListFilter {
  #[cfg(test)]
  pub fn new(query: &str) -> Self {
    let mut filter = Self::default();
    filter.set_query(query);
    filter
  }

  #[cfg(test)]
  pub fn with_fields(mut self, fields: &[SearchField]) -> Self {
    self.fields = fields.to_vec();
    self
  }

  pub fn set_query(&mut self, query: &str) {
    self.query = query.trim().to_lowercase();
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn is_empty(&self) -> bool {
    self.query.is_empty()
  }

  pub fn matches(&self, teacher: &Teacher) -> bool {
    if self.query.is_empty() {
      return true;
    }
    self
      .fields
      .iter()
      .any(|field| field.value(teacher).to_lowercase().contains(&self.query))
  }
}

/// Filtered and sorted rows of `snapshot`. Equal rows keep snapshot order.
pub fn project<'a>(snapshot: &'a [Teacher], filter: &ListFilter, order: SortOrder) -> Vec<&'a Teacher> {
  let mut rows: Vec<&Teacher> = snapshot.iter().filter(|t| filter.matches(t)).collect();
  rows.sort_by(|a, b| order.compare(a, b));
  rows
}
