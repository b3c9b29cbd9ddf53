use chrono::{DateTime, Utc};

/// Teacher record as listed by the service
#[derive(Debug, Clone, PartialEq)]
pub struct Teacher {
  pub id: String,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: String,
  /// Assigned by the server at creation, never edited here
  pub registration_code: String,
  pub photo: Option<PhotoRef>,
  pub created_at: Option<DateTime<Utc>>,
}

impl Teacher {
  /// "Last First", the order used for display and sorting
  pub fn full_name(&self) -> String {
    format!("{} {}", self.last_name, self.first_name)
      .trim()
      .to_string()
  }
}

/// Photo as returned by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoRef {
  Url(String),
  Bytes(Vec<u8>),
}

/// Input for creating or updating a teacher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeacherPayload {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: String,
  /// New photo to upload, if any. Updates without one keep the current photo.
  pub photo: Option<PhotoUpload>,
}

/// Local image file attached to a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
  pub file_name: String,
  pub mime: String,
  pub bytes: Vec<u8>,
}
