//! Serde-deserializable types matching the school service responses.
//!
//! These types are separate from domain types to allow lenient deserialization
//! (ids as strings or numbers, photos as URLs or byte buffers) while keeping
//! domain types focused on application needs.

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Deserializer};

use super::error::TransportError;
use super::types::{PhotoRef, Teacher, TeacherPayload};

// ============================================================================
// Envelopes
// ============================================================================

/// Success body of list/create/update calls
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
  pub data: T,
  #[serde(default)]
  pub message: Option<String>,
}

/// Body of delete calls and of error responses
#[derive(Debug, Default, Deserialize)]
pub struct ApiMessage {
  #[serde(default)]
  pub message: Option<String>,
}

/// Extract a usable `message` from an error body.
pub fn message_from_body(body: &[u8]) -> Option<String> {
  serde_json::from_slice::<ApiMessage>(body)
    .ok()
    .and_then(|m| m.message)
    .map(|m| m.trim().to_string())
    .filter(|m| !m.is_empty())
}

// ============================================================================
// Teacher
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiTeacher {
  #[serde(alias = "_id", deserialize_with = "string_or_number")]
  pub id: String,
  #[serde(default)]
  pub nom: String,
  #[serde(default)]
  pub prenom: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub telephone: String,
  #[serde(default, deserialize_with = "string_or_number")]
  pub matricule: String,
  #[serde(default)]
  pub photo: Option<ApiPhoto>,
  #[serde(rename = "createdAt", alias = "created_at", default)]
  pub created_at: Option<String>,
}

/// Photo field: either a URL or a Node-style buffer
/// (`{"type": "Buffer", "data": [..]}`)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiPhoto {
  Url(String),
  Buffer { data: Vec<u8> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
  Text(String),
  Number(i64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  let raw: Option<RawId> = Option::deserialize(deserializer)?;
  Ok(match raw {
    Some(RawId::Text(s)) => s,
    Some(RawId::Number(n)) => n.to_string(),
    None => String::new(),
  })
}

impl From<ApiTeacher> for Teacher {
  fn from(api: ApiTeacher) -> Self {
    let photo = match api.photo {
      Some(ApiPhoto::Url(url)) if !url.is_empty() => Some(PhotoRef::Url(url)),
      Some(ApiPhoto::Buffer { data }) if !data.is_empty() => Some(PhotoRef::Bytes(data)),
      _ => None,
    };
    let created_at = api
      .created_at
      .as_deref()
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|dt| dt.with_timezone(&Utc));

    Teacher {
      id: api.id,
      first_name: api.prenom,
      last_name: api.nom,
      email: api.email,
      phone: api.telephone,
      registration_code: api.matricule,
      photo,
      created_at,
    }
  }
}

impl TeacherPayload {
  /// Text fields of the multipart body, by wire name.
  pub fn text_fields(&self) -> [(&'static str, &str); 4] {
    [
      ("nom", self.last_name.as_str()),
      ("prenom", self.first_name.as_str()),
      ("email", self.email.as_str()),
      ("telephone", self.phone.as_str()),
    ]
  }

  /// Multipart body for create/update calls.
  pub fn to_form(&self) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for (name, value) in self.text_fields() {
      form = form.text(name, value.to_string());
    }
    if let Some(photo) = &self.photo {
      let part = Part::bytes(photo.bytes.clone())
        .file_name(photo.file_name.clone())
        .mime_str(&photo.mime)
        .map_err(|_| TransportError::new(format!("Invalid photo type: {}", photo.mime)))?;
      form = form.part("photo", part);
    }
    Ok(form)
  }
}
