//! Caching and endpoint bindings for school service types.

use reqwest::multipart::Form;

use crate::cache::Cacheable;

use super::api_types::ApiTeacher;
use super::client::Resource;
use super::error::TransportError;
use super::types::{Teacher, TeacherPayload};

impl Cacheable for Teacher {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn entity_type() -> &'static str {
    "teacher"
  }
}

impl Resource for Teacher {
  type Api = ApiTeacher;
  type Payload = TeacherPayload;

  const COLLECTION: &'static str = "enseignant";
  const LABEL: &'static str = "teacher";

  fn form(payload: &TeacherPayload) -> Result<Form, TransportError> {
    payload.to_form()
  }
}
