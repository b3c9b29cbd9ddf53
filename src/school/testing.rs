//! In-memory stand-in for the teacher endpoints.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use super::client::{Notice, RemoteCollection, Saved};
use super::error::TransportError;
use super::types::{Teacher, TeacherPayload};

pub fn teacher(id: &str, last_name: &str, first_name: &str) -> Teacher {
  Teacher {
    id: id.to_string(),
    first_name: first_name.to_string(),
    last_name: last_name.to_string(),
    email: format!("{}@ecole.tn", first_name.to_lowercase()),
    phone: "22000000".to_string(),
    registration_code: format!("ENS-{}", id),
    photo: None,
    created_at: None,
  }
}

pub fn payload(last_name: &str, first_name: &str) -> TeacherPayload {
  TeacherPayload {
    first_name: first_name.to_string(),
    last_name: last_name.to_string(),
    email: format!("{}@ecole.tn", first_name.to_lowercase()),
    phone: "22000000".to_string(),
    photo: None,
  }
}

/// Fake collection holding records in memory, with scripted failures.
#[derive(Default)]
pub struct FakeRemote {
  records: Mutex<Vec<Teacher>>,
  next_id: AtomicU32,
  list_calls: AtomicUsize,
  list_delay: Mutex<Duration>,
  list_error: Mutex<Option<String>>,
  failing_deletes: Mutex<HashSet<String>>,
  create_error: Mutex<Option<String>>,
  /// Signalled whenever a delete call starts
  pub delete_started: Arc<Notify>,
  /// When set, the next delete waits for it before answering
  delete_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeRemote {
  pub fn with_records(records: Vec<Teacher>) -> Self {
    let fake = Self::default();
    fake
      .next_id
      .store(records.len() as u32 + 1, Ordering::SeqCst);
    *fake.records.lock().unwrap() = records;
    fake
  }

  pub fn list_calls(&self) -> usize {
    self.list_calls.load(Ordering::SeqCst)
  }

  pub fn set_list_delay(&self, delay: Duration) {
    *self.list_delay.lock().unwrap() = delay;
  }

  /// Fail every list call with `message`, or answer again with `None`.
  pub fn set_list_error(&self, message: Option<&str>) {
    *self.list_error.lock().unwrap() = message.map(str::to_string);
  }

  pub fn fail_delete_of(&self, id: &str) {
    self.failing_deletes.lock().unwrap().insert(id.to_string());
  }

  pub fn fail_create(&self, message: &str) {
    *self.create_error.lock().unwrap() = Some(message.to_string());
  }

  /// Hold the next delete until the returned handle is notified.
  pub fn gate_next_delete(&self) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    *self.delete_gate.lock().unwrap() = Some(Arc::clone(&gate));
    gate
  }
}

impl RemoteCollection<Teacher> for FakeRemote {
  async fn list(&self) -> Result<Vec<Teacher>, TransportError> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(message) = self.list_error.lock().unwrap().clone() {
      return Err(TransportError::new(message).with_status(500));
    }
    let records = self.records.lock().unwrap().clone();
    let delay = *self.list_delay.lock().unwrap();
    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }
    Ok(records)
  }

  async fn create(&self, payload: &TeacherPayload) -> Result<Saved<Teacher>, TransportError> {
    if let Some(message) = self.create_error.lock().unwrap().clone() {
      return Err(TransportError::new(message).with_status(400));
    }
    let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
    let entity = Teacher {
      id: id.clone(),
      first_name: payload.first_name.clone(),
      last_name: payload.last_name.clone(),
      email: payload.email.clone(),
      phone: payload.phone.clone(),
      registration_code: format!("ENS-{}", id),
      photo: None,
      created_at: None,
    };
    self.records.lock().unwrap().push(entity.clone());
    Ok(Saved {
      entity,
      message: Some("created".to_string()),
    })
  }

  async fn update(
    &self,
    id: &str,
    payload: &TeacherPayload,
  ) -> Result<Saved<Teacher>, TransportError> {
    let mut records = self.records.lock().unwrap();
    let record = records
      .iter_mut()
      .find(|t| t.id == id)
      .ok_or_else(|| TransportError::new("Teacher not found").with_status(404))?;
    record.first_name = payload.first_name.clone();
    record.last_name = payload.last_name.clone();
    record.email = payload.email.clone();
    record.phone = payload.phone.clone();
    Ok(Saved {
      entity: record.clone(),
      message: None,
    })
  }

  async fn delete(&self, id: &str) -> Result<Notice, TransportError> {
    self.delete_started.notify_one();
    let gate = self.delete_gate.lock().unwrap().take();
    if let Some(gate) = gate {
      gate.notified().await;
    }

    if self.failing_deletes.lock().unwrap().contains(id) {
      return Err(TransportError::new("Cannot delete a teacher with grades").with_status(409));
    }
    self.records.lock().unwrap().retain(|t| t.id != id);
    Ok(Notice {
      message: Some("deleted".to_string()),
    })
  }
}
