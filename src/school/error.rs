use thiserror::Error;

/// Failure of a remote call: network error, non-2xx status or a body that
/// does not decode.
///
/// The message is always fit for display: either the `message` field of the
/// error body, or a per-operation fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
  pub message: String,
  /// HTTP status, when a response was received
  pub status: Option<u16>,
}

impl TransportError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      status: None,
    }
  }

  pub fn with_status(mut self, status: u16) -> Self {
    self.status = Some(status);
    self
  }
}

/// The four remote operations on a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  List,
  Create,
  Update,
  Delete,
}

impl Operation {
  /// Message used when the server gives no usable error message.
  pub fn fallback_message(self, label: &str) -> String {
    match self {
      Self::List => format!("Error fetching {}s", label),
      Self::Create => format!("Error creating {}", label),
      Self::Update => format!("Error updating {}", label),
      Self::Delete => format!("Error deleting {}", label),
    }
  }

  /// Message used when the server confirms without a message.
  pub fn success_message(self, label: &str) -> String {
    let label = capitalize(label);
    match self {
      Self::List => format!("{}s loaded", label),
      Self::Create => format!("{} created successfully", label),
      Self::Update => format!("{} updated successfully", label),
      Self::Delete => format!("{} deleted successfully", label),
    }
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fallback_messages() {
    assert_eq!(
      Operation::List.fallback_message("teacher"),
      "Error fetching teachers"
    );
    assert_eq!(
      Operation::Create.fallback_message("teacher"),
      "Error creating teacher"
    );
    assert_eq!(
      Operation::Update.fallback_message("teacher"),
      "Error updating teacher"
    );
    assert_eq!(
      Operation::Delete.fallback_message("teacher"),
      "Error deleting teacher"
    );
  }

  #[test]
  fn test_success_messages_are_capitalized() {
    assert_eq!(
      Operation::Create.success_message("teacher"),
      "Teacher created successfully"
    );
    assert_eq!(
      Operation::Delete.success_message("élève"),
      "Élève deleted successfully"
    );
  }

  #[test]
  fn test_error_displays_message() {
    let err = TransportError::new("Email already used").with_status(409);
    assert_eq!(err.to_string(), "Email already used");
    assert_eq!(err.status, Some(409));
  }
}
