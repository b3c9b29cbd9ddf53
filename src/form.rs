//! Client-side validation of the teacher form.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

use crate::config::FormConfig;
use crate::school::{PhotoUpload, Teacher, TeacherPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  LastName,
  FirstName,
  Email,
  Phone,
  Photo,
}

impl Field {
  pub const ALL: [Field; 5] = [
    Field::LastName,
    Field::FirstName,
    Field::Email,
    Field::Phone,
    Field::Photo,
  ];

  pub fn label(self) -> &'static str {
    match self {
      Self::LastName => "Last name",
      Self::FirstName => "First name",
      Self::Email => "Email",
      Self::Phone => "Phone",
      Self::Photo => "Photo",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("required")]
  Required,
  #[error("invalid email address")]
  InvalidEmail,
  #[error("must be exactly {digits} digits")]
  InvalidPhone { digits: usize },
  #[error("photo is larger than {max} bytes")]
  PhotoTooLarge { max: u64 },
  #[error("not an image ({mime})")]
  PhotoNotImage { mime: String },
  #[error("cannot read photo: {reason}")]
  PhotoUnreadable { reason: String },
}

/// Limits applied to form values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
  pub phone_digits: usize,
  pub max_photo_bytes: u64,
}

impl Default for ValidationRules {
  fn default() -> Self {
    Self {
      phone_digits: 8,
      max_photo_bytes: 5 * 1024 * 1024,
    }
  }
}

impl From<&FormConfig> for ValidationRules {
  fn from(config: &FormConfig) -> Self {
    Self {
      phone_digits: config.phone_digits,
      max_photo_bytes: config.max_photo_bytes,
    }
  }
}

fn is_email(value: &str) -> bool {
  static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
  EMAIL
    .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
    .as_ref()
    .is_some_and(|re| re.is_match(value))
}

/// Raw values typed into the form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeacherForm {
  pub last_name: String,
  pub first_name: String,
  pub email: String,
  pub phone: String,
  /// Path of a local image; empty keeps the current photo
  pub photo_path: String,
}

pub type FieldErrors = Vec<(Field, ValidationError)>;

impl TeacherForm {
  /// Form prefilled for editing an existing record.
  pub fn from_teacher(teacher: &Teacher) -> Self {
    Self {
      last_name: teacher.last_name.clone(),
      first_name: teacher.first_name.clone(),
      email: teacher.email.clone(),
      phone: teacher.phone.clone(),
      photo_path: String::new(),
    }
  }

  pub fn value(&self, field: Field) -> &str {
    match field {
      Field::LastName => &self.last_name,
      Field::FirstName => &self.first_name,
      Field::Email => &self.email,
      Field::Phone => &self.phone,
      Field::Photo => &self.photo_path,
    }
  }

  pub fn value_mut(&mut self, field: Field) -> &mut String {
    match field {
      Field::LastName => &mut self.last_name,
      Field::FirstName => &mut self.first_name,
      Field::Email => &mut self.email,
      Field::Phone => &mut self.phone,
      Field::Photo => &mut self.photo_path,
    }
  }

  /// Check every field and build the payload. All failures are reported at
  /// once, in field order.
  pub fn validate(&self, rules: &ValidationRules) -> Result<TeacherPayload, FieldErrors> {
    let mut errors = FieldErrors::new();

    for field in [Field::LastName, Field::FirstName] {
      if self.value(field).trim().is_empty() {
        errors.push((field, ValidationError::Required));
      }
    }

    let email = self.email.trim();
    if email.is_empty() {
      errors.push((Field::Email, ValidationError::Required));
    } else if !is_email(email) {
      errors.push((Field::Email, ValidationError::InvalidEmail));
    }

    let phone = self.phone.trim();
    if phone.is_empty() {
      errors.push((Field::Phone, ValidationError::Required));
    } else if !is_phone(phone, rules.phone_digits) {
      errors.push((
        Field::Phone,
        ValidationError::InvalidPhone {
          digits: rules.phone_digits,
        },
      ));
    }

    let path = self.photo_path.trim();
    let photo = if path.is_empty() {
      None
    } else {
      match load_photo(Path::new(path), rules.max_photo_bytes) {
        Ok(photo) => Some(photo),
        Err(err) => {
          errors.push((Field::Photo, err));
          None
        }
      }
    };

    if !errors.is_empty() {
      return Err(errors);
    }

    Ok(TeacherPayload {
      first_name: self.first_name.trim().to_string(),
      last_name: self.last_name.trim().to_string(),
      email: email.to_string(),
      phone: phone.to_string(),
      photo,
    })
  }
}

fn is_phone(value: &str, digits: usize) -> bool {
  value.len() == digits && value.bytes().all(|b| b.is_ascii_digit())
}

/// Read an image file for upload. The size is checked before reading.
pub fn load_photo(path: &Path, max_bytes: u64) -> Result<PhotoUpload, ValidationError> {
  let unreadable = |e: std::io::Error| ValidationError::PhotoUnreadable {
    reason: e.to_string(),
  };

  let metadata = std::fs::metadata(path).map_err(unreadable)?;
  if !metadata.is_file() {
    return Err(ValidationError::PhotoUnreadable {
      reason: "not a file".to_string(),
    });
  }
  if metadata.len() > max_bytes {
    return Err(ValidationError::PhotoTooLarge { max: max_bytes });
  }

  let mime = mime_guess::from_path(path).first_or_octet_stream();
  if mime.type_() != mime_guess::mime::IMAGE {
    return Err(ValidationError::PhotoNotImage {
      mime: mime.essence_str().to_string(),
    });
  }

  let bytes = std::fs::read(path).map_err(unreadable)?;
  let file_name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "photo".to_string());

  Ok(PhotoUpload {
    file_name,
    mime: mime.essence_str().to_string(),
    bytes,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::school::testing::teacher;
  use std::path::PathBuf;

  fn filled() -> TeacherForm {
    TeacherForm {
      last_name: " Ben Salah ".to_string(),
      first_name: "Amira".to_string(),
      email: "amira@ecole.tn".to_string(),
      phone: "22123456".to_string(),
      photo_path: String::new(),
    }
  }

  fn temp_file(name: &str, len: usize) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gradedesk-form-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, vec![0u8; len]).unwrap();
    path
  }

  fn fields(errors: &FieldErrors) -> Vec<Field> {
    errors.iter().map(|(field, _)| *field).collect()
  }

  #[test]
  fn test_valid_form_builds_trimmed_payload() {
    let payload = filled().validate(&ValidationRules::default()).unwrap();
    assert_eq!(payload.last_name, "Ben Salah");
    assert_eq!(payload.phone, "22123456");
    assert!(payload.photo.is_none());
  }

  #[test]
  fn test_empty_form_reports_every_required_field() {
    let errors = TeacherForm::default()
      .validate(&ValidationRules::default())
      .unwrap_err();
    assert_eq!(
      fields(&errors),
      vec![Field::LastName, Field::FirstName, Field::Email, Field::Phone]
    );
    assert!(errors.iter().all(|(_, e)| *e == ValidationError::Required));
  }

  #[test]
  fn test_rejects_malformed_email() {
    for email in ["amira", "amira@ecole", "a mira@ecole.tn", "@ecole.tn"] {
      let form = TeacherForm {
        email: email.to_string(),
        ..filled()
      };
      let errors = form.validate(&ValidationRules::default()).unwrap_err();
      assert_eq!(errors, vec![(Field::Email, ValidationError::InvalidEmail)], "{}", email);
    }
  }

  #[test]
  fn test_phone_digit_count_is_configurable() {
    let form = TeacherForm {
      phone: "2212345".to_string(),
      ..filled()
    };
    let errors = form.validate(&ValidationRules::default()).unwrap_err();
    assert_eq!(
      errors,
      vec![(Field::Phone, ValidationError::InvalidPhone { digits: 8 })]
    );

    let rules = ValidationRules {
      phone_digits: 7,
      ..ValidationRules::default()
    };
    assert!(form.validate(&rules).is_ok());

    let form = TeacherForm {
      phone: "2212345a".to_string(),
      ..filled()
    };
    assert!(form.validate(&ValidationRules::default()).is_err());
  }

  #[test]
  fn test_photo_is_loaded_with_guessed_mime() {
    let path = temp_file("portrait.png", 64);
    let form = TeacherForm {
      photo_path: path.display().to_string(),
      ..filled()
    };

    let photo = form
      .validate(&ValidationRules::default())
      .unwrap()
      .photo
      .unwrap();

    assert_eq!(photo.file_name, "portrait.png");
    assert_eq!(photo.mime, "image/png");
    assert_eq!(photo.bytes.len(), 64);
  }

  #[test]
  fn test_photo_over_limit_is_rejected() {
    let path = temp_file("large.jpg", 2048);
    let err = load_photo(&path, 1024).unwrap_err();
    assert_eq!(err, ValidationError::PhotoTooLarge { max: 1024 });
  }

  #[test]
  fn test_non_image_photo_is_rejected() {
    let path = temp_file("notes.pdf", 16);
    let err = load_photo(&path, 1024).unwrap_err();
    assert_eq!(
      err,
      ValidationError::PhotoNotImage {
        mime: "application/pdf".to_string()
      }
    );
  }

  #[test]
  fn test_missing_photo_is_unreadable() {
    let err = load_photo(Path::new("/nonexistent/gradedesk/photo.png"), 1024).unwrap_err();
    assert!(matches!(err, ValidationError::PhotoUnreadable { .. }));
  }

  #[test]
  fn test_edit_form_starts_from_record() {
    let form = TeacherForm::from_teacher(&teacher("7", "Jlassi", "Sonia"));
    assert_eq!(form.value(Field::LastName), "Jlassi");
    assert_eq!(form.value(Field::Email), "sonia@ecole.tn");
    assert!(form.photo_path.is_empty());
  }
}
