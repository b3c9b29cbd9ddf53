use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::form::{Field, FieldErrors, TeacherForm, ValidationError, ValidationRules};
use crate::school::{Teacher, TeacherPayload};
use crate::ui::renderfns::format_bytes;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
  Create,
  Edit {
    id: String,
    name: String,
    registration_code: String,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// Values passed validation
  Submit(TeacherPayload),
  Cancel,
}

/// Modal for creating or editing a teacher
#[derive(Debug, Clone)]
pub struct TeacherFormModal {
  mode: FormMode,
  inputs: Vec<TextInput>,
  focus: usize,
  errors: FieldErrors,
  rules: ValidationRules,
  submitting: bool,
}

impl TeacherFormModal {
  pub fn create(rules: ValidationRules) -> Self {
    Self::with_values(FormMode::Create, &TeacherForm::default(), rules)
  }

  pub fn edit(teacher: &Teacher, rules: ValidationRules) -> Self {
    let mode = FormMode::Edit {
      id: teacher.id.clone(),
      name: teacher.full_name(),
      registration_code: teacher.registration_code.clone(),
    };
    Self::with_values(mode, &TeacherForm::from_teacher(teacher), rules)
  }

  fn with_values(mode: FormMode, values: &TeacherForm, rules: ValidationRules) -> Self {
    Self {
      mode,
      inputs: Field::ALL
        .iter()
        .map(|f| TextInput::with_value(values.value(*f)))
        .collect(),
      focus: 0,
      errors: FieldErrors::new(),
      rules,
      submitting: false,
    }
  }

  pub fn mode(&self) -> &FormMode {
    &self.mode
  }

  pub fn focused(&self) -> Field {
    Field::ALL[self.focus]
  }

  #[cfg(test)]
  pub fn is_submitting(&self) -> bool {
    self.submitting
  }

  /// Lock the form while a save is running, unlock it when it fails.
  pub fn set_submitting(&mut self, submitting: bool) {
    self.submitting = submitting;
  }

  pub fn values(&self) -> TeacherForm {
    let mut form = TeacherForm::default();
    for (field, input) in Field::ALL.iter().zip(&self.inputs) {
      *form.value_mut(*field) = input.value().to_string();
    }
    form
  }

  pub fn error_for(&self, field: Field) -> Option<&ValidationError> {
    self
      .errors
      .iter()
      .find(|(f, _)| *f == field)
      .map(|(_, e)| e)
  }

  fn move_focus(&mut self, forward: bool) {
    let len = Field::ALL.len();
    self.focus = if forward {
      (self.focus + 1) % len
    } else {
      (self.focus + len - 1) % len
    };
  }

  fn submit(&mut self) -> KeyResult<FormEvent> {
    match self.values().validate(&self.rules) {
      Ok(payload) => {
        self.errors.clear();
        KeyResult::Event(FormEvent::Submit(payload))
      }
      Err(errors) => {
        if let Some(pos) = errors
          .first()
          .and_then(|(field, _)| Field::ALL.iter().position(|f| f == field))
        {
          self.focus = pos;
        }
        self.errors = errors;
        KeyResult::Handled
      }
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if self.submitting {
      return KeyResult::Handled;
    }

    match key.code {
      KeyCode::Esc => return KeyResult::Event(FormEvent::Cancel),
      KeyCode::Tab | KeyCode::Down => {
        self.move_focus(true);
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.move_focus(false);
        return KeyResult::Handled;
      }
      KeyCode::Enter => return self.submit(),
      _ => {}
    }

    let field = self.focused();
    if self.inputs[self.focus].handle_key(key) == InputResult::Consumed {
      self.errors.retain(|(f, _)| *f != field);
    }
    // The modal owns the keyboard while open
    KeyResult::Handled
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = (area.width * 70 / 100).clamp(40, 72).min(area.width);
    let height = 16.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let title = match &self.mode {
      FormMode::Create => " New teacher ".to_string(),
      FormMode::Edit { name, .. } => format!(" Edit {} ", name),
    };
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(title);
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let label_style = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    if let FormMode::Edit {
      registration_code, ..
    } = &self.mode
    {
      lines.push(Line::from(vec![
        Span::styled(format!("{:<12}", "Reg. code"), label_style),
        Span::raw(registration_code.as_str()),
      ]));
    }

    for (i, field) in Field::ALL.iter().enumerate() {
      let focused = i == self.focus;
      let value = self.inputs[i].value();
      let mut spans = vec![
        Span::styled(
          format!("{:<12}", field.label()),
          if focused {
            Style::default().fg(Color::Cyan).bold()
          } else {
            label_style
          },
        ),
        Span::raw(value.to_string()),
      ];
      if focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
      }
      lines.push(Line::from(spans));

      if let Some(err) = self.error_for(*field) {
        lines.push(Line::from(Span::styled(
          format!("{:<12}{}", "", err),
          Style::default().fg(Color::Red),
        )));
      } else if *field == Field::Photo {
        if let Some(preview) = photo_preview(value) {
          lines.push(Line::from(Span::styled(
            format!("{:<12}{}", "", preview),
            label_style,
          )));
        }
      }
    }

    lines.push(Line::from(""));
    lines.push(if self.submitting {
      Line::from(Span::styled("Saving...", Style::default().fg(Color::Yellow)))
    } else {
      Line::from(vec![
        Span::styled("<tab>", Style::default().fg(Color::Cyan)),
        Span::styled(" next   ", label_style),
        Span::styled("<enter>", Style::default().fg(Color::Cyan)),
        Span::styled(" save   ", label_style),
        Span::styled("<esc>", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", label_style),
      ])
    });

    frame.render_widget(Paragraph::new(lines), inner);
  }
}

/// One-line summary of the file at `path`: name, guessed type and size.
fn photo_preview(path: &str) -> Option<String> {
  let path = Path::new(path.trim());
  let metadata = std::fs::metadata(path).ok()?;
  let name = path.file_name()?.to_string_lossy();
  let mime = mime_guess::from_path(path).first_or_octet_stream();
  Some(format!(
    "{} · {} · {}",
    name,
    mime.essence_str(),
    format_bytes(metadata.len())
  ))
}
