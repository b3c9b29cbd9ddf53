use crate::school::{PhotoRef, Teacher};
use crate::ui::renderfns::format_bytes;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Read-only card for one teacher, as it was when opened
pub struct TeacherDetailView {
  teacher: Teacher,
}

impl TeacherDetailView {
  pub fn new(teacher: Teacher) -> Self {
    Self { teacher }
  }

  fn lines(&self) -> Vec<Line<'_>> {
    let t = &self.teacher;
    let label = |text: &'static str| {
      Span::styled(format!("{:<14}", text), Style::default().fg(Color::DarkGray))
    };

    let photo = match &t.photo {
      Some(PhotoRef::Url(url)) => url.clone(),
      Some(PhotoRef::Bytes(bytes)) => {
        format!("embedded image ({})", format_bytes(bytes.len() as u64))
      }
      None => "none".to_string(),
    };
    let created = t
      .created_at
      .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
      .unwrap_or_else(|| "-".to_string());

    vec![
      Line::from(vec![
        label("Reg. code"),
        Span::styled(t.registration_code.as_str(), Style::default().fg(Color::Cyan)),
      ]),
      Line::from(vec![label("Last name"), Span::raw(t.last_name.as_str())]),
      Line::from(vec![label("First name"), Span::raw(t.first_name.as_str())]),
      Line::from(vec![label("Email"), Span::raw(t.email.as_str())]),
      Line::from(vec![label("Phone"), Span::raw(t.phone.as_str())]),
      Line::from(vec![label("Photo"), Span::raw(photo)]),
      Line::from(vec![label("Created"), Span::raw(created)]),
      Line::from(vec![
        label("Id"),
        Span::styled(t.id.as_str(), Style::default().fg(Color::DarkGray)),
      ]),
    ]
  }
}

impl View for TeacherDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.teacher.full_name()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let paragraph = Paragraph::new(self.lines())
      .block(block)
      .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.teacher.full_name()
  }
}
