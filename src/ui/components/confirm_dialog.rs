use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Yes/no prompt that carries the value it is asking about
#[derive(Debug, Clone)]
pub struct ConfirmDialog<T> {
  prompt: String,
  value: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmEvent<T> {
  Confirmed(T),
  Cancelled,
}

impl<T: Clone> ConfirmDialog<T> {
  pub fn new(prompt: impl Into<String>, value: T) -> Self {
    Self {
      prompt: prompt.into(),
      value,
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ConfirmEvent<T>> {
    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
        KeyResult::Event(ConfirmEvent::Confirmed(self.value.clone()))
      }
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
        KeyResult::Event(ConfirmEvent::Cancelled)
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = (area.width / 2).clamp(30, 60).min(area.width);
    let height = 5.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let dialog_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, dialog_area);

    let text = vec![
      Line::from(self.prompt.as_str()),
      Line::from(vec![
        Span::styled("<y>", Style::default().fg(Color::Cyan)),
        Span::styled(" yes   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<n>", Style::default().fg(Color::Cyan)),
        Span::styled(" no", Style::default().fg(Color::DarkGray)),
      ]),
    ];
    let paragraph = Paragraph::new(text)
      .wrap(Wrap { trim: true })
      .alignment(Alignment::Center)
      .block(
        Block::default()
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::Red))
          .title(" Confirm "),
      );
    frame.render_widget(paragraph, dialog_area);
  }
}
