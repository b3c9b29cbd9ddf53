use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Success,
  Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
  pub kind: ToastKind,
  pub message: String,
  shown_at: Instant,
}

/// Transient notifications stacked in the bottom-right corner
#[derive(Debug, Default)]
pub struct Toasts {
  items: VecDeque<Toast>,
}

impl Toasts {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn success(&mut self, message: impl Into<String>) {
    self.push(ToastKind::Success, message.into());
  }

  pub fn error(&mut self, message: impl Into<String>) {
    self.push(ToastKind::Error, message.into());
  }

  fn push(&mut self, kind: ToastKind, message: String) {
    if self.items.len() == MAX_TOASTS {
      self.items.pop_front();
    }
    self.items.push_back(Toast {
      kind,
      message,
      shown_at: Instant::now(),
    });
  }

  /// Drop toasts past their display time. Returns `true` if any were dropped.
  pub fn expire(&mut self) -> bool {
    let before = self.items.len();
    self.items.retain(|t| t.shown_at.elapsed() < TOAST_TTL);
    self.items.len() != before
  }

  #[cfg(test)]
  pub fn iter(&self) -> impl Iterator<Item = &Toast> {
    self.items.iter()
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = (area.width / 3).clamp(24, 48).min(area.width);
    let mut bottom = area.bottom();

    for toast in self.items.iter().rev() {
      let height = 3;
      if bottom < area.y + height {
        break;
      }
      bottom -= height;
      let toast_area = Rect::new(area.right().saturating_sub(width + 1), bottom, width, height)
        .intersection(area);

      let (color, title) = match toast.kind {
        ToastKind::Success => (Color::Green, " ok "),
        ToastKind::Error => (Color::Red, " error "),
      };
      frame.render_widget(Clear, toast_area);
      let paragraph = Paragraph::new(toast.message.as_str())
        .wrap(Wrap { trim: true })
        .block(
          Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(title),
        );
      frame.render_widget(paragraph, toast_area);
    }
  }
}
