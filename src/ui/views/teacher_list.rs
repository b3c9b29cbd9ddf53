use crate::cache::FetchStatus;
use crate::form::ValidationRules;
use crate::listing::{project, ListFilter, SortOrder};
use crate::mutation::{Confirmation, MutationError};
use crate::query::{CollectionQuery, Task};
use crate::school::{CachedCollection, RemoteCollection, Teacher, TeacherPayload};
use crate::ui::components::{
  ConfirmDialog, ConfirmEvent, FormEvent, FormMode, KeyResult, SearchEvent, SearchInput,
  TeacherFormModal, Toasts,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::TeacherDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};
use tracing::debug;

type MutationTask = Task<Result<Confirmation<Teacher>, MutationError>>;

/// Searchable, sortable list of teachers with create, edit and delete.
pub struct TeacherListView<C: RemoteCollection<Teacher>> {
  query: CollectionQuery<Teacher, C>,
  table_state: TableState,
  search: SearchInput,
  filter: ListFilter,
  order: SortOrder,
  rules: ValidationRules,
  form: Option<TeacherFormModal>,
  save: Option<MutationTask>,
  confirm: Option<ConfirmDialog<String>>,
  deletes: Vec<MutationTask>,
  toasts: Toasts,
  /// Last fetch error already shown as a toast
  reported_error: Option<String>,
}

impl<C: RemoteCollection<Teacher>> TeacherListView<C> {
  pub fn new(source: CachedCollection<Teacher, C>, rules: ValidationRules) -> Self {
    Self {
      query: CollectionQuery::new(source),
      table_state: TableState::default(),
      search: SearchInput::new(),
      filter: ListFilter::default(),
      order: SortOrder::default(),
      rules,
      form: None,
      save: None,
      confirm: None,
      deletes: Vec::new(),
      toasts: Toasts::new(),
      reported_error: None,
    }
  }

  fn rows(&self) -> Vec<&Teacher> {
    project(self.query.data(), &self.filter, self.order)
  }

  fn selected(&self) -> Option<&Teacher> {
    let index = self.table_state.selected().unwrap_or(0);
    self.rows().get(index).copied()
  }

  fn move_selection(&mut self, forward: bool) {
    let len = self.rows().len();
    if len == 0 {
      return;
    }
    let current = self.table_state.selected().unwrap_or(0);
    let next = if forward {
      (current + 1).min(len - 1)
    } else {
      current.saturating_sub(1)
    };
    self.table_state.select(Some(next));
  }

  fn submit(&mut self, payload: TeacherPayload) {
    let Some(form) = self.form.as_mut() else {
      return;
    };
    let source = self.query.source().clone();
    let task = match form.mode().clone() {
      FormMode::Create => Task::spawn(async move { source.create(payload).await }),
      FormMode::Edit { id, .. } => Task::spawn(async move { source.update(id, payload).await }),
    };
    form.set_submitting(true);
    self.save = Some(task);
  }

  fn delete(&mut self, id: String) {
    debug!(id = %id, "delete confirmed");
    let source = self.query.source().clone();
    self
      .deletes
      .push(Task::spawn(async move { source.delete(id).await }));
  }

  fn poll_mutations(&mut self) {
    if let Some(result) = self.save.as_mut().and_then(|task| task.poll()) {
      self.save = None;
      match result {
        Ok(confirmation) => {
          self.toasts.success(confirmation.message);
          self.form = None;
        }
        Err(err) => {
          self.toasts.error(err.message);
          if let Some(form) = self.form.as_mut() {
            form.set_submitting(false);
          }
        }
      }
    }

    let mut finished = Vec::new();
    self.deletes.retain_mut(|task| match task.poll() {
      Some(result) => {
        finished.push(result);
        false
      }
      None => true,
    });
    for result in finished {
      match result {
        Ok(confirmation) => self.toasts.success(confirmation.message),
        Err(err) => self.toasts.error(err.message),
      }
    }
  }

  /// Show a failed fetch once, as a toast.
  fn report_fetch_error(&mut self) {
    let state = self.query.state();
    if state.status != FetchStatus::Error {
      self.reported_error = None;
      return;
    }
    if self.reported_error != state.last_error {
      self.reported_error = state.last_error.clone();
      if let Some(message) = &self.reported_error {
        self.toasts.error(message.clone());
      }
    }
  }

  fn title(&self, shown: usize) -> String {
    let state = self.query.state();
    let total = state.items().len();
    let count = if self.filter.is_empty() {
      format!("{}", total)
    } else {
      format!("{}/{}", shown, total)
    };
    let mut title = format!(" Teachers ({}) · {} ", count, self.order.label());
    if !self.filter.is_empty() {
      title.push_str(&format!("· /{} ", self.filter.query()));
    }
    match state.status {
      FetchStatus::Loading => title.push_str("(loading...) "),
      FetchStatus::Fetching => title.push_str("(refreshing...) "),
      FetchStatus::Error => {
        let message = state.last_error.as_deref().unwrap_or("unknown error");
        title.push_str(&format!("(error: {}) ", truncate(message, 40)));
      }
      FetchStatus::Idle => {}
    }
    title
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.rows().len();
    ensure_valid_selection(&mut self.table_state, len);

    let block = Block::default()
      .title(self.title(len))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let state = self.query.state();
      let content = if state.snapshot.is_none() && state.is_loading() {
        "Loading teachers...".to_string()
      } else if state.snapshot.is_none() && state.is_error() {
        format!(
          "Failed to load teachers: {}. Press 'r' to retry.",
          state.last_error.as_deref().unwrap_or("unknown error")
        )
      } else if !self.filter.is_empty() {
        format!("No teacher matches '{}'.", self.filter.query())
      } else {
        "No teachers yet. Press 'n' to add one.".to_string()
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let header = Row::new(["Reg. code", "Last name", "First name", "Email", "Phone", "Created"])
      .style(Style::default().fg(Color::Yellow).bold());

    let rows: Vec<Row> = self
      .rows()
      .into_iter()
      .map(|t| {
        let created = t
          .created_at
          .map(|d| d.format("%Y-%m-%d").to_string())
          .unwrap_or_else(|| "-".to_string());
        Row::new(vec![
          Span::styled(t.registration_code.clone(), Style::default().fg(Color::Cyan)),
          Span::raw(truncate(&t.last_name, 20)),
          Span::raw(truncate(&t.first_name, 18)),
          Span::raw(truncate(&t.email, 32)),
          Span::raw(t.phone.clone()),
          Span::styled(created, Style::default().fg(Color::DarkGray)),
        ])
      })
      .collect();

    let widths = [
      Constraint::Length(10),
      Constraint::Length(20),
      Constraint::Length(18),
      Constraint::Min(16),
      Constraint::Length(12),
      Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

impl<C: RemoteCollection<Teacher>> View for TeacherListView<C> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Overlays first, innermost wins
    if let Some(form) = self.form.as_mut() {
      match form.handle_key(key) {
        KeyResult::Event(FormEvent::Submit(payload)) => self.submit(payload),
        KeyResult::Event(FormEvent::Cancel) => self.form = None,
        KeyResult::Handled | KeyResult::NotHandled => {}
      }
      return ViewAction::None;
    }

    if let Some(dialog) = self.confirm.as_mut() {
      match dialog.handle_key(key) {
        KeyResult::Event(ConfirmEvent::Confirmed(id)) => {
          self.confirm = None;
          self.delete(id);
        }
        KeyResult::Event(ConfirmEvent::Cancelled) => self.confirm = None,
        KeyResult::Handled | KeyResult::NotHandled => {}
      }
      return ViewAction::None;
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(query)) => {
        self.filter.set_query(&query);
        self.table_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(true),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(false),
      KeyCode::Char('s') => self.order = self.order.next(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('n') => self.form = Some(TeacherFormModal::create(self.rules)),
      KeyCode::Char('e') => {
        let rules = self.rules;
        if let Some(form) = self.selected().map(|t| TeacherFormModal::edit(t, rules)) {
          self.form = Some(form);
        }
      }
      KeyCode::Char('d') => {
        let dialog = self.selected().map(|t| {
          ConfirmDialog::new(format!("Delete teacher {}?", t.full_name()), t.id.clone())
        });
        if dialog.is_some() {
          self.confirm = dialog;
        }
      }
      KeyCode::Enter => {
        if let Some(teacher) = self.selected().cloned() {
          return ViewAction::Push(Box::new(TeacherDetailView::new(teacher)));
        }
      }
      KeyCode::Esc if !self.filter.is_empty() => {
        self.search.clear();
        self.filter.set_query("");
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.search.render_overlay(frame, area);
    if let Some(form) = &self.form {
      form.render(frame, area);
    }
    if let Some(dialog) = &self.confirm {
      dialog.render(frame, area);
    }
    self.toasts.render(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Teachers".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.report_fetch_error();
    self.poll_mutations();
    let len = self.rows().len();
    ensure_valid_selection(&mut self.table_state, len);
    self.toasts.expire();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("n", "new").with_priority(10),
      ShortcutInfo::new("e", "edit").with_priority(20),
      ShortcutInfo::new("d", "delete").with_priority(30),
      ShortcutInfo::new("/", "search").with_priority(40),
      ShortcutInfo::new("s", "sort").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CachePolicy, CollectionCache};
  use crate::school::testing::{teacher, FakeRemote};
  use crossterm::event::KeyModifiers;
  use std::time::Duration;

  async fn view(records: Vec<Teacher>) -> TeacherListView<FakeRemote> {
    view_with(FakeRemote::with_records(records)).await
  }

  async fn view_with(remote: FakeRemote) -> TeacherListView<FakeRemote> {
    let source = CachedCollection::new(remote, CollectionCache::new(CachePolicy::default()));
    let mut view = TeacherListView::new(source, ValidationRules::default());
    settle(&mut view).await;
    view
  }

  async fn settle(view: &mut TeacherListView<FakeRemote>) {
    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();
  }

  fn press(view: &mut TeacherListView<FakeRemote>, keys: &str) {
    for c in keys.chars() {
      view.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    }
  }

  fn press_code(view: &mut TeacherListView<FakeRemote>, code: KeyCode) -> ViewAction {
    view.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
  }

  fn ids(view: &TeacherListView<FakeRemote>) -> Vec<String> {
    view.rows().iter().map(|t| t.id.clone()).collect()
  }

  fn toasts(view: &TeacherListView<FakeRemote>) -> Vec<String> {
    view.toasts.iter().map(|t| t.message.clone()).collect()
  }

  fn two_teachers() -> Vec<Teacher> {
    vec![teacher("1", "Ben Salah", "Amira"), teacher("2", "Trabelsi", "Karim")]
  }

  #[tokio::test(start_paused = true)]
  async fn test_confirmed_delete_removes_row() {
    let mut view = view(two_teachers()).await;
    assert_eq!(ids(&view), vec!["1", "2"]);

    press(&mut view, "jd");
    assert!(view.confirm.is_some());
    press(&mut view, "y");
    assert!(view.confirm.is_none());

    settle(&mut view).await;
    assert_eq!(ids(&view), vec!["1"]);
    assert_eq!(toasts(&view), vec!["deleted"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_cancelled_delete_keeps_row() {
    let mut view = view(two_teachers()).await;

    press(&mut view, "dn");
    settle(&mut view).await;

    assert_eq!(ids(&view), vec!["1", "2"]);
    assert_eq!(view.query.source().remote().list_calls(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_delete_restores_row_and_reports() {
    let remote = FakeRemote::with_records(two_teachers());
    remote.fail_delete_of("2");
    let mut view = view_with(remote).await;

    press(&mut view, "jdy");
    settle(&mut view).await;

    assert_eq!(ids(&view), vec!["1", "2"]);
    assert_eq!(toasts(&view), vec!["Cannot delete a teacher with grades"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_search_and_sort() {
    let mut view = view(two_teachers()).await;

    press(&mut view, "s");
    assert_eq!(ids(&view), vec!["2", "1"]);

    press(&mut view, "/tra");
    assert_eq!(ids(&view), vec!["2"]);
    press_code(&mut view, KeyCode::Enter);
    assert_eq!(ids(&view), vec!["2"]);

    press_code(&mut view, KeyCode::Esc);
    assert_eq!(ids(&view), vec!["2", "1"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_create_through_form() {
    let mut view = view(two_teachers()).await;

    press(&mut view, "n");
    press(&mut view, "Jlassi");
    press_code(&mut view, KeyCode::Tab);
    press(&mut view, "Sonia");
    press_code(&mut view, KeyCode::Tab);
    press(&mut view, "sonia@ecole.tn");
    press_code(&mut view, KeyCode::Tab);
    press(&mut view, "22123456");
    press_code(&mut view, KeyCode::Enter);
    assert!(view.form.as_ref().unwrap().is_submitting());

    settle(&mut view).await;
    assert!(view.form.is_none());
    assert_eq!(toasts(&view), vec!["created"]);

    settle(&mut view).await;
    assert_eq!(ids(&view), vec!["1", "3", "2"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalid_form_is_not_sent() {
    let mut view = view(two_teachers()).await;

    press(&mut view, "n");
    press_code(&mut view, KeyCode::Enter);
    settle(&mut view).await;

    assert!(view.save.is_none());
    assert!(view.form.is_some());
    assert!(toasts(&view).is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_enter_opens_detail_and_q_quits() {
    let mut view = view(two_teachers()).await;

    assert!(matches!(press_code(&mut view, KeyCode::Enter), ViewAction::Push(_)));
    assert!(matches!(press_code(&mut view, KeyCode::Char('q')), ViewAction::Pop));
  }
}
