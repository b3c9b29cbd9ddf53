use crate::cache::{Cacheable, CollectionCache};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::form::ValidationRules;
use crate::school::{CachedCollection, HttpCollection, Teacher};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::TeacherListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,
  title: String,
  base_url: String,
  cache: CollectionCache<Teacher>,
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config) -> Result<Self> {
    let remote = HttpCollection::<Teacher>::new(&config.api)?;
    let base_url = remote.base_url().to_string();
    let cache = CollectionCache::new(config.cache.policy());
    let teachers = CachedCollection::new(remote, cache.clone());
    let root = TeacherListView::new(teachers, ValidationRules::from(&config.form));

    Ok(Self {
      view_stack: vec![Box::new(root)],
      title: config.display_title(),
      base_url,
      cache,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    info!(url = %self.base_url, "started");

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    info!("stopped");
    Ok(())
  }

  fn tick(&mut self) {
    let evicted = self.cache.gc();
    if evicted > 0 {
      debug!(evicted, entity = Teacher::entity_type(), "cache entries evicted");
    }
    for view in self.view_stack.iter_mut() {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let Some(view) = self.view_stack.last_mut() else {
      self.should_quit = true;
      return;
    };

    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => self.view_stack.push(next),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Current view
        Constraint::Length(1), // Breadcrumb
      ])
      .split(frame.area());

    let shortcuts = self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default();
    draw_header(frame, chunks[0], &self.title, &self.base_url, &shortcuts);

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1]);
    }

    let breadcrumb: Vec<String> = self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect();
    draw_footer(frame, chunks[2], &breadcrumb);
  }
}
