use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use tokio::sync::watch;

use crate::config::{Config, MissingConfig};
use crate::session::{self, LaunchParams, SessionConfig, SessionStore};
use crate::sync::{Notice, NoticeLevel, QueryState, SyncLayer};
use crate::todoist::{Project, Task};

use super::event::{self, AppEvent};
use super::form::TextInput;
use super::keymap::{Action, KeyMap};
use super::theme::Theme;
use super::ui::{self, RowHit};

pub const MISSING_FIELDS_MESSAGE: &str = "Please provide both API token and select a project";
pub const URL_COPIED_MESSAGE: &str = "Widget URL copied to clipboard!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    List,
    Setup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    NewTask,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastStyle {
    Info,
    Success,
    Error,
}

impl From<NoticeLevel> for ToastStyle {
    fn from(level: NoticeLevel) -> Self {
        match level {
            NoticeLevel::Info => ToastStyle::Info,
            NoticeLevel::Success => ToastStyle::Success,
            NoticeLevel::Error => ToastStyle::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub style: ToastStyle,
    pub shown_at: Instant,
}

/// Keyboard highlight and add-task input of the list screen.
#[derive(Debug, Default)]
pub struct ListView {
    pub active_index: usize,
    pub input: TextInput,
}

impl ListView {
    pub fn move_next(&mut self, len: usize) {
        if len > 0 {
            self.active_index = (self.active_index + 1).min(len - 1);
        }
    }

    pub fn move_prev(&mut self) {
        self.active_index = self.active_index.saturating_sub(1);
    }

    /// Keep the highlight inside `[0, len-1]`, or 0 for an empty list.
    pub fn clamp(&mut self, len: usize) {
        self.active_index = self.active_index.min(len.saturating_sub(1));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupField {
    Token,
    Project,
    Generate,
}

impl SetupField {
    pub fn next(self) -> Self {
        match self {
            Self::Token => Self::Project,
            Self::Project => Self::Generate,
            Self::Generate => Self::Token,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Token => Self::Generate,
            Self::Project => Self::Token,
            Self::Generate => Self::Project,
        }
    }
}

/// State of the setup screen.
#[derive(Debug)]
pub struct SetupForm {
    pub field: SetupField,
    pub token: TextInput,
    pub project_id: String,
}

impl SetupForm {
    fn from_session(cfg: &SessionConfig) -> Self {
        Self {
            field: SetupField::Token,
            token: TextInput::with_value(cfg.api_token.as_str()),
            project_id: cfg.selected_project_id.clone(),
        }
    }

    /// Position of the selected project in `projects`.
    pub fn selected_index(&self, projects: &[Project]) -> Option<usize> {
        projects.iter().position(|p| p.id == self.project_id)
    }

    /// Move the selection by one row. The selection follows the highlight.
    fn move_selection(&mut self, projects: &[Project], down: bool) {
        if projects.is_empty() {
            return;
        }
        let next = match (self.selected_index(projects), down) {
            (None, _) => 0,
            (Some(i), true) => (i + 1).min(projects.len() - 1),
            (Some(i), false) => i.saturating_sub(1),
        };
        self.project_id.clone_from(&projects[next].id);
    }
}

/// Where generated widget URLs go.
pub trait ClipboardSink {
    fn copy(&mut self, text: &str) -> Result<()>;
}

/// The system clipboard. The handle is kept open because on X11 the
/// contents vanish once the owning handle is dropped.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl ClipboardSink for SystemClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new().context("clipboard unavailable")?);
        }
        if let Some(clipboard) = self.inner.as_mut() {
            clipboard
                .set_text(text.to_owned())
                .context("failed to write clipboard")?;
        }
        Ok(())
    }
}

pub struct App {
    pub config: Config,
    pub theme: Theme,
    pub keymap: KeyMap,
    pub session: SessionStore,
    pub sync: SyncLayer,
    clipboard: Box<dyn ClipboardSink>,
    session_rx: watch::Receiver<SessionConfig>,
    cache_rx: watch::Receiver<u64>,

    pub screen: Screen,
    pub input_mode: InputMode,
    pub list: ListView,
    pub setup: SetupForm,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    needs_redraw: bool,

    /// Frame area of the last draw, for mouse hit testing.
    pub last_area: Rect,
}

impl App {
    pub fn new(
        config: Config,
        session: SessionStore,
        mut sync: SyncLayer,
        clipboard: Box<dyn ClipboardSink>,
    ) -> Self {
        let current = session.current();
        sync.set_credential(&current.api_token);
        let session_rx = session.subscribe();
        let cache_rx = sync.subscribe();

        App {
            theme: config.theme.build(),
            keymap: KeyMap::default_keymap(),
            config,
            session,
            sync,
            clipboard,
            session_rx,
            cache_rx,
            screen: Screen::List,
            input_mode: InputMode::Normal,
            list: ListView::default(),
            setup: SetupForm::from_session(&current),
            toast: None,
            should_quit: false,
            needs_redraw: true,
            last_area: Rect::default(),
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let tick_rate = Duration::from_millis(self.config.tick_rate_ms.max(10));

        loop {
            self.update();

            if self.needs_redraw {
                terminal.draw(|frame| {
                    self.last_area = frame.area();
                    ui::draw(frame, self);
                })?;
                self.needs_redraw = false;
            }

            match event::poll(tick_rate)? {
                AppEvent::Key(key) => self.handle_key(key.code, key.modifiers),
                AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
                AppEvent::Resize => self.needs_redraw = true,
                AppEvent::Tick => {}
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    /// Fold background results and configuration changes into the UI state
    /// and issue whatever queries the current screen needs.
    pub fn update(&mut self) {
        for notice in self.sync.drain() {
            self.show_notice(notice);
        }

        if self.session_rx.has_changed().unwrap_or(false) {
            let cfg = self.session_rx.borrow_and_update().clone();
            self.sync.set_credential(&cfg.api_token);
            self.list.active_index = 0;
            self.needs_redraw = true;
        }

        let cfg = self.session.current();
        match self.screen {
            Screen::List => {
                self.sync.ensure_tasks(&cfg);
                if !self.sync.is_ready(&cfg) && cfg.has_token() {
                    self.sync.ensure_projects(&cfg.api_token);
                }
            }
            Screen::Setup => {
                let token = self.setup.token.value().to_string();
                self.sync.ensure_projects(&token);
            }
        }

        let len = self.visible_tasks().len();
        self.list.clamp(len);

        if self.cache_rx.has_changed().unwrap_or(false) {
            self.cache_rx.borrow_and_update();
            self.needs_redraw = true;
        }

        let ttl = Duration::from_secs(self.config.toast_seconds);
        if self.toast.as_ref().is_some_and(|t| t.shown_at.elapsed() >= ttl) {
            self.toast = None;
            self.needs_redraw = true;
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session_config(&self) -> SessionConfig {
        self.session.current()
    }

    pub fn task_state(&self) -> QueryState<'_, Task> {
        self.sync.tasks(&self.session.current())
    }

    /// Tasks currently shown, in service order.
    pub fn visible_tasks(&self) -> &[Task] {
        match self.task_state() {
            QueryState::Ready(tasks) => tasks,
            _ => &[],
        }
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.visible_tasks().get(self.list.active_index)
    }

    /// Projects for the token being edited on the setup screen.
    pub fn setup_projects(&self) -> QueryState<'_, Project> {
        self.sync.projects(self.setup.token.value())
    }

    // ── Notifications ────────────────────────────────────────────────

    pub fn show_toast(&mut self, message: impl Into<String>, style: ToastStyle) {
        self.toast = Some(Toast {
            message: message.into(),
            style,
            shown_at: Instant::now(),
        });
        self.needs_redraw = true;
    }

    pub fn show_notice(&mut self, notice: Notice) {
        self.show_toast(notice.message, notice.level.into());
    }

    // ── Keys ─────────────────────────────────────────────────────────

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        self.needs_redraw = true;
        match (self.screen, self.input_mode) {
            (_, InputMode::Help) => self.handle_help_key(code, modifiers),
            (Screen::Setup, _) => self.handle_setup_key(code, modifiers),
            (Screen::List, InputMode::NewTask) => self.handle_input_key(code, modifiers),
            (Screen::List, InputMode::Normal) => self.handle_list_key(code, modifiers),
        }
    }

    fn handle_help_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match self.keymap.lookup_list(code, modifiers) {
            Some(Action::Quit) if modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            Some(Action::ShowHelp | Action::DismissToast | Action::Quit) => {
                self.input_mode = InputMode::Normal;
            }
            _ => {}
        }
    }

    fn handle_list_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let Some(action) = self.keymap.lookup_list(code, modifiers) else {
            return;
        };
        match action {
            Action::Quit => self.should_quit = true,
            Action::ShowHelp => self.input_mode = InputMode::Help,
            Action::DismissToast => self.toast = None,
            Action::MoveDown => {
                let len = self.visible_tasks().len();
                self.list.move_next(len);
            }
            Action::MoveUp => self.list.move_prev(),
            Action::NewTask => self.input_mode = InputMode::NewTask,
            Action::CompleteTask => {
                if let Some(id) = self.active_task().map(|t| t.id.clone()) {
                    self.complete_task(&id);
                }
            }
            Action::DeleteTask => {
                if let Some(id) = self.active_task().map(|t| t.id.clone()) {
                    self.delete_task(&id);
                }
            }
            Action::Refresh => self.sync.refresh(),
            Action::OpenSetup => self.open_setup(),
            Action::NextField | Action::PrevField | Action::GenerateUrl | Action::Back => {}
        }
    }

    fn handle_input_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Enter => self.submit_new_task(),
            KeyCode::Esc => {
                self.list.input.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            _ => {
                self.list.input.handle_key(code, modifiers);
            }
        }
    }

    fn handle_setup_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if let Some(action) = self.keymap.lookup_setup(code, modifiers) {
            match action {
                Action::NextField => self.setup.field = self.setup.field.next(),
                Action::PrevField => self.setup.field = self.setup.field.prev(),
                Action::GenerateUrl => self.generate_url(),
                Action::Back => self.screen = Screen::List,
                Action::Quit => self.should_quit = true,
                _ => {}
            }
            return;
        }

        match self.setup.field {
            SetupField::Token => {
                if code == KeyCode::Enter {
                    self.setup.field = SetupField::Project;
                } else {
                    self.setup.token.handle_key(code, modifiers);
                }
            }
            SetupField::Project => match code {
                KeyCode::Down | KeyCode::Char('j') => self.move_project_selection(true),
                KeyCode::Up | KeyCode::Char('k') => self.move_project_selection(false),
                KeyCode::Enter => self.setup.field = SetupField::Generate,
                _ => {}
            },
            SetupField::Generate => {
                if matches!(code, KeyCode::Enter | KeyCode::Char(' ')) {
                    self.generate_url();
                }
            }
        }
    }

    fn move_project_selection(&mut self, down: bool) {
        let token = self.setup.token.value().to_string();
        if let QueryState::Ready(projects) = self.sync.projects(&token) {
            self.setup.move_selection(projects, down);
        }
    }

    // ── Mouse ────────────────────────────────────────────────────────

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.screen != Screen::List || self.input_mode == InputMode::Help {
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.needs_redraw = true;
                self.click(mouse.column, mouse.row);
            }
            MouseEventKind::ScrollDown => {
                self.needs_redraw = true;
                let len = self.visible_tasks().len();
                self.list.move_next(len);
            }
            MouseEventKind::ScrollUp => {
                self.needs_redraw = true;
                self.list.move_prev();
            }
            _ => {}
        }
    }

    fn click(&mut self, column: u16, row: u16) {
        let layout = ui::list_layout(self.last_area, self.input_mode == InputMode::NewTask);
        let tasks = self.visible_tasks();
        let offset = ui::scroll_offset(self.list.active_index, tasks.len(), layout.rows.height);
        let Some(hit) = ui::hit_test(layout.rows, offset, tasks.len(), column, row) else {
            return;
        };
        match hit {
            RowHit::Check(i) => {
                let id = tasks[i].id.clone();
                self.complete_task(&id);
            }
            RowHit::Delete(i) => {
                let id = tasks[i].id.clone();
                self.delete_task(&id);
            }
            RowHit::Row(i) => self.list.active_index = i,
        }
    }

    // ── Intents ──────────────────────────────────────────────────────

    /// Submit the add-task input. Blank input does nothing at all.
    fn submit_new_task(&mut self) {
        if self.list.input.is_blank() {
            return;
        }
        let cfg = self.session.current();
        if !self.sync.is_ready(&cfg) {
            self.handle_missing_config(&cfg);
            return;
        }

        let text = self.list.input.take();
        let project_id = if self.sync.is_local() {
            None
        } else {
            cfg.project_filter()
        };
        if let Err(e) = self.sync.add_task(&text, project_id) {
            self.show_toast(format!("Could not add task: {e}"), ToastStyle::Error);
        }
    }

    fn handle_missing_config(&mut self, cfg: &SessionConfig) {
        match self.config.missing_config {
            MissingConfig::Notice => {
                let message = if cfg.has_token() {
                    "Select a project first: press s to open setup"
                } else {
                    "Add your Todoist API token first: press s to open setup"
                };
                self.show_toast(message, ToastStyle::Info);
            }
            MissingConfig::Setup => self.open_setup(),
        }
    }

    fn complete_task(&mut self, task_id: &str) {
        if let Err(e) = self.sync.complete_task(task_id) {
            self.show_toast(format!("Could not complete task: {e}"), ToastStyle::Error);
        }
    }

    fn delete_task(&mut self, task_id: &str) {
        if let Err(e) = self.sync.delete_task(task_id) {
            self.show_toast(format!("Could not delete task: {e}"), ToastStyle::Error);
        }
    }

    pub fn open_setup(&mut self) {
        if self.sync.is_local() {
            self.show_toast("Running locally: nothing to set up", ToastStyle::Info);
            return;
        }
        self.setup = SetupForm::from_session(&self.session.current());
        self.input_mode = InputMode::Normal;
        self.screen = Screen::Setup;
    }

    /// Build the widget URL from the setup form, copy it and load it.
    fn generate_url(&mut self) {
        let token = self.setup.token.value().trim().to_string();
        let project_id = self.setup.project_id.trim().to_string();
        if token.is_empty() || project_id.is_empty() {
            self.show_toast(MISSING_FIELDS_MESSAGE, ToastStyle::Error);
            return;
        }

        let url = match session::widget_url(&self.config.widget_origin, &token, &project_id) {
            Ok(url) => url,
            Err(e) => {
                self.show_toast(format!("{e:#}"), ToastStyle::Error);
                return;
            }
        };

        match self.clipboard.copy(&url) {
            Ok(()) => self.show_toast(URL_COPIED_MESSAGE, ToastStyle::Success),
            Err(e) => {
                tracing::warn!(error = %e, "clipboard write failed");
                self.show_toast(
                    format!("Could not copy to clipboard. Widget URL: {url}"),
                    ToastStyle::Error,
                );
            }
        }

        if let Err(e) = self.load_url(&url) {
            self.show_toast(format!("{e:#}"), ToastStyle::Error);
            return;
        }
        self.screen = Screen::List;
    }

    /// Replace the running configuration with the one encoded in `url`.
    fn load_url(&mut self, url: &str) -> Result<()> {
        let params = LaunchParams::from_url(url)?;
        let next = SessionConfig {
            api_token: params.token.unwrap_or_default(),
            selected_project_id: params.project_id.unwrap_or_default(),
        };
        if self.session.replace(next)? {
            tracing::info!("session loaded from generated widget URL");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{CountingService, remote_sync};
    use crate::tui::test_helpers::{FakeClipboard, local_app, remote_app, session_store, settle};

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(code, KeyModifiers::NONE);
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    async fn add_via_input(app: &mut App, text: &str) {
        press(app, KeyCode::Char('a'));
        type_text(app, text);
        press(app, KeyCode::Enter);
        press(app, KeyCode::Esc);
        settle(app).await;
    }

    fn texts(app: &App) -> Vec<&str> {
        app.visible_tasks().iter().map(|t| t.text.as_str()).collect()
    }

    fn toast_text(app: &App) -> Option<&str> {
        app.toast.as_ref().map(|t| t.message.as_str())
    }

    #[tokio::test]
    async fn submit_adds_once_with_project_and_clears_input() {
        let svc = Arc::new(CountingService::default());
        let (mut app, _) = remote_app(&svc, "tok", "p1");
        settle(&mut app).await;

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.input_mode, InputMode::NewTask);
        type_text(&mut app, "Buy milk");
        press(&mut app, KeyCode::Enter);

        // Cleared before the service answers; the input stays open.
        assert_eq!(app.list.input.value(), "");
        assert_eq!(app.input_mode, InputMode::NewTask);

        settle(&mut app).await;
        assert_eq!(
            svc.added.lock().unwrap().as_slice(),
            [("Buy milk".to_string(), Some("p1".to_string()))]
        );
        assert_eq!(toast_text(&app), Some("Task added"));
        assert_eq!(texts(&app), ["Buy milk"]);
    }

    #[tokio::test]
    async fn blank_submit_does_nothing() {
        let svc = Arc::new(CountingService::default());
        let (mut app, _) = remote_app(&svc, "tok", "p1");
        settle(&mut app).await;
        let fetches = svc.list_tasks_calls.load(Ordering::SeqCst);

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        assert_eq!(svc.add_calls(), 0);
        assert_eq!(svc.list_tasks_calls.load(Ordering::SeqCst), fetches);
        assert!(app.toast.is_none());
    }

    #[tokio::test]
    async fn missing_credential_shows_notice_and_fetches_nothing() {
        let svc = Arc::new(CountingService::default());
        let (mut app, _) = remote_app(&svc, "", "");
        settle(&mut app).await;

        assert_eq!(app.task_state(), QueryState::NotReady);
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Stretch");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::List);
        assert_eq!(app.toast.as_ref().map(|t| t.style), Some(ToastStyle::Info));
        // Nothing was dispatched, so the text is still there.
        assert_eq!(app.list.input.value(), "Stretch");
        settle(&mut app).await;
        assert_eq!(svc.add_calls(), 0);
        assert_eq!(svc.list_tasks_calls.load(Ordering::SeqCst), 0);
        assert_eq!(svc.list_projects_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_project_can_redirect_to_setup() {
        let svc = Arc::new(CountingService::default());
        let (mut app, _) = remote_app(&svc, "tok", "");
        app.config.missing_config = MissingConfig::Setup;
        settle(&mut app).await;

        // The selector is populated while the list waits for a project.
        assert_eq!(svc.list_projects_calls.load(Ordering::SeqCst), 1);
        assert_eq!(svc.list_tasks_calls.load(Ordering::SeqCst), 0);

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "x");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Setup);
        assert!(matches!(app.setup_projects(), QueryState::Ready(p) if p.len() == 2));
    }

    #[tokio::test]
    async fn highlight_stays_in_bounds() {
        let mut app = local_app();
        for text in ["one", "two", "three"] {
            add_via_input(&mut app, text).await;
        }
        assert_eq!(texts(&app), ["one", "two", "three"]);

        for _ in 0..5 {
            press(&mut app, KeyCode::Char('j'));
        }
        assert_eq!(app.list.active_index, 2);
        for _ in 0..5 {
            press(&mut app, KeyCode::Up);
        }
        assert_eq!(app.list.active_index, 0);

        // Deleting the last row pulls the highlight back inside the list.
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('x'));
        settle(&mut app).await;
        assert_eq!(texts(&app), ["one", "two"]);
        assert_eq!(app.list.active_index, 1);
    }

    #[tokio::test]
    async fn keyboard_complete_acts_on_highlighted_row() {
        let mut app = local_app();
        add_via_input(&mut app, "one").await;
        add_via_input(&mut app, "two").await;

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        settle(&mut app).await;

        let tasks = app.visible_tasks();
        assert!(!tasks[0].completed);
        assert!(tasks[1].completed);
        assert_eq!(toast_text(&app), Some("Task completed"));
    }

    #[tokio::test]
    async fn clicks_hit_check_and_delete_controls() {
        let mut app = local_app();
        add_via_input(&mut app, "first").await;
        add_via_input(&mut app, "second").await;
        app.last_area = Rect::new(0, 0, 40, 12);
        let rows = ui::list_layout(app.last_area, false).rows;

        let click = |column, row| MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        };

        // Check control of the second row; the highlight stays on the first.
        app.handle_mouse(click(rows.x + 3, rows.y + 1));
        settle(&mut app).await;
        assert!(app.visible_tasks()[1].completed);
        assert_eq!(app.list.active_index, 0);

        // Delete control of the first row.
        app.handle_mouse(click(rows.right() - 2, rows.y));
        settle(&mut app).await;
        assert_eq!(texts(&app), ["second"]);

        // Clicking below the last row does nothing.
        app.handle_mouse(click(rows.x + 3, rows.y + 5));
        settle(&mut app).await;
        assert_eq!(texts(&app), ["second"]);
    }

    #[tokio::test]
    async fn generate_copies_and_loads_url() {
        let svc = Arc::new(CountingService::default());
        let (mut app, clipboard) = remote_app(&svc, "", "");
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.screen, Screen::Setup);

        type_text(&mut app, "T");
        settle(&mut app).await;
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.setup.project_id, "p2");
        press(&mut app, KeyCode::Up);
        assert_eq!(app.setup.project_id, "p1");

        app.handle_key(KeyCode::Char('g'), KeyModifiers::CONTROL);

        assert_eq!(
            clipboard.copied.lock().unwrap().as_slice(),
            ["http://localhost:5173/?token=T&projectId=p1".to_string()]
        );
        assert_eq!(toast_text(&app), Some(URL_COPIED_MESSAGE));
        assert_eq!(app.screen, Screen::List);
        assert_eq!(
            app.session_config(),
            SessionConfig {
                api_token: "T".into(),
                selected_project_id: "p1".into(),
            }
        );

        settle(&mut app).await;
        assert_eq!(app.task_state(), QueryState::Ready(&[]));
    }

    #[tokio::test]
    async fn generate_requires_both_fields() {
        let svc = Arc::new(CountingService::default());
        let (mut app, clipboard) = remote_app(&svc, "", "");
        press(&mut app, KeyCode::Char('s'));
        type_text(&mut app, "T");
        app.handle_key(KeyCode::Char('g'), KeyModifiers::CONTROL);

        assert_eq!(toast_text(&app), Some(MISSING_FIELDS_MESSAGE));
        assert_eq!(app.screen, Screen::Setup);
        assert!(clipboard.copied.lock().unwrap().is_empty());
        assert_eq!(app.session_config(), SessionConfig::default());
    }

    #[tokio::test]
    async fn clipboard_failure_shows_the_url() {
        let svc = Arc::new(CountingService::default());
        let mut app = App::new(
            Config::default(),
            session_store("", ""),
            remote_sync(svc.clone(), true),
            Box::new(FakeClipboard {
                broken: true,
                ..FakeClipboard::default()
            }),
        );
        press(&mut app, KeyCode::Char('s'));
        app.setup.token = TextInput::with_value("T");
        app.setup.project_id = "p9".into();
        app.setup.field = SetupField::Generate;
        press(&mut app, KeyCode::Enter);

        let toast = app.toast.as_ref().unwrap();
        assert_eq!(toast.style, ToastStyle::Error);
        assert!(toast.message.contains("http://localhost:5173/?token=T&projectId=p9"));
        assert_eq!(app.session_config().selected_project_id, "p9");
    }

    #[tokio::test]
    async fn credential_change_replaces_the_service() {
        let svc = Arc::new(CountingService::default());
        let (mut app, _) = remote_app(&svc, "old", "p1");
        settle(&mut app).await;
        let generation = app.sync.generation();

        app.session.set_token("new").unwrap();
        app.update();
        assert_eq!(app.sync.generation(), generation + 1);
    }

    #[tokio::test]
    async fn toasts_expire_and_dismiss() {
        let mut app = local_app();
        app.show_toast("hello", ToastStyle::Info);
        press(&mut app, KeyCode::Esc);
        assert!(app.toast.is_none());

        app.config.toast_seconds = 0;
        app.show_toast("bye", ToastStyle::Info);
        app.update();
        assert!(app.toast.is_none());
    }

    #[tokio::test]
    async fn help_overlay_toggles() {
        let mut app = local_app();
        app.handle_key(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert_eq!(app.input_mode, InputMode::Help);
        // List keys are inert while help is open.
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.input_mode, InputMode::Help);
        press(&mut app, KeyCode::Char('q'));
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn local_mode_skips_setup() {
        let mut app = local_app();
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.screen, Screen::List);
        assert_eq!(app.toast.as_ref().map(|t| t.style), Some(ToastStyle::Info));
    }

    #[test]
    fn list_view_clamp() {
        let mut view = ListView {
            active_index: 7,
            ..ListView::default()
        };
        view.clamp(3);
        assert_eq!(view.active_index, 2);
        view.clamp(0);
        assert_eq!(view.active_index, 0);
        view.move_next(0);
        assert_eq!(view.active_index, 0);
    }

    #[test]
    fn setup_fields_cycle() {
        let field = SetupField::Token;
        assert_eq!(field.next().next().next(), field);
        assert_eq!(field.prev(), SetupField::Generate);
    }
}
