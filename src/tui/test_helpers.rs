use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use tokio::runtime::Handle;
use tokio::time::timeout;

use crate::config::Config;
use crate::session::{LaunchParams, SessionStore};
use crate::store::Store;
use crate::sync::{Backend, SyncLayer};
use crate::testing::{CountingService, remote_sync};
use crate::todoist::{LocalService, TaskService};

use super::app::{App, ClipboardSink};
use super::ui;

/// Records copied text, or fails like a headless session when `broken`.
#[derive(Clone, Default)]
pub struct FakeClipboard {
    pub copied: Arc<Mutex<Vec<String>>>,
    pub broken: bool,
}

impl ClipboardSink for FakeClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        if self.broken {
            anyhow::bail!("no display");
        }
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub fn session_store(token: &str, project: &str) -> SessionStore {
    let launch = LaunchParams {
        token: (!token.is_empty()).then(|| token.to_string()),
        project_id: (!project.is_empty()).then(|| project.to_string()),
    };
    SessionStore::load(Store::open_in_memory().unwrap(), &launch).unwrap()
}

pub fn remote_app(svc: &Arc<CountingService>, token: &str, project: &str) -> (App, FakeClipboard) {
    let clipboard = FakeClipboard::default();
    let app = App::new(
        Config::default(),
        session_store(token, project),
        remote_sync(svc.clone(), true),
        Box::new(clipboard.clone()),
    );
    (app, clipboard)
}

pub fn local_app() -> App {
    let service: Arc<dyn TaskService> = Arc::new(LocalService::new());
    App::new(
        Config {
            local: true,
            ..Config::default()
        },
        session_store("", ""),
        SyncLayer::new(Backend::Local(service), Handle::current()),
        Box::new(FakeClipboard::default()),
    )
}

/// Run updates until background work stops reporting back.
pub async fn settle(app: &mut App) {
    for _ in 0..4 {
        app.update();
        while let Ok(Some(notice)) = timeout(Duration::from_millis(50), app.sync.next()).await {
            if let Some(notice) = notice {
                app.show_notice(notice);
            }
        }
    }
    app.update();
}

/// Draw `app` into a `w`×`h` buffer and return the plain text, one line per row.
pub fn render_to_string(app: &mut App, w: u16, h: u16) -> String {
    let mut terminal = Terminal::new(TestBackend::new(w, h)).unwrap();
    terminal
        .draw(|frame| {
            app.last_area = frame.area();
            ui::draw(frame, app);
        })
        .unwrap();

    let buf = terminal.backend().buffer().clone();
    buf.content
        .chunks(usize::from(buf.area.width))
        .map(|row| {
            let line: String = row.iter().map(ratatui::buffer::Cell::symbol).collect();
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
