mod app;
mod event;
mod form;
mod keymap;
mod ui;
pub mod theme;

#[cfg(test)]
mod test_helpers;

use std::io::stdout;

use anyhow::Result;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;

use crate::config::Config;
use crate::session::SessionStore;
use crate::sync::SyncLayer;

/// Which screen the widget opens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartScreen {
    #[default]
    List,
    Setup,
}

pub fn run(config: Config, session: SessionStore, sync: SyncLayer, start: StartScreen) -> Result<()> {
    let mut app = app::App::new(config, session, sync, Box::new(app::SystemClipboard::default()));
    if start == StartScreen::Setup {
        app.open_setup();
    }

    let mut terminal = ratatui::init();
    let result = execute!(stdout(), EnableMouseCapture)
        .map_err(anyhow::Error::from)
        .and_then(|()| app.run(&mut terminal));
    let _ = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();
    result
}
