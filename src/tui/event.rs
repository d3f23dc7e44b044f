use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseEvent};

pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize,
    Tick,
}

/// Wait up to `tick_rate` for terminal input.
pub fn poll(tick_rate: Duration) -> Result<AppEvent> {
    if !event::poll(tick_rate)? {
        return Ok(AppEvent::Tick);
    }
    Ok(match event::read()? {
        // Windows terminals also report releases.
        Event::Key(key) if key.kind != KeyEventKind::Release => AppEvent::Key(key),
        Event::Mouse(mouse) => AppEvent::Mouse(mouse),
        Event::Resize(..) => AppEvent::Resize,
        _ => AppEvent::Tick,
    })
}
