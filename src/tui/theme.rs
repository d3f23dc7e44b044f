use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

use super::app::ToastStyle;

/// Semantic colour theme for the widget.
///
/// Every colour used by the renderer is stored here so the user can
/// override any of them via `[theme]` in `config.toml`.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Borders ───────────────────────────────────────────────
    pub border_focused: Color,
    pub border_unfocused: Color,

    // ── Text ──────────────────────────────────────────────────
    pub title: Color,
    pub text_primary: Color,
    pub text_secondary: Color,

    // ── Tasks ─────────────────────────────────────────────────
    pub task_done: Color,
    pub active_row: Color,
    pub check_control: Color,
    pub delete_control: Color,

    pub accent: Color,

    // ── Toast ─────────────────────────────────────────────────
    pub toast_info: Color,
    pub toast_success: Color,
    pub toast_error: Color,

    // ── Forms ─────────────────────────────────────────────────
    pub form_highlight: Color,
    pub form_dim: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border_focused: Color::Magenta,
            border_unfocused: Color::DarkGray,

            title: Color::Magenta,
            text_primary: Color::White,
            text_secondary: Color::DarkGray,

            task_done: Color::DarkGray,
            active_row: Color::Rgb(60, 30, 80),
            check_control: Color::Magenta,
            delete_control: Color::LightRed,

            accent: Color::Magenta,

            toast_info: Color::Cyan,
            toast_success: Color::Green,
            toast_error: Color::Red,

            form_highlight: Color::Yellow,
            form_dim: Color::DarkGray,
        }
    }
}

impl Theme {
    pub fn focused_border(&self) -> Style {
        Style::default().fg(self.border_focused)
    }

    pub fn unfocused_border(&self) -> Style {
        Style::default().fg(self.border_unfocused)
    }

    pub fn title_style(&self) -> Style {
        Style::default().fg(self.title).add_modifier(Modifier::BOLD)
    }

    /// Style for a task's text: completed tasks are dimmed and struck through.
    pub fn task_style(&self, completed: bool) -> Style {
        if completed {
            Style::default()
                .fg(self.task_done)
                .add_modifier(Modifier::CROSSED_OUT)
        } else {
            Style::default().fg(self.text_primary)
        }
    }

    /// Background for the keyboard-highlighted row.
    pub fn active_row_style(&self) -> Style {
        Style::default().bg(self.active_row)
    }

    pub fn toast_style(&self, style: ToastStyle) -> Style {
        let color = match style {
            ToastStyle::Info => self.toast_info,
            ToastStyle::Success => self.toast_success,
            ToastStyle::Error => self.toast_error,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}

// ── Config deserialization ────────────────────────────────────────────

/// All-optional mirror of [`Theme`] for the `config.toml` `[theme]` section.
///
/// Only `Some` fields override the default; everything else keeps its default.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct ThemeConfig {
    pub border_focused: Option<String>,
    pub border_unfocused: Option<String>,

    pub title: Option<String>,
    pub text_primary: Option<String>,
    pub text_secondary: Option<String>,

    pub task_done: Option<String>,
    pub active_row: Option<String>,
    pub check_control: Option<String>,
    pub delete_control: Option<String>,

    pub accent: Option<String>,

    pub toast_info: Option<String>,
    pub toast_success: Option<String>,
    pub toast_error: Option<String>,

    pub form_highlight: Option<String>,
    pub form_dim: Option<String>,
}

/// Parse a colour string into a ratatui `Color`.
///
/// Supports named colours (`"cyan"`, `"red"`, `"dark_gray"`, etc.),
/// `"#RRGGBB"` and `"rgb(R,G,B)"`.
fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim();
    if let Some(inner) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
        let parts: Vec<&str> = inner.split(',').collect();
        if let [r, g, b] = parts.as_slice() {
            return Some(Color::Rgb(
                r.trim().parse().ok()?,
                g.trim().parse().ok()?,
                b.trim().parse().ok()?,
            ));
        }
        return None;
    }

    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?));
    }

    let lower = s.to_lowercase().replace('-', "_");
    match lower.as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Gray),
        "dark_gray" | "dark_grey" | "darkgray" | "darkgrey" => Some(Color::DarkGray),
        "light_red" | "lightred" => Some(Color::LightRed),
        "light_green" | "lightgreen" => Some(Color::LightGreen),
        "light_yellow" | "lightyellow" => Some(Color::LightYellow),
        "light_blue" | "lightblue" => Some(Color::LightBlue),
        "light_magenta" | "lightmagenta" => Some(Color::LightMagenta),
        "light_cyan" | "lightcyan" => Some(Color::LightCyan),
        "white" => Some(Color::White),
        _ => None,
    }
}

fn apply(target: &mut Color, source: Option<&String>) {
    if let Some(s) = source {
        match parse_color(s) {
            Some(color) => *target = color,
            None => tracing::warn!(value = %s, "ignoring unknown theme colour"),
        }
    }
}

impl ThemeConfig {
    /// Build a `Theme` starting from defaults, overriding any fields that were
    /// set in the config file. `accent` also recolours the title, the focused
    /// border and the check control unless those are set explicitly.
    pub fn build(&self) -> Theme {
        let mut t = Theme::default();

        apply(&mut t.accent, self.accent.as_ref());
        if self.accent.is_some() {
            t.title = t.accent;
            t.border_focused = t.accent;
            t.check_control = t.accent;
        }

        apply(&mut t.border_focused, self.border_focused.as_ref());
        apply(&mut t.border_unfocused, self.border_unfocused.as_ref());
        apply(&mut t.title, self.title.as_ref());
        apply(&mut t.text_primary, self.text_primary.as_ref());
        apply(&mut t.text_secondary, self.text_secondary.as_ref());
        apply(&mut t.task_done, self.task_done.as_ref());
        apply(&mut t.active_row, self.active_row.as_ref());
        apply(&mut t.check_control, self.check_control.as_ref());
        apply(&mut t.delete_control, self.delete_control.as_ref());
        apply(&mut t.toast_info, self.toast_info.as_ref());
        apply(&mut t.toast_success, self.toast_success.as_ref());
        apply(&mut t.toast_error, self.toast_error.as_ref());
        apply(&mut t.form_highlight, self.form_highlight.as_ref());
        apply(&mut t.form_dim, self.form_dim.as_ref());

        t
    }
}
