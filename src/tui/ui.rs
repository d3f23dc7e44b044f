use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::sync::QueryState;
use crate::todoist::Task;

use super::app::{App, InputMode, Screen, SetupField, ToastStyle};
use super::form;
use super::theme::Theme;

/// Columns of the check control, relative to the row start.
const CHECK_COLS: std::ops::Range<u16> = 2..5;
/// Width of the delete control at the end of each row.
const DELETE_WIDTH: u16 = 3;
const DELETE_SYMBOL: &str = " \u{2715} ";
const ACTIVE_MARKER: &str = "\u{258c} ";

pub fn draw(frame: &mut Frame, app: &App) {
    match app.screen {
        Screen::List => draw_list(frame, app),
        Screen::Setup => draw_setup(frame, app),
    }

    if app.input_mode == InputMode::Help {
        draw_help(frame, app);
    }
}

// ── Layout ────────────────────────────────────────────────────────────

/// Areas of the list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLayout {
    /// The bordered task list.
    pub list: Rect,
    /// Inside the border: one task per line.
    pub rows: Rect,
    pub input: Option<Rect>,
    pub footer: Rect,
}

pub fn list_layout(area: Rect, input_open: bool) -> ListLayout {
    let input_height = if input_open { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(input_height),
            Constraint::Length(1),
        ])
        .split(area);

    ListLayout {
        list: chunks[0],
        rows: Block::default().borders(Borders::ALL).inner(chunks[0]),
        input: input_open.then_some(chunks[1]),
        footer: chunks[2],
    }
}

/// First visible row so that `active` stays on screen.
pub fn scroll_offset(active: usize, len: usize, height: u16) -> usize {
    let height = usize::from(height);
    if height == 0 || len <= height || active < height {
        return 0;
    }
    (active + 1 - height).min(len - height)
}

/// What a click on the list landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowHit {
    Check(usize),
    Delete(usize),
    /// Anywhere else on a task row.
    Row(usize),
}

pub fn hit_test(rows: Rect, offset: usize, len: usize, column: u16, row: u16) -> Option<RowHit> {
    if !rows.contains(Position::new(column, row)) {
        return None;
    }
    let index = offset + usize::from(row - rows.y);
    if index >= len {
        return None;
    }
    let col = column - rows.x;
    Some(if CHECK_COLS.contains(&col) {
        RowHit::Check(index)
    } else if col >= rows.width.saturating_sub(DELETE_WIDTH) {
        RowHit::Delete(index)
    } else {
        RowHit::Row(index)
    })
}

// ── List screen ───────────────────────────────────────────────────────

fn draw_list(frame: &mut Frame, app: &App) {
    let layout = list_layout(frame.area(), app.input_mode == InputMode::NewTask);
    let theme = &app.theme;

    let title = if app.sync.is_local() {
        " Tasks (local) "
    } else {
        " Tasks "
    };
    let block = Block::default()
        .title(Span::styled(title, theme.title_style()))
        .borders(Borders::ALL)
        .border_style(if app.input_mode == InputMode::NewTask {
            theme.unfocused_border()
        } else {
            theme.focused_border()
        });
    frame.render_widget(block, layout.list);

    match app.task_state() {
        QueryState::NotReady => draw_config_prompt(frame, app, layout.rows),
        QueryState::Loading => draw_message(frame, layout.rows, "Loading tasks...", theme),
        QueryState::Failed(error) => {
            let msg = Paragraph::new(format!("Could not load tasks: {error}"))
                .style(theme.toast_style(ToastStyle::Error))
                .wrap(Wrap { trim: true });
            frame.render_widget(msg, layout.rows);
        }
        QueryState::Ready([]) => {
            draw_message(frame, layout.rows, "No tasks yet. Press a to add one.", theme);
        }
        QueryState::Ready(tasks) => draw_rows(frame, app, tasks, layout.rows),
    }

    if let Some(area) = layout.input {
        let block = Block::default()
            .title(" New task (Enter adds, Esc closes) ")
            .borders(Borders::ALL)
            .border_style(theme.focused_border());
        let input = Paragraph::new(app.list.input.display_with_cursor())
            .style(Style::default().fg(theme.text_primary))
            .block(block);
        frame.render_widget(input, area);
    }

    draw_footer(
        frame,
        app,
        layout.footer,
        &[(" a", " add "), (" space", " done "), (" x", " delete "), (" ?", " help")],
    );
}

fn draw_rows(frame: &mut Frame, app: &App, tasks: &[Task], area: Rect) {
    let offset = scroll_offset(app.list.active_index, tasks.len(), area.height);
    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .skip(offset)
        .take(usize::from(area.height))
        .map(|(i, task)| {
            ListItem::new(task_line(task, i == app.list.active_index, area.width, &app.theme))
        })
        .collect();
    frame.render_widget(List::new(items), area);
}

/// One task row: marker, check control, text, delete control.
pub fn task_line(task: &Task, active: bool, width: u16, theme: &Theme) -> Line<'static> {
    let text_width = usize::from(width).saturating_sub(
        usize::from(CHECK_COLS.end) + 1 + usize::from(DELETE_WIDTH),
    );
    let text = fit(&task.text, text_width);

    let marker = if active {
        Span::styled(ACTIVE_MARKER, Style::default().fg(theme.accent))
    } else {
        Span::raw("  ")
    };
    let line = Line::from(vec![
        marker,
        Span::styled(task.symbol(), Style::default().fg(theme.check_control)),
        Span::raw(" "),
        Span::styled(text, theme.task_style(task.completed)),
        Span::styled(DELETE_SYMBOL, Style::default().fg(theme.delete_control)),
    ]);
    if active {
        line.style(theme.active_row_style())
    } else {
        line
    }
}

/// Truncate to `width` chars with an ellipsis, or pad with spaces up to it.
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
        if width > 0 {
            out.push('\u{2026}');
        }
        out
    } else {
        format!("{text}{}", " ".repeat(width - count))
    }
}

fn draw_config_prompt(frame: &mut Frame, app: &App, area: Rect) {
    let cfg = app.session_config();
    let theme = &app.theme;
    let key = Style::default()
        .fg(theme.accent)
        .add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(theme.text_secondary);

    let lines = if cfg.has_token() {
        let available = match app.sync.projects(&cfg.api_token) {
            QueryState::Ready(projects) => format!("{} projects available", projects.len()),
            QueryState::Failed(error) => format!("projects failed to load: {error}"),
            QueryState::Loading | QueryState::NotReady => "loading projects".to_string(),
        };
        vec![
            Line::from(Span::styled("Pick a project to show its tasks.", theme.title_style())),
            Line::from(vec![
                Span::styled("Press ", dim),
                Span::styled("s", key),
                Span::styled(format!(" to choose one ({available})."), dim),
            ]),
        ]
    } else {
        vec![
            Line::from(Span::styled("No Todoist token configured.", theme.title_style())),
            Line::from(vec![
                Span::styled("Press ", dim),
                Span::styled("s", key),
                Span::styled(" to open setup, or launch with ", dim),
                Span::styled("--url <widget-url>", key),
                Span::styled(".", dim),
            ]),
        ]
    };
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}

fn draw_message(frame: &mut Frame, area: Rect, text: &str, theme: &Theme) {
    let msg = Paragraph::new(text).style(Style::default().fg(theme.text_secondary));
    frame.render_widget(msg, area);
}

/// The notification if there is one, otherwise key hints.
fn draw_footer(frame: &mut Frame, app: &App, area: Rect, hints: &[(&str, &str)]) {
    if let Some(toast) = &app.toast {
        let line = Paragraph::new(format!(" {}", toast.message)).style(app.theme.toast_style(toast.style));
        frame.render_widget(line, area);
        return;
    }
    form::render_hints(
        frame,
        area,
        hints,
        Style::default().fg(app.theme.accent),
        Style::default().fg(app.theme.text_secondary),
    );
}

// ── Setup screen ──────────────────────────────────────────────────────

fn draw_setup(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(
        Paragraph::new(Span::styled(" Widget setup", theme.title_style())),
        chunks[0],
    );

    let field_border = |field: SetupField| {
        if app.setup.field == field {
            Style::default().fg(theme.form_highlight)
        } else {
            Style::default().fg(theme.form_dim)
        }
    };

    // Token, always masked.
    let focused = app.setup.field == SetupField::Token;
    let token = Paragraph::new(app.setup.token.display_masked(focused))
        .style(Style::default().fg(theme.text_primary))
        .block(
            Block::default()
                .title(" Todoist API token ")
                .borders(Borders::ALL)
                .border_style(field_border(SetupField::Token)),
        );
    frame.render_widget(token, chunks[1]);

    // Project selector.
    let block = Block::default()
        .title(" Project ")
        .borders(Borders::ALL)
        .border_style(field_border(SetupField::Project));
    match app.setup_projects() {
        QueryState::NotReady => {
            let msg = Paragraph::new("Enter a token to load your projects.")
                .style(Style::default().fg(theme.text_secondary))
                .block(block);
            frame.render_widget(msg, chunks[2]);
        }
        QueryState::Loading => {
            let msg = Paragraph::new("Loading projects...")
                .style(Style::default().fg(theme.text_secondary))
                .block(block);
            frame.render_widget(msg, chunks[2]);
        }
        QueryState::Failed(error) => {
            let msg = Paragraph::new(format!("Could not load projects: {error}"))
                .style(theme.toast_style(ToastStyle::Error))
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(msg, chunks[2]);
        }
        QueryState::Ready(projects) => {
            let selected = app.setup.selected_index(projects);
            let items: Vec<ListItem> = projects
                .iter()
                .enumerate()
                .map(|(i, project)| {
                    let (bullet, style) = if selected == Some(i) {
                        ("\u{25cf} ", theme.title_style())
                    } else {
                        ("\u{25cb} ", Style::default().fg(theme.text_primary))
                    };
                    ListItem::new(Line::from(vec![
                        Span::styled(bullet, style),
                        Span::styled(project.name.as_str(), style),
                    ]))
                })
                .collect();
            frame.render_widget(List::new(items).block(block), chunks[2]);
        }
    }

    let button_style = if app.setup.field == SetupField::Generate {
        Style::default()
            .fg(theme.form_highlight)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(theme.text_primary)
    };
    let button = Paragraph::new(Span::styled(" Generate widget URL ", button_style)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(field_border(SetupField::Generate)),
    );
    frame.render_widget(button, chunks[3]);

    draw_footer(
        frame,
        app,
        chunks[4],
        &[(" tab", " field "), (" ctrl+g", " generate "), (" esc", " back")],
    );
}

// ── Help overlay ──────────────────────────────────────────────────────

fn draw_help(frame: &mut Frame, app: &App) {
    let sections = app.keymap.help_entries();
    let height = sections.iter().map(|(_, e)| e.len() as u16 + 2).sum::<u16>() + 1;
    let inner = form::render_modal(frame, " Keys ", app.theme.focused_border(), 48, height);

    let key = Style::default().fg(app.theme.accent);
    let mut lines = Vec::new();
    for (label, entries) in sections {
        lines.push(Line::from(Span::styled(label, app.theme.title_style())));
        for entry in entries {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<16}", entry.label), key),
                Span::styled(entry.description, Style::default().fg(app.theme.text_primary)),
            ]));
        }
        lines.push(Line::default());
    }
    frame.render_widget(Paragraph::new(lines), inner);
}
