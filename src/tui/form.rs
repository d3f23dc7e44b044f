use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

const CURSOR: char = '\u{2588}';
const MASK: char = '\u{2022}';

// ── Text input ────────────────────────────────────────────────────────

/// Single-line text buffer with a byte-offset cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.len();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Take the contents, leaving the input empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }

    /// Apply an editing key. Returns `true` if the key was consumed.
    ///
    /// Supports insertion, Backspace/Delete, arrows, Home/End, Alt+arrows for
    /// word jumps and Ctrl+W / Ctrl+U for word and line deletion.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        self.cursor = self.cursor.min(self.value.len());
        let alt = modifiers.contains(KeyModifiers::ALT);
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);

        match code {
            KeyCode::Left if alt => self.cursor = word_start_before(&self.value, self.cursor),
            KeyCode::Left => self.cursor = self.prev_char_boundary(),
            KeyCode::Right if alt => self.cursor = word_start_after(&self.value, self.cursor),
            KeyCode::Right => self.cursor = self.next_char_boundary(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),

            KeyCode::Backspace if alt => self.delete_back_to(word_start_before(&self.value, self.cursor)),
            KeyCode::Char('w') if ctrl => self.delete_back_to(word_start_before(&self.value, self.cursor)),
            KeyCode::Char('u') if ctrl => self.delete_back_to(0),
            KeyCode::Backspace => self.delete_back_to(self.prev_char_boundary()),
            KeyCode::Delete => {
                let end = self.next_char_boundary();
                self.value.drain(self.cursor..end);
            }

            KeyCode::Char(c) if !ctrl && !alt => {
                self.value.insert(self.cursor, c);
                self.cursor += c.len_utf8();
            }
            _ => return false,
        }
        true
    }

    fn delete_back_to(&mut self, start: usize) {
        self.value.drain(start..self.cursor);
        self.cursor = start;
    }

    fn prev_char_boundary(&self) -> usize {
        self.value[..self.cursor]
            .chars()
            .next_back()
            .map_or(self.cursor, |ch| self.cursor - ch.len_utf8())
    }

    fn next_char_boundary(&self) -> usize {
        self.value[self.cursor..]
            .chars()
            .next()
            .map_or(self.cursor, |ch| self.cursor + ch.len_utf8())
    }

    /// The text with a block cursor, for the focused field.
    pub fn display_with_cursor(&self) -> String {
        let (before, after) = self.value.split_at(self.cursor.min(self.value.len()));
        format!("{before}{CURSOR}{after}")
    }

    /// Every character replaced by a bullet; the cursor is shown when `focused`.
    pub fn display_masked(&self, focused: bool) -> String {
        let before = self.value[..self.cursor.min(self.value.len())].chars().count();
        let total = self.value.chars().count();
        let mut out: String = std::iter::repeat_n(MASK, before).collect();
        if focused {
            out.push(CURSOR);
        }
        out.extend(std::iter::repeat_n(MASK, total - before));
        out
    }
}

/// Byte offset where the word ending at or before `pos` starts.
fn word_start_before(s: &str, pos: usize) -> usize {
    let trimmed = s[..pos].trim_end();
    match trimmed.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        Some((idx, ch)) => idx + ch.len_utf8(),
        None => 0,
    }
}

/// Byte offset where the next word after `pos` starts, or the end of `s`.
fn word_start_after(s: &str, pos: usize) -> usize {
    let after = &s[pos..];
    let Some(ws) = after.find(char::is_whitespace) else {
        return s.len();
    };
    after[ws..]
        .find(|c: char| !c.is_whitespace())
        .map_or(s.len(), |next| pos + ws + next)
}

// ── Rendering helpers ─────────────────────────────────────────────────

/// Clear a centred `width`×`height` panel, draw a bordered block on it and
/// return the inner area. Clamped to the frame.
pub fn render_modal(
    frame: &mut Frame,
    title: &str,
    border_style: Style,
    width: u16,
    height: u16,
) -> Rect {
    let area = frame.area();
    let w = width.min(area.width.saturating_sub(2));
    let h = height.min(area.height.saturating_sub(2));
    let panel = Rect::new(
        area.x + area.width.saturating_sub(w) / 2,
        area.y + area.height.saturating_sub(h) / 2,
        w,
        h,
    );

    frame.render_widget(Clear, panel);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(panel);
    frame.render_widget(block, panel);
    inner
}

/// One line of `key description` pairs, e.g. the hint bar under the list.
pub fn render_hints(
    frame: &mut Frame,
    area: Rect,
    hints: &[(&str, &str)],
    key_style: Style,
    desc_style: Style,
) {
    let spans: Vec<Span<'_>> = hints
        .iter()
        .flat_map(|(key, desc)| [Span::styled(*key, key_style), Span::styled(*desc, desc_style)])
        .collect();
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
