use crossterm::event::{KeyCode, KeyModifiers};

// ── Actions ──────────────────────────────────────────────────────────

/// Every discrete action the widget performs in response to a key press.
///
/// Actions are context-free identifiers; `App` decides what actually
/// happens based on the current screen and state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Global
    Quit,
    ShowHelp,
    DismissToast,

    // List
    MoveUp,
    MoveDown,
    NewTask,
    CompleteTask,
    DeleteTask,
    Refresh,
    OpenSetup,

    // Setup
    NextField,
    PrevField,
    GenerateUrl,
    Back,
}

// ── Help categories ──────────────────────────────────────────────────

/// Logical groupings shown in the help overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelpCategory {
    General,
    Navigation,
    Tasks,
    Setup,
}

impl HelpCategory {
    fn label(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Navigation => "Navigation",
            Self::Tasks => "Tasks",
            Self::Setup => "Setup",
        }
    }

    /// Fixed display order for the help overlay.
    const ORDERED: &[Self] = &[Self::Navigation, Self::Tasks, Self::Setup, Self::General];
}

// ── Keybinding ───────────────────────────────────────────────────────

/// A single key → action mapping with metadata for the help overlay.
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    pub action: Action,
    /// Human-readable key label shown in help (e.g. `"Ctrl+G"`).
    /// Empty for aliases that share a row with another binding.
    pub label: &'static str,
    pub description: &'static str,
    pub category: HelpCategory,
}

/// A single row in the help overlay.
#[derive(Debug, Clone)]
pub struct HelpEntry {
    pub label: &'static str,
    pub description: &'static str,
}

// ── KeyMap ────────────────────────────────────────────────────────────

/// Declarative registry of every key binding in the widget.
///
/// Two tables: `list` (task list, normal mode) and `setup` (setup screen,
/// checked before keys reach the focused field).
pub struct KeyMap {
    pub list: Vec<KeyBinding>,
    pub setup: Vec<KeyBinding>,
}

impl KeyMap {
    pub fn default_keymap() -> Self {
        Self {
            list: default_list_bindings(),
            setup: default_setup_bindings(),
        }
    }

    pub fn lookup_list(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
        lookup(&self.list, code, modifiers)
    }

    pub fn lookup_setup(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
        lookup(&self.setup, code, modifiers)
    }

    /// Grouped help entries in display order.
    pub fn help_entries(&self) -> Vec<(&'static str, Vec<HelpEntry>)> {
        let mut out = Vec::new();

        for &cat in HelpCategory::ORDERED {
            let mut entries: Vec<HelpEntry> = Vec::new();
            for kb in self.list.iter().chain(&self.setup) {
                if kb.category == cat
                    && !kb.label.is_empty()
                    && !entries.iter().any(|e| e.label == kb.label)
                {
                    entries.push(HelpEntry {
                        label: kb.label,
                        description: kb.description,
                    });
                }
            }

            if cat == HelpCategory::Tasks {
                entries.push(HelpEntry {
                    label: "  Click",
                    description: "Check or delete the clicked task",
                });
            }

            if !entries.is_empty() {
                out.push((cat.label(), entries));
            }
        }

        out
    }
}

// ── Lookup helper ────────────────────────────────────────────────────

fn lookup(bindings: &[KeyBinding], code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    // Terminals report Shift for characters like '?' inconsistently.
    let modifiers = match code {
        KeyCode::Char(_) => modifiers - KeyModifiers::SHIFT,
        _ => modifiers,
    };
    bindings
        .iter()
        .find(|kb| kb.code == code && kb.modifiers == modifiers)
        .map(|kb| kb.action)
}

// ── Default list bindings ────────────────────────────────────────────

#[allow(clippy::enum_glob_use)]
fn default_list_bindings() -> Vec<KeyBinding> {
    use Action::*;
    use HelpCategory::*;

    vec![
        // ── Navigation ───────────────────────────────────────────
        KeyBinding {
            code: KeyCode::Char('j'),
            modifiers: KeyModifiers::NONE,
            action: MoveDown,
            label: "  j/k",
            description: "Move highlight",
            category: Navigation,
        },
        KeyBinding {
            code: KeyCode::Char('k'),
            modifiers: KeyModifiers::NONE,
            action: MoveUp,
            label: "",
            description: "",
            category: Navigation,
        },
        KeyBinding {
            code: KeyCode::Down,
            modifiers: KeyModifiers::NONE,
            action: MoveDown,
            label: "  Up/Down",
            description: "Move highlight",
            category: Navigation,
        },
        KeyBinding {
            code: KeyCode::Up,
            modifiers: KeyModifiers::NONE,
            action: MoveUp,
            label: "",
            description: "",
            category: Navigation,
        },
        // ── Tasks ────────────────────────────────────────────────
        KeyBinding {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            action: NewTask,
            label: "  a/n",
            description: "Add a task",
            category: Tasks,
        },
        KeyBinding {
            code: KeyCode::Char('n'),
            modifiers: KeyModifiers::NONE,
            action: NewTask,
            label: "",
            description: "",
            category: Tasks,
        },
        KeyBinding {
            code: KeyCode::Char(' '),
            modifiers: KeyModifiers::NONE,
            action: CompleteTask,
            label: "  Space/Enter",
            description: "Complete highlighted task",
            category: Tasks,
        },
        KeyBinding {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            action: CompleteTask,
            label: "",
            description: "",
            category: Tasks,
        },
        KeyBinding {
            code: KeyCode::Char('x'),
            modifiers: KeyModifiers::NONE,
            action: DeleteTask,
            label: "  x",
            description: "Delete highlighted task",
            category: Tasks,
        },
        KeyBinding {
            code: KeyCode::Char('r'),
            modifiers: KeyModifiers::NONE,
            action: Refresh,
            label: "  r",
            description: "Refresh from Todoist",
            category: Tasks,
        },
        // ── General ──────────────────────────────────────────────
        KeyBinding {
            code: KeyCode::Char('s'),
            modifiers: KeyModifiers::NONE,
            action: OpenSetup,
            label: "  s",
            description: "Open setup",
            category: General,
        },
        KeyBinding {
            code: KeyCode::Char('?'),
            modifiers: KeyModifiers::NONE,
            action: ShowHelp,
            label: "  ?",
            description: "Toggle this help",
            category: General,
        },
        KeyBinding {
            code: KeyCode::Esc,
            modifiers: KeyModifiers::NONE,
            action: DismissToast,
            label: "  Esc",
            description: "Dismiss notification",
            category: General,
        },
        KeyBinding {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            action: Quit,
            label: "  q",
            description: "Quit",
            category: General,
        },
        KeyBinding {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            action: Quit,
            label: "",
            description: "",
            category: General,
        },
    ]
}

// ── Default setup bindings ───────────────────────────────────────────

#[allow(clippy::enum_glob_use)]
fn default_setup_bindings() -> Vec<KeyBinding> {
    use Action::*;
    use HelpCategory::*;

    vec![
        KeyBinding {
            code: KeyCode::Tab,
            modifiers: KeyModifiers::NONE,
            action: NextField,
            label: "  Tab/S-Tab",
            description: "Switch field",
            category: Setup,
        },
        KeyBinding {
            code: KeyCode::BackTab,
            modifiers: KeyModifiers::SHIFT,
            action: PrevField,
            label: "",
            description: "",
            category: Setup,
        },
        KeyBinding {
            code: KeyCode::Char('g'),
            modifiers: KeyModifiers::CONTROL,
            action: GenerateUrl,
            label: "  Ctrl+G",
            description: "Generate and copy widget URL",
            category: Setup,
        },
        KeyBinding {
            code: KeyCode::Esc,
            modifiers: KeyModifiers::NONE,
            action: Back,
            label: "  Esc",
            description: "Back to the list",
            category: Setup,
        },
        KeyBinding {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            action: Quit,
            label: "",
            description: "",
            category: Setup,
        },
    ]
}

// ── Tests ────────────────────────────────────────────────────────────
