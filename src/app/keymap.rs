//! Keybinding configuration: parse `keybinds.conf`, provide defaults, and map keys to actions.
//!
//! This module manages keyboard shortcuts for the TUI. It supports:
//! - Loading custom keybindings from a config file (`keybinds.conf`)
//! - Providing defaults if no config is present
//! - Resolving key presses (with modifiers) to semantic actions
//! - Exporting the current keymap back to a file for customization

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Context as _;

/// Semantic keyboard actions available in normal mode.
///
/// Several key combinations can map to the same action (both `j` and Down
/// move down, for instance).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Exit the application.
    Quit,
    /// Focus the search box.
    StartSearch,
    /// Open the filter selectors modal.
    OpenFilterMenu,
    /// Display the help modal.
    OpenHelp,
    /// Re-fetch the user list from the server.
    Reload,
    /// Step the premium selector (all → yes → no).
    CyclePremiumFilter,
    /// Step the dev selector (all → yes → no).
    CycleDevFilter,
    /// Step the registration-date selector (all → week → month → year).
    CycleDateFilter,
    /// Reset every filter control, including the search term.
    ClearFilters,
    /// Open the action menu for the selected user.
    OpenActions,
    /// Ask to delete the selected user.
    DeleteSelection,
    /// Toggle the keybindings panel on the right.
    ToggleKeybindsPane,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    /// Keys that should do nothing.
    Ignore,
}

/// Manages keybinding configuration and key-to-action resolution.
#[derive(Clone, Debug)]
pub struct Keymap {
    /// Canonical mapping from (modifiers, code) to action.
    bindings: HashMap<(KeyModifiers, KeyCode), KeyAction>,
}

impl Keymap {
    /// Create a keymap with default keybindings: arrows and vim keys for
    /// navigation, single letters for filters and commands.
    pub fn new_defaults() -> Self {
        use KeyCode::*;
        use KeyModifiers as M;
        let mut bindings = HashMap::new();
        bindings.insert((M::NONE, Char('q')), KeyAction::Quit);
        bindings.insert((M::NONE, Esc), KeyAction::Ignore);
        bindings.insert((M::NONE, Char('/')), KeyAction::StartSearch);
        bindings.insert((M::NONE, Char('f')), KeyAction::OpenFilterMenu);
        bindings.insert((M::NONE, Char('?')), KeyAction::OpenHelp);
        bindings.insert((M::NONE, F(5)), KeyAction::Reload);
        bindings.insert((M::NONE, Char('R')), KeyAction::Reload);
        bindings.insert((M::SHIFT, Char('R')), KeyAction::Reload);
        bindings.insert((M::NONE, Char('p')), KeyAction::CyclePremiumFilter);
        bindings.insert((M::NONE, Char('d')), KeyAction::CycleDevFilter);
        bindings.insert((M::NONE, Char('r')), KeyAction::CycleDateFilter);
        bindings.insert((M::NONE, Char('c')), KeyAction::ClearFilters);
        bindings.insert((M::NONE, Enter), KeyAction::OpenActions);
        bindings.insert((M::NONE, Delete), KeyAction::DeleteSelection);

        bindings.insert((M::NONE, Up), KeyAction::MoveUp);
        bindings.insert((M::NONE, Down), KeyAction::MoveDown);
        bindings.insert((M::NONE, Char('k')), KeyAction::MoveUp);
        bindings.insert((M::NONE, Char('j')), KeyAction::MoveDown);
        bindings.insert((M::NONE, PageUp), KeyAction::PageUp);
        bindings.insert((M::NONE, PageDown), KeyAction::PageDown);
        bindings.insert((M::NONE, Left), KeyAction::PageUp);
        bindings.insert((M::NONE, Right), KeyAction::PageDown);
        bindings.insert((M::NONE, Char('h')), KeyAction::PageUp);
        bindings.insert((M::NONE, Char('l')), KeyAction::PageDown);

        // Terminals disagree on how Shift+K is reported
        bindings.insert((M::SHIFT, Char('k')), KeyAction::ToggleKeybindsPane);
        bindings.insert((M::SHIFT, Char('K')), KeyAction::ToggleKeybindsPane);
        bindings.insert((M::NONE, Char('K')), KeyAction::ToggleKeybindsPane);

        Self { bindings }
    }

    /// Load a keymap from `path`, writing the defaults there first if the file
    /// does not exist yet.
    pub fn load_or_init(path: &Path) -> Self {
        if path.exists() {
            return Self::from_file(path).unwrap_or_default();
        }
        let km = Self::default();
        if let Err(e) = km.write_file(path) {
            tracing::warn!(error = %e, "could not write default keybindings");
        }
        km
    }

    /// Load a keymap from a configuration file.
    ///
    /// Lines use `<Action> = <KeySpec>`; the legacy `<KeySpec> = <Action>`
    /// order is accepted too. Defaults are loaded first and then overridden.
    pub fn from_file(path: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        Some(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut map = Self::default();
        for raw in contents.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, '=');
            let lhs = parts.next().map(|s| s.trim()).unwrap_or("");
            let rhs = parts.next().map(|s| s.trim()).unwrap_or("");
            if lhs.is_empty() || rhs.is_empty() {
                continue;
            }
            if let (Some(action), Some(key)) = (parse_action(lhs), parse_key(rhs)) {
                map.bindings.insert(key, action);
                continue;
            }
            if let (Some(key), Some(action)) = (parse_key(lhs), parse_action(rhs)) {
                map.bindings.insert(key, action);
                continue;
            }
            tracing::debug!(line, "ignoring unrecognised keybinding");
        }
        map
    }

    /// Write a readable subset of the bindings to `path`.
    pub fn write_file(&self, path: &Path) -> crate::error::Result<()> {
        use std::fmt::Write as _;
        let mut buf = String::new();
        buf.push_str("# usradmin keybindings\n");
        buf.push_str("# Format: <Action> = <KeySpec>\n");
        buf.push_str("# KeySpec examples: q, Ctrl+q, Enter, Esc, Up, Down, Left, Right, PageUp, PageDown, Delete, F5, /, f, p, d, r\n");
        buf.push_str("# Actions: Quit, StartSearch, OpenFilterMenu, OpenHelp, Reload, CyclePremiumFilter, CycleDevFilter, CycleDateFilter, ClearFilters, OpenActions, DeleteSelection, ToggleKeybindsPane, MoveUp, MoveDown, PageUp, PageDown, Ignore\n\n");

        let dump = [
            ("q", KeyAction::Quit),
            ("Esc", KeyAction::Ignore),
            ("/", KeyAction::StartSearch),
            ("f", KeyAction::OpenFilterMenu),
            ("?", KeyAction::OpenHelp),
            ("F5", KeyAction::Reload),
            ("R", KeyAction::Reload),
            ("p", KeyAction::CyclePremiumFilter),
            ("d", KeyAction::CycleDevFilter),
            ("r", KeyAction::CycleDateFilter),
            ("c", KeyAction::ClearFilters),
            ("Enter", KeyAction::OpenActions),
            ("Delete", KeyAction::DeleteSelection),
            ("K", KeyAction::ToggleKeybindsPane),
            ("Up", KeyAction::MoveUp),
            ("Down", KeyAction::MoveDown),
            ("k", KeyAction::MoveUp),
            ("j", KeyAction::MoveDown),
            ("PageUp", KeyAction::PageUp),
            ("PageDown", KeyAction::PageDown),
        ];
        for (k, a) in dump {
            let _ = writeln!(&mut buf, "{} = {}", format_action(a), k);
        }

        std::fs::write(path, buf).with_ctx(|| format!("write keymap {}", path.display()))
    }

    /// Resolve a key event to its action, if any.
    pub fn resolve(&self, key: &KeyEvent) -> Option<KeyAction> {
        self.bindings.get(&(key.modifiers, key.code)).copied()
    }

    /// Snapshot of all bindings as ((modifiers, code), action) pairs.
    pub fn all_bindings(&self) -> Vec<((KeyModifiers, KeyCode), KeyAction)> {
        self.bindings.iter().map(|(k, v)| (*k, *v)).collect()
    }

    /// Format a key (modifiers + code) into a spec like "Ctrl+q" or "F5".
    pub fn format_key(mods: KeyModifiers, code: KeyCode) -> String {
        use KeyCode::*;
        let base = match code {
            Enter => "Enter".to_string(),
            Delete => "Delete".to_string(),
            Esc => "Esc".to_string(),
            Up => "Up".to_string(),
            Down => "Down".to_string(),
            Left => "Left".to_string(),
            Right => "Right".to_string(),
            PageUp => "PageUp".to_string(),
            PageDown => "PageDown".to_string(),
            F(n) => format!("F{n}"),
            Char(c) => c.to_string(),
            _ => format!("{:?}", code),
        };
        if mods.contains(KeyModifiers::CONTROL) {
            format!("Ctrl+{}", base)
        } else {
            base
        }
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new_defaults()
    }
}

fn parse_key(spec: &str) -> Option<(KeyModifiers, KeyCode)> {
    use KeyCode::*;
    let s = spec.trim();
    let (mods, rest) = match s.strip_prefix("Ctrl+") {
        Some(after) => (KeyModifiers::CONTROL, after),
        None => (KeyModifiers::NONE, s),
    };
    let code = match rest {
        "Enter" => Enter,
        "Delete" => Delete,
        "Esc" | "Escape" => Esc,
        "Up" => Up,
        "Down" => Down,
        "Left" => Left,
        "Right" => Right,
        "PageUp" => PageUp,
        "PageDown" => PageDown,
        _ => {
            if let Some(n) = rest.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
                F(n)
            } else {
                let mut chars = rest.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Char(c),
                    _ => return None,
                }
            }
        }
    };
    Some((mods, code))
}

fn parse_action(s: &str) -> Option<KeyAction> {
    match s.trim() {
        "Quit" => Some(KeyAction::Quit),
        "StartSearch" => Some(KeyAction::StartSearch),
        "OpenFilterMenu" => Some(KeyAction::OpenFilterMenu),
        "OpenHelp" => Some(KeyAction::OpenHelp),
        "Reload" => Some(KeyAction::Reload),
        "CyclePremiumFilter" => Some(KeyAction::CyclePremiumFilter),
        "CycleDevFilter" => Some(KeyAction::CycleDevFilter),
        "CycleDateFilter" => Some(KeyAction::CycleDateFilter),
        "ClearFilters" => Some(KeyAction::ClearFilters),
        "OpenActions" => Some(KeyAction::OpenActions),
        "DeleteSelection" => Some(KeyAction::DeleteSelection),
        "ToggleKeybindsPane" => Some(KeyAction::ToggleKeybindsPane),
        "MoveUp" => Some(KeyAction::MoveUp),
        "MoveDown" => Some(KeyAction::MoveDown),
        "PageUp" => Some(KeyAction::PageUp),
        "PageDown" => Some(KeyAction::PageDown),
        "Ignore" => Some(KeyAction::Ignore),
        _ => None,
    }
}

pub fn format_action(a: KeyAction) -> &'static str {
    match a {
        KeyAction::Quit => "Quit",
        KeyAction::StartSearch => "StartSearch",
        KeyAction::OpenFilterMenu => "OpenFilterMenu",
        KeyAction::OpenHelp => "OpenHelp",
        KeyAction::Reload => "Reload",
        KeyAction::CyclePremiumFilter => "CyclePremiumFilter",
        KeyAction::CycleDevFilter => "CycleDevFilter",
        KeyAction::CycleDateFilter => "CycleDateFilter",
        KeyAction::ClearFilters => "ClearFilters",
        KeyAction::OpenActions => "OpenActions",
        KeyAction::DeleteSelection => "DeleteSelection",
        KeyAction::ToggleKeybindsPane => "ToggleKeybindsPane",
        KeyAction::MoveUp => "MoveUp",
        KeyAction::MoveDown => "MoveDown",
        KeyAction::PageUp => "PageUp",
        KeyAction::PageDown => "PageDown",
        KeyAction::Ignore => "Ignore",
    }
}
