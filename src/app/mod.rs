//! Application state types and entry glue.
//!
//! Defines the snapshot cell, filter controls, modal states and theme that
//! model the TUI, plus the settings the binary hands over (re-exported `run`).
//!
pub mod jobs;
pub mod keymap;
pub mod update;

use ratatui::style::Color;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::api::{UserId, UserRecord};
use crate::debounce::Debouncer;
use crate::error::Context as _;
use crate::filter::Criteria;

/// Current input mode for key handling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Modal,
}

/// Color palette for theming the TUI.
#[derive(Clone, Copy, Debug)]
pub struct Theme {
    pub text: Color,
    pub muted: Color,
    pub title: Color,
    pub border: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub status_bg: Color,
    pub status_fg: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
    pub premium_badge: Color,
    pub dev_badge: Color,
    pub error_fg: Color,
}

impl Theme {
    /// Dark default theme.
    pub fn dark() -> Self {
        Self {
            text: Color::Gray,
            muted: Color::DarkGray,
            title: Color::Cyan,
            border: Color::Gray,
            header_bg: Color::Black,
            header_fg: Color::Cyan,
            status_bg: Color::DarkGray,
            status_fg: Color::Black,
            highlight_fg: Color::Yellow,
            highlight_bg: Color::Reset,
            premium_badge: Color::Yellow,
            dev_badge: Color::Magenta,
            error_fg: Color::Red,
        }
    }

    /// Catppuccin Mocha theme defaults.
    pub fn mocha() -> Self {
        // Palette reference: https://github.com/catppuccin/catppuccin
        Self {
            text: Color::Rgb(0xcd, 0xd6, 0xf4),         // text
            muted: Color::Rgb(0x7f, 0x84, 0x9c),        // overlay1
            title: Color::Rgb(0xcb, 0xa6, 0xf7),        // mauve
            border: Color::Rgb(0x58, 0x5b, 0x70),       // surface2
            header_bg: Color::Rgb(0x31, 0x32, 0x44),    // surface0
            header_fg: Color::Rgb(0xb4, 0xbe, 0xfe),    // lavender
            status_bg: Color::Rgb(0x45, 0x47, 0x5a),    // surface1
            status_fg: Color::Rgb(0xcd, 0xd6, 0xf4),    // text
            highlight_fg: Color::Rgb(0xf9, 0xe2, 0xaf), // yellow
            highlight_bg: Color::Rgb(0x45, 0x47, 0x5a), // surface1
            premium_badge: Color::Rgb(0xfa, 0xb3, 0x87), // peach
            dev_badge: Color::Rgb(0x94, 0xe2, 0xd5),    // teal
            error_fg: Color::Rgb(0xf3, 0x8b, 0xa8),     // red
        }
    }

    /// Load theme from a simple key=value file. Unknown or missing keys fall back to `mocha`.
    pub fn from_file(path: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        let mut theme = Self::mocha();

        for raw_line in contents.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, '=');
            let key = parts.next().map(|s| s.trim()).unwrap_or("");
            let val = parts.next().map(|s| s.trim()).unwrap_or("");
            if key.is_empty() || val.is_empty() {
                continue;
            }
            if let Some(color) = Self::parse_color(val) {
                match key {
                    "text" => theme.text = color,
                    "muted" => theme.muted = color,
                    "title" => theme.title = color,
                    "border" => theme.border = color,
                    "header_bg" => theme.header_bg = color,
                    "header_fg" => theme.header_fg = color,
                    "status_bg" => theme.status_bg = color,
                    "status_fg" => theme.status_fg = color,
                    "highlight_fg" => theme.highlight_fg = color,
                    "highlight_bg" => theme.highlight_bg = color,
                    "premium_badge" => theme.premium_badge = color,
                    "dev_badge" => theme.dev_badge = color,
                    "error_fg" => theme.error_fg = color,
                    _ => {}
                }
            }
        }

        Some(theme)
    }

    /// Parse a color from hex ("#RRGGBB" or "RRGGBB") or "reset".
    fn parse_color(s: &str) -> Option<Color> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "reset" {
            return Some(Color::Reset);
        }
        let hex = lower.strip_prefix('#').unwrap_or(lower.as_str());
        if hex.len() == 6
            && hex.is_ascii()
            && let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            )
        {
            return Some(Color::Rgb(r, g, b));
        }
        None
    }

    /// Persist the theme to a config file in key=value format.
    pub fn write_file(&self, path: &Path) -> crate::error::Result<()> {
        use std::fmt::Write as _;
        let mut buf = String::new();
        buf.push_str("# usradmin theme configuration\n");
        buf.push_str("# Colors: hex as #RRGGBB or RRGGBB, or 'reset'\n\n");

        fn color_to_str(c: Color) -> String {
            match c {
                Color::Rgb(r, g, b) => format!("#{:02X}{:02X}{:02X}", r, g, b),
                Color::Reset => "reset".to_string(),
                // Named colors get a best-effort hex approximation
                Color::Black => "#000000".to_string(),
                Color::Red => "#FF0000".to_string(),
                Color::Green => "#00FF00".to_string(),
                Color::Yellow => "#FFFF00".to_string(),
                Color::Blue => "#0000FF".to_string(),
                Color::Magenta => "#FF00FF".to_string(),
                Color::Cyan => "#00FFFF".to_string(),
                Color::Gray => "#B3B3B3".to_string(),
                Color::DarkGray => "#4D4D4D".to_string(),
                Color::LightRed => "#FF6666".to_string(),
                Color::LightGreen => "#66FF66".to_string(),
                Color::LightYellow => "#FFFF66".to_string(),
                Color::LightBlue => "#6666FF".to_string(),
                Color::LightMagenta => "#FF66FF".to_string(),
                Color::LightCyan => "#66FFFF".to_string(),
                Color::White => "#FFFFFF".to_string(),
                Color::Indexed(i) => format!("index:{}", i),
            }
        }

        let mut kv = |k: &str, v: Color| {
            let _ = writeln!(&mut buf, "{} = {}", k, color_to_str(v));
        };

        kv("text", self.text);
        kv("muted", self.muted);
        kv("title", self.title);
        kv("border", self.border);
        kv("header_bg", self.header_bg);
        kv("header_fg", self.header_fg);
        kv("status_bg", self.status_bg);
        kv("status_fg", self.status_fg);
        kv("highlight_fg", self.highlight_fg);
        kv("highlight_bg", self.highlight_bg);
        kv("premium_badge", self.premium_badge);
        kv("dev_badge", self.dev_badge);
        kv("error_fg", self.error_fg);

        std::fs::write(path, buf).with_ctx(|| format!("write theme {}", path.display()))
    }

    /// Load the theme file, writing the default one first if it is missing.
    pub fn load_or_init(path: &Path) -> Self {
        if path.exists() {
            return Self::from_file(path).unwrap_or_else(Self::mocha);
        }
        let t = Self::mocha();
        if let Err(e) = t.write_file(path) {
            tracing::warn!(error = %e, "could not write default theme");
        }
        t
    }
}

/// The user an action menu was opened for, captured at open time so a reload
/// underneath the menu cannot retarget it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserTarget {
    pub id: UserId,
    pub username: String,
    pub premium: bool,
    pub is_dev: bool,
}

impl From<&UserRecord> for UserTarget {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            premium: u.premium,
            is_dev: u.is_dev,
        }
    }
}

/// Entries of the per-user action menu, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserAction {
    TogglePremium,
    ToggleDev,
    ChangePassword,
    DeleteUser,
    RevealPassword,
    DownloadLogs,
}

impl UserAction {
    pub const ALL: [UserAction; 6] = [
        UserAction::TogglePremium,
        UserAction::ToggleDev,
        UserAction::ChangePassword,
        UserAction::DeleteUser,
        UserAction::RevealPassword,
        UserAction::DownloadLogs,
    ];

    pub fn label(self, target: &UserTarget) -> &'static str {
        match self {
            UserAction::TogglePremium if target.premium => "Remove Premium",
            UserAction::TogglePremium => "Add Premium",
            UserAction::ToggleDev if target.is_dev => "Remove Dev",
            UserAction::ToggleDev => "Make Dev",
            UserAction::ChangePassword => "Change Password",
            UserAction::DeleteUser => "Delete User",
            UserAction::RevealPassword => "Reveal Password",
            UserAction::DownloadLogs => "Download Logs",
        }
    }
}

/// Modal dialog states.
#[derive(Clone, Debug)]
pub enum ModalState {
    Actions {
        selected: usize,
        target: UserTarget,
    },
    FilterMenu {
        selected: usize,
    },
    ChangePassword {
        target: UserTarget,
        password: String,
        error: Option<String>,
    },
    DeleteConfirm {
        target: UserTarget,
        selected: usize,
    },
    Info {
        message: String,
    },
    Help {
        scroll: u16,
    },
}

/// Outcome of the most recent applied fetch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Ready,
    Failed(String),
}

/// Single-writer holder of the last fetched user collection.
///
/// The collection is only ever swapped wholesale through [`Snapshot::replace`];
/// responses to reloads are sequenced so an older fetch cannot overwrite a
/// newer one.
#[derive(Debug, Default)]
pub struct Snapshot {
    users: Vec<UserRecord>,
    loaded: bool,
    issued: u64,
    applied: u64,
}

impl Snapshot {
    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn replace(&mut self, users: Vec<UserRecord>) {
        self.users = users;
        self.loaded = true;
    }

    /// At least one reload has succeeded, so `users` is a real snapshot.
    pub fn has_loaded(&self) -> bool {
        self.loaded
    }

    /// Allocate the id for a new reload request.
    pub fn next_request(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Record that the response to `request_id` arrived. Returns false when a
    /// newer response has already been applied and this one must be dropped.
    pub fn accept_response(&mut self, request_id: u64) -> bool {
        if request_id < self.applied {
            return false;
        }
        self.applied = request_id;
        true
    }

    /// A reload has been issued and its response has not arrived yet.
    pub fn is_loading(&self) -> bool {
        self.issued > self.applied
    }
}

/// Runtime settings handed over by the binary.
#[derive(Clone, Debug)]
pub struct Settings {
    pub api_url: String,
    pub debounce: Duration,
    pub export_dir: PathBuf,
    /// Directory holding `theme.conf` and `keybinds.conf`; `None` keeps
    /// everything in memory with defaults.
    pub config_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: crate::api::http::DEFAULT_ENDPOINT.to_string(),
            debounce: Duration::from_millis(300),
            export_dir: PathBuf::from("."),
            config_dir: None,
        }
    }
}

/// Location of a config file inside the settings' config dir.
pub fn config_file_path(settings: &Settings, name: &str) -> Option<PathBuf> {
    settings.config_dir.as_ref().map(|d| d.join(name))
}

pub struct AppState {
    pub started_at: Instant,
    pub settings: Settings,
    pub snapshot: Snapshot,
    pub load_state: LoadState,
    /// Filtered view of the snapshot, in snapshot order.
    pub users: Vec<UserRecord>,
    pub criteria: Criteria,
    pub search_debounce: Debouncer<()>,
    pub filter_passes: u64,
    pub selected_user_index: usize,
    pub rows_per_page: usize,
    pub input_mode: InputMode,
    pub theme: Theme,
    pub keymap: keymap::Keymap,
    pub modal: Option<ModalState>,
    pub show_keybinds: bool,
}

impl AppState {
    /// Build the initial state. Theme and keymap come from the config dir when
    /// one is set; nothing is fetched until the first reload.
    pub fn new(settings: Settings) -> Self {
        let theme = config_file_path(&settings, "theme.conf")
            .map(|p| Theme::load_or_init(&p))
            .unwrap_or_else(Theme::mocha);
        let keymap = config_file_path(&settings, "keybinds.conf")
            .map(|p| keymap::Keymap::load_or_init(&p))
            .unwrap_or_default();
        Self {
            started_at: Instant::now(),
            search_debounce: Debouncer::new(settings.debounce),
            settings,
            snapshot: Snapshot::default(),
            load_state: LoadState::NotLoaded,
            users: Vec::new(),
            criteria: Criteria::default(),
            filter_passes: 0,
            selected_user_index: 0,
            rows_per_page: 10,
            input_mode: InputMode::Normal,
            theme,
            keymap,
            modal: None,
            show_keybinds: false,
        }
    }

    /// The highlighted row. None while the list shows an error instead of rows.
    pub fn selected_user(&self) -> Option<&UserRecord> {
        if self.load_state != LoadState::Ready {
            return None;
        }
        self.users.get(self.selected_user_index)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

/// Re-export the application event loop entry function.
pub use update::run_app as run;
