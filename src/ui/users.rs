use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};

use crate::api::UserRecord;
use crate::app::{AppState, LoadState, ModalState, UserAction};

pub const MSG_NO_USERS: &str = "No users found.";
pub const MSG_FAILED: &str = "Error loading users. Please try again later.";
pub const MSG_NO_MATCHES: &str = "No users match the current filters.";
pub const MSG_LOADING: &str = "Loading users...";

/// Display-ready projection of one user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub premium: bool,
    pub dev: bool,
    /// `YYYY-MM-DD`, or `unknown` when the server date was unusable.
    pub registered: String,
}

impl UserRow {
    pub fn registered_label(&self) -> String {
        format!("Registered: {}", self.registered)
    }
}

impl From<&UserRecord> for UserRow {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id.to_string(),
            username: u.username.clone(),
            premium: u.premium,
            dev: u.is_dev,
            registered: u
                .created_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// What the user list shows. Every state is distinguishable without looking
/// at rendered text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListView {
    Loading,
    NoUsers,
    Failed(String),
    NoMatches,
    Rows(Vec<UserRow>),
}

impl ListView {
    /// Text shown in place of the table, if any.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ListView::Loading => Some(MSG_LOADING),
            ListView::NoUsers => Some(MSG_NO_USERS),
            ListView::Failed(_) => Some(MSG_FAILED),
            ListView::NoMatches => Some(MSG_NO_MATCHES),
            ListView::Rows(_) => None,
        }
    }
}

pub fn list_view(app: &AppState) -> ListView {
    match &app.load_state {
        LoadState::NotLoaded => ListView::Loading,
        LoadState::Failed(e) => ListView::Failed(e.clone()),
        LoadState::Ready if app.snapshot.users().is_empty() => ListView::NoUsers,
        LoadState::Ready if app.users.is_empty() => ListView::NoMatches,
        LoadState::Ready => ListView::Rows(app.users.iter().map(UserRow::from).collect()),
    }
}

pub fn render_users_table(f: &mut Frame, area: Rect, app: &mut AppState) {
    if area.width == 0 || area.height == 0 {
        tracing::debug!(?area, "user list has no room to render");
        return;
    }
    let block = Block::default()
        .title(format!("Users ({}/{})", app.users.len(), app.snapshot.users().len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border));

    let rows = match list_view(app) {
        ListView::Rows(rows) => rows,
        view => {
            let style = match &view {
                ListView::Failed(_) => Style::default().fg(app.theme.error_fg),
                _ => Style::default().fg(app.theme.muted),
            };
            let msg = view.message().unwrap_or_default();
            let p = Paragraph::new(msg)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .style(style)
                .block(block);
            f.render_widget(p, area);
            return;
        }
    };

    let body_height = area.height.saturating_sub(3) as usize;
    if body_height > 0 {
        app.rows_per_page = body_height;
    }

    let start = (app.selected_user_index / app.rows_per_page) * app.rows_per_page;
    let end = (start + app.rows_per_page).min(rows.len());
    let slice = &rows[start.min(end)..end];

    let table_rows = slice.iter().enumerate().map(|(i, r)| {
        let absolute_index = start + i;
        let style = if absolute_index == app.selected_user_index {
            Style::default()
                .fg(app.theme.highlight_fg)
                .bg(app.theme.highlight_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(app.theme.text)
        };
        Row::new(vec![
            Cell::from(r.username.clone()),
            Cell::from(badges(r, app)),
            Cell::from(r.registered.clone()),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Percentage(50),
        Constraint::Length(15),
        Constraint::Length(12),
    ];
    let header = Row::new(vec!["USERNAME", "BADGES", "REGISTERED"]).style(
        Style::default()
            .fg(app.theme.title)
            .add_modifier(Modifier::BOLD),
    );

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1);

    f.render_widget(table, area);
}

/// `Premium` / `Dev` badges; a badge is present only when its flag is set.
fn badges(row: &UserRow, app: &AppState) -> Line<'static> {
    let mut spans = Vec::new();
    if row.premium {
        spans.push(Span::styled(
            "Premium",
            Style::default().fg(app.theme.premium_badge),
        ));
    }
    if row.dev {
        if !spans.is_empty() {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled("Dev", Style::default().fg(app.theme.dev_badge)));
    }
    Line::from(spans)
}

pub fn render_user_details(f: &mut Frame, area: Rect, app: &AppState) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let text = match app.selected_user().map(UserRow::from) {
        Some(r) => {
            let yes_no = |b: bool| if b { "yes" } else { "no" };
            format!(
                "Username: {}\nID: {}\nPremium: {}\nDev: {}\n{}\n\nEnter: actions",
                r.username,
                r.id,
                yes_no(r.premium),
                yes_no(r.dev),
                r.registered_label()
            )
        }
        None => String::new(),
    };
    let p = Paragraph::new(text)
        .style(Style::default().fg(app.theme.text))
        .block(
            Block::default()
                .title("Details")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        );
    f.render_widget(p, area);
}

pub fn render_user_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    match state {
        ModalState::Actions { selected, target } => {
            let height = UserAction::ALL.len() as u16 + 2;
            let rect = crate::ui::components::centered_rect(32, height, area);
            let mut text = String::new();
            for (idx, action) in UserAction::ALL.iter().enumerate() {
                let marker = if idx == *selected { "▶" } else { " " };
                text.push_str(&format!("{} {}\n", marker, action.label(target)));
            }
            let p = Paragraph::new(text).block(
                Block::default()
                    .title(format!("Actions: {}", target.username))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.border)),
            );
            f.render_widget(Clear, rect);
            f.render_widget(p, rect);
        }
        ModalState::ChangePassword {
            target,
            password,
            error,
        } => {
            let height = if error.is_some() { 8 } else { 6 };
            let rect = crate::ui::components::centered_rect(54, height, area);
            let mut lines = vec![
                Line::raw(format!("New password for '{}':", target.username)),
                Line::raw("*".repeat(password.chars().count())),
            ];
            if let Some(err) = error {
                lines.push(Line::raw(""));
                lines.push(Line::from(Span::styled(
                    err.clone(),
                    Style::default().fg(app.theme.error_fg),
                )));
            }
            let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
                Block::default()
                    .title("Change password")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.border)),
            );
            f.render_widget(Clear, rect);
            f.render_widget(p, rect);
        }
        ModalState::DeleteConfirm { target, selected } => {
            let rect = crate::ui::components::centered_rect(50, 7, area);
            let yes = if *selected == 0 { "[Yes]" } else { " Yes " };
            let no = if *selected == 1 { "[No]" } else { " No  " };
            let body = format!(
                "Are you sure you want to delete user '{}'?\n\n  {}    {}",
                target.username, yes, no
            );
            let p = Paragraph::new(body).wrap(Wrap { trim: false }).block(
                Block::default()
                    .title("Confirm delete")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.border)),
            );
            f.render_widget(Clear, rect);
            f.render_widget(p, rect);
        }
        _ => {}
    }
}
