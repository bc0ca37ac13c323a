//! Frame layout: header with the search prompt, user table with a details
//! pane, optional keybindings panel, status bar, and modal overlays.
pub mod components;
pub mod users;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::{AppState, InputMode, ModalState};

pub fn render(f: &mut Frame, app: &mut AppState) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.area());

    let (main, side) = if app.show_keybinds {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
            .split(root[1]);
        (cols[0], Some(cols[1]))
    } else {
        (root[1], None)
    };
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main);

    render_header(f, root[0], app);
    users::render_users_table(f, body[0], app);
    users::render_user_details(f, body[1], app);
    if let Some(side) = side {
        components::render_keybinds_panel(f, side, app);
    }
    components::render_status_bar(f, root[2], app);

    if app.modal.is_some() {
        let area = f.area();
        render_modal(f, area, app);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &AppState) {
    let search = match app.input_mode {
        InputMode::Search => format!("Search: {}_", app.criteria.search),
        _ if !app.criteria.search.is_empty() => format!("Search: {}", app.criteria.search),
        _ => "/: search".to_string(),
    };
    let p = Paragraph::new(format!(
        "{search}    f: filters  p/d/r: premium/dev/registered  F5: reload  ?: help  q: quit"
    ))
    .block(
        Block::default()
            .title("usradmin")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    )
    .style(Style::default().fg(app.theme.header_fg).bg(app.theme.header_bg));
    f.render_widget(p, area);
}

fn render_modal(f: &mut Frame, area: Rect, app: &AppState) {
    let Some(state) = app.modal.as_ref() else {
        return;
    };
    match state {
        ModalState::Actions { .. }
        | ModalState::ChangePassword { .. }
        | ModalState::DeleteConfirm { .. } => users::render_user_modal(f, area, app, state),
        ModalState::FilterMenu { .. } => components::render_filter_modal(f, area, app, state),
        ModalState::Info { .. } => components::render_info_modal(f, area, app, state),
        ModalState::Help { scroll } => components::render_help_modal(f, area, app, *scroll),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::LoadState;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn empty_snapshot_renders_no_users_message() {
        let mut app = AppState::default();
        app.load_state = LoadState::Ready;
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains(users::MSG_NO_USERS));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut app = AppState::default();
        app.modal = Some(ModalState::Help { scroll: 0 });
        let mut terminal = Terminal::new(TestBackend::new(1, 1)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
    }
}
