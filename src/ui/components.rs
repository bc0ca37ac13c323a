//! Shared UI components (status bar, keybinds panel, modal helpers).
//!
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::keymap::{KeyAction, Keymap};
use crate::app::{AppState, InputMode, LoadState, ModalState};
use crate::filter::{Criteria, DateRange, TriState};
use std::collections::{BTreeMap, BTreeSet};

/// Short description of the non-default filter controls, e.g.
/// `search:"al" premium:yes date:last week`. Empty when unfiltered.
pub fn active_filters_summary(c: &Criteria) -> String {
    let mut parts = Vec::new();
    if !c.search.is_empty() {
        parts.push(format!("search:\"{}\"", c.search));
    }
    if c.premium != TriState::All {
        parts.push(format!("premium:{}", c.premium.label()));
    }
    if c.dev != TriState::All {
        parts.push(format!("dev:{}", c.dev.label()));
    }
    if c.date != DateRange::All {
        parts.push(format!("date:{}", c.date.label()));
    }
    parts.join(" ")
}

/// Render the bottom status bar with mode, counts and active filters.
pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let mode = match app.input_mode {
        InputMode::Normal => "NORMAL",
        InputMode::Search => "SEARCH",
        InputMode::Modal => "MODAL",
    };
    let load = if app.snapshot.is_loading() {
        "  loading..."
    } else {
        match app.load_state {
            LoadState::Failed(_) => "  load failed",
            _ => "",
        }
    };
    let filters = active_filters_summary(&app.criteria);
    let filters = if filters.is_empty() {
        String::new()
    } else {
        format!("  filters:[{filters}]")
    };
    let msg = format!(
        "mode: {mode}  shown:{}  total:{}{}{}",
        app.users.len(),
        app.snapshot.users().len(),
        filters,
        load
    );
    let p = Paragraph::new(msg).style(
        Style::default()
            .fg(app.theme.status_fg)
            .bg(app.theme.status_bg),
    );
    f.render_widget(p, area);
}

/// Render the right-side keybinds viewer with grouped sections.
pub fn render_keybinds_panel(f: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default()
        .title("Keybindings")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border));
    let inner = block.inner(area);

    let mut general: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();
    let mut filters: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();
    let mut navigation: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();

    for ((mods, code), action) in app.keymap.all_bindings() {
        let key = Keymap::format_key(mods, code);
        let (section, label) = match action {
            KeyAction::Quit => (&mut general, "Quit"),
            KeyAction::Reload => (&mut general, "Reload"),
            KeyAction::OpenActions => (&mut general, "User actions"),
            KeyAction::DeleteSelection => (&mut general, "Delete user"),
            KeyAction::OpenHelp => (&mut general, "Help"),
            KeyAction::ToggleKeybindsPane => (&mut general, "Toggle keybindings"),
            KeyAction::StartSearch => (&mut filters, "Search"),
            KeyAction::OpenFilterMenu => (&mut filters, "Filter menu"),
            KeyAction::CyclePremiumFilter => (&mut filters, "Premium"),
            KeyAction::CycleDevFilter => (&mut filters, "Dev"),
            KeyAction::CycleDateFilter => (&mut filters, "Registered"),
            KeyAction::ClearFilters => (&mut filters, "Clear filters"),
            KeyAction::MoveUp => (&mut navigation, "Move up"),
            KeyAction::MoveDown => (&mut navigation, "Move down"),
            KeyAction::PageUp => (&mut navigation, "Page up"),
            KeyAction::PageDown => (&mut navigation, "Page down"),
            KeyAction::Ignore => continue,
        };
        section.entry(label).or_default().insert(key);
    }

    let total_w = inner.width as usize;
    let sep = " │ ";
    let sep_w = sep.chars().count();
    let max_label = general
        .keys()
        .chain(filters.keys())
        .chain(navigation.keys())
        .map(|k| k.len())
        .max()
        .unwrap_or(0)
        .max("Cancel / Close".len());
    let col1_w = std::cmp::min(max_label, total_w.saturating_sub(sep_w + 8));

    let row = |label: &str, value: String| -> Line<'static> {
        let lbl: String = label.chars().take(col1_w).collect();
        Line::from(vec![
            Span::raw(format!("  {:>width$}{}", lbl, sep, width = col1_w)),
            Span::styled(value, Style::default().add_modifier(Modifier::ITALIC)),
        ])
    };

    let mut lines: Vec<Line> = Vec::new();
    for (title, section) in [
        ("General:", &general),
        ("Filters:", &filters),
        ("Navigation:", &navigation),
    ] {
        if !lines.is_empty() {
            lines.push(Line::raw(""));
        }
        lines.push(Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (label, keys) in section {
            lines.push(row(*label, keys.iter().cloned().collect::<Vec<_>>().join(", ")));
        }
    }

    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled(
        "Contextual:",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for (label, value) in [
        ("Cancel / Close", "Esc"),
        ("Confirm / Apply", "Enter"),
        ("Change value", "Left / Right"),
    ] {
        lines.push(row(label, value.to_string()));
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(block, area);
    f.render_widget(p, inner);
}

/// Compute a rectangle centered within `area` with a maximum size.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Render a generic informational modal dialog.
pub fn render_info_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    if let ModalState::Info { message } = state {
        let max_w = area.width.saturating_sub(6).max(30);
        let min_w = 50u16.min(max_w);
        let approx_lines = (message.len() as u16 / (min_w.saturating_sub(4).max(10))).max(1);
        let max_h = area.height.saturating_sub(6).max(5);
        let height = (approx_lines + 4).min(max_h).max(5);
        let rect = centered_rect(min_w, height, area);
        let p = Paragraph::new(message.clone())
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("Info")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.border)),
            );
        f.render_widget(Clear, rect);
        f.render_widget(p, rect);
    }
}

fn help_line(label: &str, key: &str, tail: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(key.to_string(), Style::default().add_modifier(Modifier::ITALIC)),
        Span::raw(tail.to_string()),
    ])
}

/// Render the help modal with usage information and key tips.
pub fn render_help_modal(f: &mut Frame, area: Rect, app: &AppState, scroll: u16) {
    let width = 80u16.min(area.width.saturating_sub(4)).max(60);
    let height = 22u16.min(area.height.saturating_sub(4)).max(14);
    let rect = centered_rect(width, height, area);
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let lines: Vec<Line> = vec![
        Line::from(Span::styled("Help", bold)),
        Line::raw(""),
        help_line("Navigation", "Arrow keys / j k, PageUp / PageDown", ""),
        help_line("Reload users", "F5 / R", ""),
        help_line("Keybindings panel", "Shift+K", " (toggle)"),
        help_line("Quit", "q", ""),
        Line::raw(""),
        Line::from(Span::styled("Filtering", bold)),
        help_line(
            "Search",
            "/",
            " then type; the list updates once you pause typing",
        ),
        help_line("  apply now / clear", "Enter / Esc", ""),
        help_line("Premium filter", "p", " (all, yes, no)"),
        help_line("Dev filter", "d", " (all, yes, no)"),
        help_line(
            "Registered filter",
            "r",
            " (all, last week, last month, last year)",
        ),
        help_line("Filter menu", "f", ""),
        help_line("Clear all filters", "c", ""),
        Line::raw(""),
        Line::from(Span::styled("Users", bold)),
        help_line(
            "Actions",
            "Enter",
            " (premium, dev, password, delete, reveal, logs)",
        ),
        help_line("Delete user", "Delete", ""),
        Line::raw(""),
        help_line("Close help", "Esc / Enter", ""),
    ];

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        );
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}

/// Render the filter selector modal.
pub fn render_filter_modal(f: &mut Frame, area: Rect, app: &AppState, state: &ModalState) {
    if let ModalState::FilterMenu { selected } = state {
        let width = 48u16.min(area.width.saturating_sub(4)).max(36);
        let rect = centered_rect(width, 9, area);
        let c = &app.criteria;
        let rows = [
            format!("Premium:    ◀ {} ▶", c.premium.label()),
            format!("Dev:        ◀ {} ▶", c.dev.label()),
            format!("Registered: ◀ {} ▶", c.date.label()),
            "Clear all filters".to_string(),
        ];
        let mut text = String::new();
        for (idx, label) in rows.iter().enumerate() {
            let marker = if idx == *selected { "▶" } else { " " };
            text.push_str(&format!("{marker} {label}\n"));
        }
        text.push_str("\nLeft/Right: change  Esc: close");
        let p = Paragraph::new(text).block(
            Block::default()
                .title("Filter users")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border)),
        );
        f.render_widget(Clear, rect);
        f.render_widget(p, rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_summary_lists_only_active_controls() {
        let mut c = Criteria::default();
        assert_eq!(active_filters_summary(&c), "");
        c.search = "al".into();
        c.dev = TriState::No;
        c.date = DateRange::LastMonth;
        assert_eq!(
            active_filters_summary(&c),
            "search:\"al\" dev:no date:last month"
        );
    }

    #[test]
    fn centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(centered_rect(40, 5, area), Rect::new(0, 2, 20, 5));
        assert_eq!(centered_rect(10, 4, area), Rect::new(5, 3, 10, 4));
    }
}
