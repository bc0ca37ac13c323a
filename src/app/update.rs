use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::{AdminApi, HttpApi, UserUpdate};
use crate::app::jobs::{Job, JobOutcome, JobSink, MutationKind, Worker};
use crate::app::keymap::KeyAction;
use crate::app::{AppState, InputMode, LoadState, ModalState, Settings, UserAction, UserTarget};
use crate::filter::{Criteria, apply_filters};
use crate::ui;

const TICK: Duration = Duration::from_millis(100);
const MIN_PASSWORD_LEN: usize = 8;

/// Rows of the filter menu, in display order.
pub const FILTER_MENU_ROWS: usize = 4;

/// Whether the event loop keeps going after a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: Settings,
) -> Result<()> {
    let api: Arc<dyn AdminApi> = Arc::new(HttpApi::new(&settings.api_url));
    let worker = Worker::new(api, settings.export_dir.clone());
    let mut app = AppState::new(settings);
    tracing::info!(endpoint = %app.settings.api_url, "starting admin client");

    request_reload(&mut app, &worker);

    loop {
        for outcome in worker.drain() {
            apply_outcome(&mut app, &worker, outcome);
        }
        tick(&mut app, Instant::now());

        terminal.draw(|f| {
            ui::render(f, &mut app);
        })?;

        // wake up in time for a pending search debounce
        let timeout = app
            .search_debounce
            .time_until(Instant::now())
            .map_or(TICK, |left| left.min(TICK));
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && handle_key(&mut app, &worker, key, Instant::now()) == Flow::Quit
        {
            break;
        }
    }

    tracing::info!(uptime = ?app.started_at.elapsed(), "exiting");
    Ok(())
}

/// Fire the search debounce if its quiet period has elapsed. Returns true when
/// a filter pass ran.
pub fn tick(app: &mut AppState, now: Instant) -> bool {
    if app.search_debounce.poll(now).is_some() {
        apply_filters(app);
        return true;
    }
    false
}

/// Issue a new snapshot fetch.
pub fn request_reload(app: &mut AppState, jobs: &dyn JobSink) {
    let request_id = app.snapshot.next_request();
    tracing::info!(request_id, "reloading users");
    jobs.submit(Job::Reload { request_id });
}

pub fn handle_key(app: &mut AppState, jobs: &dyn JobSink, key: KeyEvent, now: Instant) -> Flow {
    match app.input_mode {
        InputMode::Normal => return handle_normal_key(app, jobs, key),
        InputMode::Search => handle_search_key(app, key.code, now),
        InputMode::Modal => handle_modal_key(app, jobs, key.code),
    }
    Flow::Continue
}

fn handle_normal_key(app: &mut AppState, jobs: &dyn JobSink, key: KeyEvent) -> Flow {
    let Some(action) = app.keymap.resolve(&key) else {
        return Flow::Continue;
    };
    match action {
        KeyAction::Quit => return Flow::Quit,
        KeyAction::Ignore => {}
        KeyAction::StartSearch => app.input_mode = InputMode::Search,
        KeyAction::OpenFilterMenu => open_modal(app, ModalState::FilterMenu { selected: 0 }),
        KeyAction::OpenHelp => open_modal(app, ModalState::Help { scroll: 0 }),
        KeyAction::Reload => request_reload(app, jobs),
        KeyAction::CyclePremiumFilter => {
            app.criteria.premium = app.criteria.premium.next();
            apply_filters(app);
        }
        KeyAction::CycleDevFilter => {
            app.criteria.dev = app.criteria.dev.next();
            apply_filters(app);
        }
        KeyAction::CycleDateFilter => {
            app.criteria.date = app.criteria.date.next();
            apply_filters(app);
        }
        KeyAction::ClearFilters => clear_filters(app),
        KeyAction::OpenActions => {
            if let Some(u) = app.selected_user() {
                let target = UserTarget::from(u);
                open_modal(app, ModalState::Actions { selected: 0, target });
            }
        }
        KeyAction::DeleteSelection => {
            if let Some(u) = app.selected_user() {
                let target = UserTarget::from(u);
                open_modal(app, ModalState::DeleteConfirm { target, selected: 1 });
            }
        }
        KeyAction::ToggleKeybindsPane => app.show_keybinds = !app.show_keybinds,
        KeyAction::MoveUp => {
            app.selected_user_index = app.selected_user_index.saturating_sub(1);
        }
        KeyAction::MoveDown => {
            if app.selected_user_index + 1 < app.users.len() {
                app.selected_user_index += 1;
            }
        }
        KeyAction::PageUp => {
            let rpp = app.rows_per_page.max(1);
            app.selected_user_index = app.selected_user_index.saturating_sub(rpp);
        }
        KeyAction::PageDown => {
            let rpp = app.rows_per_page.max(1);
            let new_idx = app.selected_user_index.saturating_add(rpp);
            app.selected_user_index = new_idx.min(app.users.len().saturating_sub(1));
        }
    }
    Flow::Continue
}

fn handle_search_key(app: &mut AppState, code: KeyCode, now: Instant) {
    match code {
        KeyCode::Enter => {
            app.search_debounce.clear();
            apply_filters(app);
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Esc => {
            app.criteria.search.clear();
            app.search_debounce.clear();
            apply_filters(app);
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            app.criteria.search.pop();
            app.search_debounce.schedule(now, ());
        }
        KeyCode::Char(c) => {
            app.criteria.search.push(c);
            app.search_debounce.schedule(now, ());
        }
        _ => {}
    }
}

fn clear_filters(app: &mut AppState) {
    app.criteria = Criteria::default();
    app.search_debounce.clear();
    apply_filters(app);
}

/// Show `modal`, first settling any search still waiting on its quiet period
/// so the list underneath is current.
fn open_modal(app: &mut AppState, modal: ModalState) {
    if app.search_debounce.flush().is_some() {
        apply_filters(app);
    }
    app.modal = Some(modal);
    app.input_mode = InputMode::Modal;
}

fn close_modal(app: &mut AppState) {
    app.modal = None;
    app.input_mode = InputMode::Normal;
}

fn show_info(app: &mut AppState, message: impl Into<String>) {
    open_modal(
        app,
        ModalState::Info {
            message: message.into(),
        },
    );
}

fn handle_modal_key(app: &mut AppState, jobs: &dyn JobSink, code: KeyCode) {
    match &mut app.modal {
        Some(ModalState::Actions { selected, target }) => match code {
            KeyCode::Esc => close_modal(app),
            KeyCode::Up | KeyCode::Char('k') => *selected = selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if *selected + 1 < UserAction::ALL.len() {
                    *selected += 1;
                }
            }
            KeyCode::Enter => {
                let action = UserAction::ALL[(*selected).min(UserAction::ALL.len() - 1)];
                let target = target.clone();
                run_user_action(app, jobs, action, target);
            }
            _ => {}
        },
        Some(ModalState::FilterMenu { selected }) => match code {
            KeyCode::Esc | KeyCode::Char('f') => close_modal(app),
            KeyCode::Up | KeyCode::Char('k') => *selected = selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if *selected + 1 < FILTER_MENU_ROWS {
                    *selected += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                let row = *selected;
                step_filter(app, row, false);
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Enter | KeyCode::Char(' ') => {
                let row = *selected;
                step_filter(app, row, true);
            }
            _ => {}
        },
        Some(ModalState::ChangePassword {
            target,
            password,
            error,
        }) => match code {
            KeyCode::Esc => close_modal(app),
            KeyCode::Backspace => {
                password.pop();
                *error = None;
            }
            KeyCode::Char(c) => {
                password.push(c);
                *error = None;
            }
            KeyCode::Enter => {
                if password.is_empty() {
                    close_modal(app);
                } else if password.chars().count() < MIN_PASSWORD_LEN {
                    *error = Some("Password must be at least 8 characters long.".to_string());
                } else {
                    let job = Job::Update {
                        id: target.id.clone(),
                        username: target.username.clone(),
                        update: UserUpdate::Password(std::mem::take(password)),
                    };
                    tracing::info!(user = %target.username, "changing password");
                    jobs.submit(job);
                    close_modal(app);
                }
            }
            _ => {}
        },
        Some(ModalState::DeleteConfirm { target, selected }) => match code {
            KeyCode::Esc | KeyCode::Char('n') => close_modal(app),
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
                *selected = if *selected == 0 { 1 } else { 0 };
            }
            KeyCode::Char('y') => *selected = 0,
            KeyCode::Enter => {
                if *selected == 0 {
                    tracing::info!(user = %target.username, "deleting user");
                    jobs.submit(Job::Delete {
                        id: target.id.clone(),
                        username: target.username.clone(),
                    });
                }
                close_modal(app);
            }
            _ => {}
        },
        Some(ModalState::Help { scroll }) => match code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q') => {
                close_modal(app)
            }
            KeyCode::Up | KeyCode::Char('k') => *scroll = scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => *scroll = scroll.saturating_add(1),
            KeyCode::PageUp => *scroll = scroll.saturating_sub(10),
            KeyCode::PageDown => *scroll = scroll.saturating_add(10),
            _ => {}
        },
        Some(ModalState::Info { .. }) => {
            if matches!(code, KeyCode::Esc | KeyCode::Enter) {
                close_modal(app);
            }
        }
        None => close_modal(app),
    }
}

/// Step the filter control on `row` of the filter menu and re-filter.
fn step_filter(app: &mut AppState, row: usize, forward: bool) {
    let c = &mut app.criteria;
    match row {
        0 => c.premium = if forward { c.premium.next() } else { c.premium.prev() },
        1 => c.dev = if forward { c.dev.next() } else { c.dev.prev() },
        2 => c.date = if forward { c.date.next() } else { c.date.prev() },
        _ => {
            clear_filters(app);
            return;
        }
    }
    apply_filters(app);
}

fn run_user_action(app: &mut AppState, jobs: &dyn JobSink, action: UserAction, target: UserTarget) {
    tracing::info!(user = %target.username, ?action, "user action");
    match action {
        UserAction::TogglePremium => {
            jobs.submit(Job::Update {
                id: target.id,
                username: target.username,
                update: UserUpdate::Premium(!target.premium),
            });
            close_modal(app);
        }
        UserAction::ToggleDev => {
            jobs.submit(Job::Update {
                id: target.id,
                username: target.username,
                update: UserUpdate::Dev(!target.is_dev),
            });
            close_modal(app);
        }
        UserAction::ChangePassword => {
            app.modal = Some(ModalState::ChangePassword {
                target,
                password: String::new(),
                error: None,
            });
        }
        UserAction::DeleteUser => {
            app.modal = Some(ModalState::DeleteConfirm {
                target,
                selected: 1,
            });
        }
        UserAction::RevealPassword => {
            jobs.submit(Job::RevealPassword {
                id: target.id,
                username: target.username,
            });
            close_modal(app);
        }
        UserAction::DownloadLogs => {
            jobs.submit(Job::DownloadLogs);
            close_modal(app);
        }
    }
}

/// Fold a finished job into the state.
pub fn apply_outcome(app: &mut AppState, jobs: &dyn JobSink, outcome: JobOutcome) {
    match outcome {
        JobOutcome::Users { request_id, result } => {
            if !app.snapshot.accept_response(request_id) {
                tracing::debug!(request_id, "dropping stale reload response");
                return;
            }
            match result {
                Ok(users) => {
                    tracing::info!(request_id, count = users.len(), "users loaded");
                    app.snapshot.replace(users);
                    app.load_state = LoadState::Ready;
                    apply_filters(app);
                }
                Err(e) => {
                    tracing::error!(request_id, error = %e, "error loading users");
                    app.load_state = LoadState::Failed(e);
                }
            }
        }
        JobOutcome::Mutation { kind, result } => match (kind, result) {
            (MutationKind::Premium { username, enabled }, Ok(())) => {
                tracing::info!(user = %username, enabled, "premium status updated");
                request_reload(app, jobs);
            }
            (MutationKind::Premium { username, .. }, Err(e)) => {
                tracing::warn!(user = %username, error = %e, "failed to update premium status");
                show_info(app, format!("Failed to update premium status: {e}"));
            }
            (MutationKind::Dev { username, enabled }, Ok(())) => {
                tracing::info!(user = %username, enabled, "dev status updated");
                request_reload(app, jobs);
            }
            (MutationKind::Dev { username, .. }, Err(e)) => {
                tracing::warn!(user = %username, error = %e, "failed to update dev status");
                show_info(app, format!("Failed to update dev status: {e}"));
            }
            (MutationKind::Password { username }, Ok(())) => {
                tracing::info!(user = %username, "password changed");
                show_info(app, "Password changed successfully.");
                request_reload(app, jobs);
            }
            (MutationKind::Password { username }, Err(e)) => {
                tracing::warn!(user = %username, error = %e, "failed to change password");
                show_info(app, format!("Failed to change password: {e}"));
            }
            (MutationKind::Delete { username }, Ok(())) => {
                tracing::info!(user = %username, "user deleted");
                show_info(app, "User deleted successfully.");
                request_reload(app, jobs);
            }
            (MutationKind::Delete { username }, Err(e)) => {
                tracing::warn!(user = %username, error = %e, "failed to delete user");
                show_info(app, format!("Error deleting user: {e}"));
            }
        },
        JobOutcome::Password { username, result } => match result {
            Ok(pw) => {
                tracing::info!(user = %username, "password revealed");
                show_info(app, format!("User's password: {pw}"));
            }
            Err(e) => {
                tracing::warn!(user = %username, error = %e, "failed to reveal password");
                show_info(app, format!("Failed to reveal password: {e}"));
            }
        },
        JobOutcome::LogsExported { result } => match result {
            Ok(path) => {
                tracing::info!(path = %path.display(), "logs exported");
                show_info(app, format!("Logs saved to {}", path.display()));
            }
            Err(e) => {
                tracing::error!(error = %e, "error fetching logs and statistics");
                show_info(app, format!("Failed to download logs: {e}"));
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{UserId, UserRecord};
    use crate::filter::TriState;
    use crossterm::event::KeyModifiers;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Job>>);

    impl JobSink for Recorder {
        fn submit(&self, job: Job) {
            self.0.borrow_mut().push(job);
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn user(id: i64, name: &str, premium: bool) -> UserRecord {
        UserRecord {
            id: UserId::Num(id),
            username: name.to_string(),
            premium,
            is_dev: false,
            created_at: None,
        }
    }

    fn loaded(users: Vec<UserRecord>) -> AppState {
        let mut app = AppState::default();
        let id = app.snapshot.next_request();
        apply_outcome(
            &mut app,
            &Recorder::default(),
            JobOutcome::Users { request_id: id, result: Ok(users) },
        );
        app
    }

    #[test]
    fn search_burst_filters_once_after_quiet_period() {
        let mut app = loaded(vec![user(1, "alice", false), user(2, "bob", false)]);
        let sink = Recorder::default();
        let t0 = Instant::now();
        let before = app.filter_passes;

        handle_key(&mut app, &sink, key(KeyCode::Char('/')), t0);
        for (i, c) in "alic".chars().enumerate() {
            handle_key(&mut app, &sink, key(KeyCode::Char(c)), t0 + Duration::from_millis(i as u64 * 50));
        }
        assert!(!tick(&mut app, t0 + Duration::from_millis(400)));
        assert_eq!(app.users.len(), 2);
        assert!(tick(&mut app, t0 + Duration::from_millis(450)));
        assert!(!tick(&mut app, t0 + Duration::from_millis(2000)));
        assert_eq!(app.filter_passes, before + 1);
        assert_eq!(app.users.len(), 1);
    }

    #[test]
    fn enter_flushes_pending_search() {
        let mut app = loaded(vec![user(1, "alice", false), user(2, "bob", false)]);
        let sink = Recorder::default();
        let t0 = Instant::now();
        handle_key(&mut app, &sink, key(KeyCode::Char('/')), t0);
        handle_key(&mut app, &sink, key(KeyCode::Char('b')), t0);
        handle_key(&mut app, &sink, key(KeyCode::Enter), t0);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.users.len(), 1);
        assert!(!app.search_debounce.has_pending());
    }

    #[test]
    fn esc_clears_search_immediately() {
        let mut app = loaded(vec![user(1, "alice", false), user(2, "bob", false)]);
        app.criteria.search = "bob".into();
        apply_filters(&mut app);
        let sink = Recorder::default();
        handle_key(&mut app, &sink, key(KeyCode::Char('/')), Instant::now());
        handle_key(&mut app, &sink, key(KeyCode::Esc), Instant::now());
        assert!(app.criteria.search.is_empty());
        assert_eq!(app.users.len(), 2);
    }

    #[test]
    fn selector_key_refilters_synchronously() {
        let mut app = loaded(vec![user(1, "alice", true), user(2, "bob", false)]);
        let before = app.filter_passes;
        handle_key(&mut app, &Recorder::default(), key(KeyCode::Char('p')), Instant::now());
        assert_eq!(app.criteria.premium, TriState::Yes);
        assert_eq!(app.filter_passes, before + 1);
        assert_eq!(app.users.len(), 1);
    }

    #[test]
    fn short_password_is_rejected_without_a_call() {
        let mut app = loaded(vec![user(1, "alice", false)]);
        let sink = Recorder::default();
        let now = Instant::now();
        handle_key(&mut app, &sink, key(KeyCode::Enter), now);
        for _ in 0..2 {
            handle_key(&mut app, &sink, key(KeyCode::Down), now);
        }
        handle_key(&mut app, &sink, key(KeyCode::Enter), now);
        for c in "short".chars() {
            handle_key(&mut app, &sink, key(KeyCode::Char(c)), now);
        }
        handle_key(&mut app, &sink, key(KeyCode::Enter), now);
        match &app.modal {
            Some(ModalState::ChangePassword { error, .. }) => assert_eq!(
                error.as_deref(),
                Some("Password must be at least 8 characters long.")
            ),
            other => panic!("unexpected modal: {other:?}"),
        }
        assert!(sink.0.borrow().is_empty());
    }

    #[test]
    fn delete_confirm_defaults_to_no() {
        let mut app = loaded(vec![user(1, "alice", false)]);
        let sink = Recorder::default();
        let now = Instant::now();
        handle_key(&mut app, &sink, key(KeyCode::Delete), now);
        handle_key(&mut app, &sink, key(KeyCode::Enter), now);
        assert!(sink.0.borrow().is_empty());
        assert!(app.modal.is_none());

        handle_key(&mut app, &sink, key(KeyCode::Delete), now);
        handle_key(&mut app, &sink, key(KeyCode::Char('y')), now);
        handle_key(&mut app, &sink, key(KeyCode::Enter), now);
        assert_eq!(
            *sink.0.borrow(),
            vec![Job::Delete { id: UserId::Num(1), username: "alice".into() }]
        );
    }

    #[test]
    fn toggle_premium_sends_inverse_flag() {
        let mut app = loaded(vec![user(1, "alice", true)]);
        let sink = Recorder::default();
        let now = Instant::now();
        handle_key(&mut app, &sink, key(KeyCode::Enter), now);
        handle_key(&mut app, &sink, key(KeyCode::Enter), now);
        assert_eq!(
            *sink.0.borrow(),
            vec![Job::Update {
                id: UserId::Num(1),
                username: "alice".into(),
                update: UserUpdate::Premium(false),
            }]
        );
    }

    #[test]
    fn stale_reload_does_not_overwrite_newer_snapshot() {
        let mut app = AppState::default();
        let sink = Recorder::default();
        let old = app.snapshot.next_request();
        let new = app.snapshot.next_request();
        apply_outcome(
            &mut app,
            &sink,
            JobOutcome::Users { request_id: new, result: Ok(vec![user(2, "new", false)]) },
        );
        apply_outcome(
            &mut app,
            &sink,
            JobOutcome::Users { request_id: old, result: Ok(vec![user(1, "old", false)]) },
        );
        assert_eq!(app.snapshot.users()[0].username, "new");
    }

    #[test]
    fn failed_reload_keeps_previous_snapshot() {
        let mut app = loaded(vec![user(1, "alice", false)]);
        let id = app.snapshot.next_request();
        apply_outcome(
            &mut app,
            &Recorder::default(),
            JobOutcome::Users { request_id: id, result: Err("boom".into()) },
        );
        assert_eq!(app.load_state, LoadState::Failed("boom".into()));
        assert_eq!(app.snapshot.users().len(), 1);
    }

    #[test]
    fn failed_reload_hides_rows_until_next_filter_pass() {
        let mut app = loaded(vec![user(1, "alice", false)]);
        let sink = Recorder::default();
        let id = app.snapshot.next_request();
        apply_outcome(
            &mut app,
            &sink,
            JobOutcome::Users { request_id: id, result: Err("boom".into()) },
        );
        assert!(app.selected_user().is_none());
        handle_key(&mut app, &sink, key(KeyCode::Enter), Instant::now());
        assert!(app.modal.is_none());
        handle_key(&mut app, &sink, key(KeyCode::Delete), Instant::now());
        assert!(app.modal.is_none());

        // premium cycles all -> yes -> no -> all, each pass over the kept snapshot
        for _ in 0..3 {
            handle_key(&mut app, &sink, key(KeyCode::Char('p')), Instant::now());
        }
        assert_eq!(app.load_state, LoadState::Ready);
        assert_eq!(app.selected_user().map(|u| u.username.as_str()), Some("alice"));
        handle_key(&mut app, &sink, key(KeyCode::Enter), Instant::now());
        assert!(matches!(app.modal, Some(ModalState::Actions { .. })));
    }

    #[test]
    fn failed_first_load_stays_failed_after_filter_pass() {
        let mut app = AppState::default();
        let id = app.snapshot.next_request();
        apply_outcome(
            &mut app,
            &Recorder::default(),
            JobOutcome::Users { request_id: id, result: Err("boom".into()) },
        );
        handle_key(&mut app, &Recorder::default(), key(KeyCode::Char('p')), Instant::now());
        assert_eq!(app.load_state, LoadState::Failed("boom".into()));
    }

    #[test]
    fn successful_delete_reloads_and_reports() {
        let mut app = loaded(vec![user(1, "alice", false)]);
        let sink = Recorder::default();
        apply_outcome(
            &mut app,
            &sink,
            JobOutcome::Mutation {
                kind: MutationKind::Delete { username: "alice".into() },
                result: Ok(()),
            },
        );
        assert!(matches!(sink.0.borrow()[0], Job::Reload { .. }));
        match &app.modal {
            Some(ModalState::Info { message }) => assert_eq!(message, "User deleted successfully."),
            other => panic!("unexpected modal: {other:?}"),
        }
    }
}
