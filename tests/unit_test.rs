// Unit tests for usradmin
// These tests work with the public API only

#[cfg(test)]
mod filter_tests {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use serde_json::json;
    use usradmin::api::{UserId, UserRecord};
    use usradmin::filter::{Criteria, DateRange, TriState, filter_users};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 9, 30, 0).unwrap()
    }

    fn create_test_user(id: i64, name: &str, premium: bool, dev: bool) -> UserRecord {
        UserRecord {
            id: UserId::Num(id),
            username: name.to_string(),
            premium,
            is_dev: dev,
            created_at: Some(now() - TimeDelta::days(id)),
        }
    }

    fn sample_snapshot() -> Vec<UserRecord> {
        vec![
            create_test_user(1, "Alice", true, false),
            create_test_user(3, "bob", false, true),
            create_test_user(10, "alina", true, true),
            create_test_user(40, "carol", false, false),
            create_test_user(400, "dave", true, false),
        ]
    }

    fn ids(users: &[UserRecord]) -> Vec<UserId> {
        users.iter().map(|u| u.id.clone()).collect()
    }

    #[test]
    fn test_unfiltered_returns_snapshot_in_order() {
        let snapshot = sample_snapshot();
        let criteria = Criteria::default();
        assert!(criteria.is_unfiltered());
        assert_eq!(filter_users(&snapshot, &criteria, now()), snapshot);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let snapshot = sample_snapshot();
        let criteria = Criteria {
            search: "a".into(),
            premium: TriState::Yes,
            dev: TriState::All,
            date: DateRange::LastMonth,
        };
        let once = filter_users(&snapshot, &criteria, now());
        let twice = filter_users(&once, &criteria, now());
        assert_eq!(once, twice);
        assert_eq!(ids(&once), vec![UserId::Num(1), UserId::Num(10)]);
    }

    #[test]
    fn test_search_case_insensitive() {
        let snapshot = sample_snapshot();
        for term in ["ali", "ALI", "aLi"] {
            let criteria = Criteria {
                search: term.into(),
                ..Criteria::default()
            };
            let found = filter_users(&snapshot, &criteria, now());
            assert_eq!(ids(&found), vec![UserId::Num(1), UserId::Num(10)], "term {term}");
        }
    }

    #[test]
    fn test_search_special_characters_and_no_panic() {
        let mut snapshot = sample_snapshot();
        snapshot.push(create_test_user(2, "we!rd.name+[x]", false, false));
        let criteria = Criteria {
            search: "+[x".into(),
            ..Criteria::default()
        };
        let found = filter_users(&snapshot, &criteria, now());
        assert_eq!(ids(&found), vec![UserId::Num(2)]);
    }

    #[test]
    fn test_premium_filter_accepts_loose_server_flags() {
        let snapshot: Vec<UserRecord> = serde_json::from_value(json!([
            { "id": 1, "username": "zero", "premium": 0 },
            { "id": 2, "username": "one", "premium": 1 },
            { "id": 3, "username": "yes", "premium": true },
            { "id": 4, "username": "text", "premium": "true" },
            { "id": 5, "username": "missing" }
        ]))
        .unwrap();
        let criteria = Criteria {
            premium: TriState::Yes,
            ..Criteria::default()
        };
        let found = filter_users(&snapshot, &criteria, now());
        assert_eq!(ids(&found), vec![UserId::Num(2), UserId::Num(3), UserId::Num(4)]);

        let criteria = Criteria {
            premium: TriState::No,
            ..Criteria::default()
        };
        let found = filter_users(&snapshot, &criteria, now());
        assert_eq!(ids(&found), vec![UserId::Num(1), UserId::Num(5)]);
    }

    #[test]
    fn test_last_week_boundary() {
        let mut old = create_test_user(1, "old", false, false);
        old.created_at = Some(now() - TimeDelta::days(8));
        let mut recent = create_test_user(2, "recent", false, false);
        recent.created_at = Some(now() - TimeDelta::days(6));
        let criteria = Criteria {
            date: DateRange::LastWeek,
            ..Criteria::default()
        };
        let found = filter_users(&[old, recent], &criteria, now());
        assert_eq!(ids(&found), vec![UserId::Num(2)]);
    }

    #[test]
    fn test_date_ranges_widen() {
        let snapshot = sample_snapshot();
        let count = |date| {
            let criteria = Criteria {
                date,
                ..Criteria::default()
            };
            filter_users(&snapshot, &criteria, now()).len()
        };
        assert_eq!(count(DateRange::LastWeek), 2);
        assert_eq!(count(DateRange::LastMonth), 3);
        assert_eq!(count(DateRange::LastYear), 4);
        assert_eq!(count(DateRange::All), 5);
    }

    #[test]
    fn test_single_premium_user_scenario() {
        let snapshot: Vec<UserRecord> = serde_json::from_value(json!([
            { "id": 1, "username": "bob", "premium": true, "isDev": false, "createdAt": "2023-01-01" }
        ]))
        .unwrap();
        let criteria = Criteria {
            search: String::new(),
            premium: TriState::Yes,
            dev: TriState::All,
            date: DateRange::All,
        };
        let found = filter_users(&snapshot, &criteria, Utc::now());
        assert_eq!(ids(&found), vec![UserId::Num(1)]);
    }

    #[test]
    fn test_unparseable_date_excluded_from_ranges_only() {
        let snapshot: Vec<UserRecord> = serde_json::from_value(json!([
            { "id": 1, "username": "ghost", "createdAt": "not a date" }
        ]))
        .unwrap();
        assert_eq!(snapshot[0].created_at, None);
        let mut criteria = Criteria::default();
        assert_eq!(filter_users(&snapshot, &criteria, now()).len(), 1);
        criteria.date = DateRange::LastYear;
        assert!(filter_users(&snapshot, &criteria, now()).is_empty());
    }
}

#[cfg(test)]
mod debounce_tests {
    use std::time::{Duration, Instant};
    use usradmin::debounce::Debouncer;

    #[test]
    fn test_burst_of_five_fires_once() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        for i in 0..5u64 {
            d.schedule(t0 + Duration::from_millis(i * 50), i);
        }
        assert_eq!(d.deadline(), Some(t0 + Duration::from_millis(500)));
        assert_eq!(d.poll(t0 + Duration::from_millis(499)), None);
        assert_eq!(d.poll(t0 + Duration::from_millis(500)), Some(4));
        assert_eq!(d.poll(t0 + Duration::from_millis(900)), None);
    }

    #[test]
    fn test_cancel_and_clear() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        let h = d.schedule(t0, ());
        assert!(d.cancel(h));
        assert!(!d.cancel(h));
        d.schedule(t0, ());
        d.clear();
        assert!(!d.has_pending());
        assert_eq!(d.time_until(t0), None);
    }
}

#[cfg(test)]
mod error_handling_tests {
    use usradmin::error::{ApiError, Context, SimpleError, simple_error};

    #[test]
    fn test_context_error_chaining() {
        let base_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let result: Result<(), std::io::Error> = Err(base_error);

        let with_context = result.with_ctx(|| "Failed to read config file".to_string());

        let err = with_context.unwrap_err();
        let err_string = err.to_string();
        assert!(err_string.contains("Failed to read config file"));
        assert!(err_string.contains("file not found"));

        let source = err.source();
        assert!(source.is_some());
        assert!(source.unwrap().to_string().contains("file not found"));
    }

    #[test]
    fn test_simple_error() {
        let err = simple_error("Custom error message");
        assert_eq!(err.to_string(), "Custom error message");

        let err2 = SimpleError::new("Another error");
        assert_eq!(err2.to_string(), "Another error");
    }

    #[test]
    fn test_api_error_messages() {
        let status = ApiError::Status {
            code: 503,
            body: "down".into(),
        };
        assert_eq!(status.to_string(), "HTTP error! status: 503, message: down");
        assert_eq!(ApiError::Rejected("nope".into()).to_string(), "nope");
    }
}

#[cfg(test)]
mod app_state_tests {
    use std::time::Duration;
    use usradmin::app::{AppState, InputMode, LoadState, Settings};
    use usradmin::filter::{DateRange, TriState};

    #[test]
    fn test_app_state_creation() {
        let app = AppState::default();
        assert!(matches!(app.input_mode, InputMode::Normal));
        assert_eq!(app.load_state, LoadState::NotLoaded);
        assert_eq!(app.selected_user_index, 0);
        assert!(app.users.is_empty());
        assert!(app.criteria.is_unfiltered());
        assert_eq!(app.criteria.premium, TriState::All);
        assert_eq!(app.criteria.date, DateRange::All);
        assert!(app.modal.is_none());
    }

    #[test]
    fn test_debounce_delay_comes_from_settings() {
        let app = AppState::new(Settings {
            debounce: Duration::from_millis(120),
            ..Settings::default()
        });
        assert_eq!(app.search_debounce.delay(), Duration::from_millis(120));
    }
}
