//! Client-side filtering of the user snapshot.
//!
//! Four independent predicates (search term, premium, dev, registration
//! range) are ANDed over the last fetched snapshot. Filtering is stable: the
//! result is always an order-preserving subsequence of the snapshot.
use chrono::{DateTime, Months, TimeDelta, Utc};

use crate::api::UserRecord;
use crate::app::{AppState, LoadState};

/// Three-state selector used for the premium and dev flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TriState {
    #[default]
    All,
    Yes,
    No,
}

impl TriState {
    pub fn matches(self, flag: bool) -> bool {
        match self {
            TriState::All => true,
            TriState::Yes => flag,
            TriState::No => !flag,
        }
    }

    pub fn next(self) -> Self {
        match self {
            TriState::All => TriState::Yes,
            TriState::Yes => TriState::No,
            TriState::No => TriState::All,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            TriState::All => TriState::No,
            TriState::Yes => TriState::All,
            TriState::No => TriState::Yes,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TriState::All => "all",
            TriState::Yes => "yes",
            TriState::No => "no",
        }
    }
}

/// Registration recency selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateRange {
    #[default]
    All,
    LastWeek,
    LastMonth,
    LastYear,
}

impl DateRange {
    /// Earliest accepted `createdAt`, or `None` when the range is unbounded.
    ///
    /// Month and year steps are calendar-aware and clamp to the last day of
    /// the target month: Mar 31 minus one month is Feb 28 (Feb 29 in leap
    /// years) and Feb 29 minus one year is Feb 28.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DateRange::All => None,
            DateRange::LastWeek => now.checked_sub_signed(TimeDelta::days(7)),
            DateRange::LastMonth => now.checked_sub_months(Months::new(1)),
            DateRange::LastYear => now.checked_sub_months(Months::new(12)),
        }
    }

    pub fn matches(self, created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match self.cutoff(now) {
            None => true,
            Some(cutoff) => created_at.is_some_and(|at| at >= cutoff),
        }
    }

    pub fn next(self) -> Self {
        match self {
            DateRange::All => DateRange::LastWeek,
            DateRange::LastWeek => DateRange::LastMonth,
            DateRange::LastMonth => DateRange::LastYear,
            DateRange::LastYear => DateRange::All,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            DateRange::All => DateRange::LastYear,
            DateRange::LastWeek => DateRange::All,
            DateRange::LastMonth => DateRange::LastWeek,
            DateRange::LastYear => DateRange::LastMonth,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DateRange::All => "all",
            DateRange::LastWeek => "last week",
            DateRange::LastMonth => "last month",
            DateRange::LastYear => "last year",
        }
    }
}

/// The live filter controls. Never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Criteria {
    pub search: String,
    pub premium: TriState,
    pub dev: TriState,
    pub date: DateRange,
}

impl Criteria {
    /// True when every control is at its pass-through value.
    pub fn is_unfiltered(&self) -> bool {
        self.search.is_empty()
            && self.premium == TriState::All
            && self.dev == TriState::All
            && self.date == DateRange::All
    }

    pub fn matcher(&self, now: DateTime<Utc>) -> Matcher<'_> {
        Matcher {
            needle: self.search.to_lowercase(),
            criteria: self,
            now,
        }
    }
}

/// Criteria bound to a point in time, with the search term pre-lowercased.
pub struct Matcher<'a> {
    needle: String,
    criteria: &'a Criteria,
    now: DateTime<Utc>,
}

impl Matcher<'_> {
    pub fn matches(&self, user: &UserRecord) -> bool {
        (self.needle.is_empty() || user.username.to_lowercase().contains(&self.needle))
            && self.criteria.premium.matches(user.premium)
            && self.criteria.dev.matches(user.is_dev)
            && self.criteria.date.matches(user.created_at, self.now)
    }
}

/// Order-preserving subsequence of `snapshot` that satisfies `criteria`.
pub fn filter_users(
    snapshot: &[UserRecord],
    criteria: &Criteria,
    now: DateTime<Utc>,
) -> Vec<UserRecord> {
    let matcher = criteria.matcher(now);
    snapshot
        .iter()
        .filter(|u| matcher.matches(u))
        .cloned()
        .collect()
}

/// Re-run the pipeline against the current snapshot and live criteria.
pub fn apply_filters(app: &mut AppState) {
    apply_filters_at(app, Utc::now());
}

pub fn apply_filters_at(app: &mut AppState, now: DateTime<Utc>) {
    // a filter pass over a kept snapshot replaces the error from a failed reload
    if matches!(app.load_state, LoadState::Failed(_)) && app.snapshot.has_loaded() {
        app.load_state = LoadState::Ready;
    }
    app.users = filter_users(app.snapshot.users(), &app.criteria, now);
    app.selected_user_index = app
        .selected_user_index
        .min(app.users.len().saturating_sub(1));
    app.filter_passes += 1;
    tracing::debug!(
        shown = app.users.len(),
        total = app.snapshot.users().len(),
        pass = app.filter_passes,
        "filtered user list"
    );
}
