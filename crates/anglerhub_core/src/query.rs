//! crates/anglerhub_core/src/query.rs
//!
//! Listing filters, sort keys and the pagination envelope shared by the
//! database port and the HTTP layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::domain::{Catch, Goal, GoalStatus, GoalType, WeatherLog};

pub const DEFAULT_PER_PAGE: u32 = 15;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Clamps to a 1-based page and 1..=100 items per page.
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination envelope returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        let last_page = total.div_ceil(u64::from(request.per_page)).max(1);
        Self {
            data,
            current_page: request.page,
            per_page: request.per_page,
            total,
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
        }
    }

    /// Slices an already filtered and sorted list.
    pub fn from_vec(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let data = items
            .into_iter()
            .skip(offset)
            .take(request.per_page as usize)
            .collect();
        Self::new(data, request, total)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

//=========================================================================================
// Catches
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchSortField {
    #[default]
    CaughtAt,
    Weight,
    Length,
    Species,
    Location,
    CreatedAt,
}

impl CatchSortField {
    /// Column name; the enum is the allow-list that keeps user input out of SQL.
    pub fn column(&self) -> &'static str {
        match self {
            Self::CaughtAt => "caught_at",
            Self::Weight => "weight",
            Self::Length => "length",
            Self::Species => "species",
            Self::Location => "location",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatchFilter {
    pub species: Option<String>,
    pub location: Option<String>,
    pub caught_between: Option<TimeRange>,
    pub personal_bests: bool,
    pub released_only: bool,
    pub sort_by: CatchSortField,
    pub sort_order: SortOrder,
}

impl CatchFilter {
    pub fn matches(&self, c: &Catch) -> bool {
        let d = &c.details;
        self.species
            .as_deref()
            .map_or(true, |s| contains_ignore_case(&d.species, s))
            && self
                .location
                .as_deref()
                .map_or(true, |l| contains_ignore_case(&d.location, l))
            && self
                .caught_between
                .map_or(true, |range| range.contains(d.caught_at))
            && (!self.personal_bests || d.is_personal_best)
            && (!self.released_only || d.is_released)
    }

    pub fn compare(&self, a: &Catch, b: &Catch) -> Ordering {
        let (x, y) = (&a.details, &b.details);
        let ordering = match self.sort_by {
            CatchSortField::CaughtAt => x.caught_at.cmp(&y.caught_at),
            CatchSortField::Weight => cmp_optional(x.weight, y.weight),
            CatchSortField::Length => cmp_optional(x.length, y.length),
            CatchSortField::Species => x.species.cmp(&y.species),
            CatchSortField::Location => x.location.cmp(&y.location),
            CatchSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        self.sort_order.apply(ordering)
    }
}

//=========================================================================================
// Goals
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalSortField {
    #[default]
    CreatedAt,
    TargetDate,
    StartDate,
    Title,
    Status,
    CurrentValue,
}

impl GoalSortField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::TargetDate => "target_date",
            Self::StartDate => "start_date",
            Self::Title => "title",
            Self::Status => "status",
            Self::CurrentValue => "current_value",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalFilter {
    pub status: Option<GoalStatus>,
    pub goal_type: Option<GoalType>,
    pub active_only: bool,
    pub completed_only: bool,
    /// Active goals whose target date is before `today`.
    pub overdue_only: bool,
    pub today: NaiveDate,
    pub sort_by: GoalSortField,
    pub sort_order: SortOrder,
}

impl GoalFilter {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            status: None,
            goal_type: None,
            active_only: false,
            completed_only: false,
            overdue_only: false,
            today,
            sort_by: GoalSortField::default(),
            sort_order: SortOrder::default(),
        }
    }

    pub fn matches(&self, g: &Goal) -> bool {
        self.status.map_or(true, |s| g.status == s)
            && self.goal_type.map_or(true, |t| g.criteria.goal_type() == t)
            && (!self.active_only || g.status == GoalStatus::Active)
            && (!self.completed_only || g.status == GoalStatus::Completed)
            && (!self.overdue_only
                || (g.status == GoalStatus::Active && g.target_date < self.today))
    }

    pub fn compare(&self, a: &Goal, b: &Goal) -> Ordering {
        let ordering = match self.sort_by {
            GoalSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            GoalSortField::TargetDate => a.target_date.cmp(&b.target_date),
            GoalSortField::StartDate => a.start_date.cmp(&b.start_date),
            GoalSortField::Title => a.title.cmp(&b.title),
            GoalSortField::Status => a.status.as_str().cmp(b.status.as_str()),
            GoalSortField::CurrentValue => a.current_value.cmp(&b.current_value),
        };
        self.sort_order.apply(ordering)
    }
}

//=========================================================================================
// Weather logs
//=========================================================================================

pub const DEFAULT_WEATHER_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherFilter {
    pub location_name: Option<String>,
    pub recorded_between: Option<TimeRange>,
    pub limit: u32,
}

impl Default for WeatherFilter {
    fn default() -> Self {
        Self {
            location_name: None,
            recorded_between: None,
            limit: DEFAULT_WEATHER_LIMIT,
        }
    }
}

impl WeatherFilter {
    pub fn matches(&self, log: &WeatherLog) -> bool {
        self.location_name
            .as_deref()
            .map_or(true, |l| contains_ignore_case(&log.reading.location_name, l))
            && self
                .recorded_between
                .map_or(true, |range| range.contains(log.reading.recorded_at))
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Missing values sort first, like SQL `NULLS FIRST` in ascending order.
fn cmp_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
