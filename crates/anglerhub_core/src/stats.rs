//! crates/anglerhub_core/src/stats.rs
//!
//! Per-user catch and goal statistics, computed from the full record sets.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::domain::{Catch, Goal, GoalStatus, GoalType};
use crate::progress::GoalProgress;

const TOP_N: usize = 5;
const UPCOMING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatchStatistics {
    pub total_catches: usize,
    pub total_weight: f64,
    pub average_weight: Option<f64>,
    pub heaviest_catch: Option<Catch>,
    pub longest_catch: Option<Catch>,
    pub most_common_species: Vec<String>,
    /// Month number (1-12) to catch count.
    pub catches_by_month: BTreeMap<u32, usize>,
    pub favorite_locations: Vec<String>,
    pub personal_bests_count: usize,
    pub released_count: usize,
}

impl CatchStatistics {
    pub fn compute(catches: &[Catch]) -> Self {
        let weights: Vec<f64> = catches.iter().filter_map(|c| c.details.weight).collect();
        let total_weight: f64 = weights.iter().sum();
        let average_weight = (!weights.is_empty()).then(|| total_weight / weights.len() as f64);

        let heaviest_catch = max_by_field(catches, |c| c.details.weight);
        let longest_catch = max_by_field(catches, |c| c.details.length);

        let mut catches_by_month = BTreeMap::new();
        for c in catches {
            *catches_by_month.entry(c.details.caught_at.month()).or_insert(0) += 1;
        }

        Self {
            total_catches: catches.len(),
            total_weight,
            average_weight,
            heaviest_catch,
            longest_catch,
            most_common_species: most_common(catches.iter().map(|c| c.details.species.as_str())),
            catches_by_month,
            favorite_locations: most_common(catches.iter().map(|c| c.details.location.as_str())),
            personal_bests_count: catches.iter().filter(|c| c.details.is_personal_best).count(),
            released_count: catches.iter().filter(|c| c.details.is_released).count(),
        }
    }
}

fn max_by_field(catches: &[Catch], field: impl Fn(&Catch) -> Option<f64>) -> Option<Catch> {
    catches
        .iter()
        .filter_map(|c| field(c).map(|value| (value, c)))
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, c)| c.clone())
}

/// Top values by frequency; ties keep first-seen order.
fn most_common<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, value) in values.enumerate() {
        counts.entry(value).or_insert((0, position)).0 += 1;
    }
    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
        count_b.cmp(count_a).then(first_a.cmp(first_b))
    });
    ranked
        .into_iter()
        .take(TOP_N)
        .map(|(value, _)| value.to_string())
        .collect()
}

/// A goal rendered together with its derived progress fields.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GoalView {
    #[serde(flatten)]
    pub goal: Goal,
    #[serde(flatten)]
    pub progress: GoalProgress,
}

impl GoalView {
    pub fn new(goal: Goal, today: NaiveDate) -> Self {
        let progress = GoalProgress::for_goal(&goal, today);
        Self { goal, progress }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GoalStatistics {
    pub total_goals: usize,
    pub active_goals: usize,
    pub completed_goals: usize,
    pub paused_goals: usize,
    pub cancelled_goals: usize,
    pub overdue_goals: usize,
    pub goals_by_type: BTreeMap<GoalType, usize>,
    pub completion_rate: f64,
    pub upcoming_deadlines: Vec<GoalView>,
}

impl GoalStatistics {
    pub fn compute(goals: &[Goal], today: NaiveDate) -> Self {
        let with_status = |status: GoalStatus| goals.iter().filter(|g| g.status == status).count();
        let completed_goals = with_status(GoalStatus::Completed);

        let mut goals_by_type = BTreeMap::new();
        for goal in goals {
            *goals_by_type.entry(goal.criteria.goal_type()).or_insert(0) += 1;
        }

        let completion_rate = if goals.is_empty() {
            0.0
        } else {
            completed_goals as f64 / goals.len() as f64 * 100.0
        };

        let horizon = today + Duration::days(UPCOMING_WINDOW_DAYS);
        let mut upcoming: Vec<&Goal> = goals
            .iter()
            .filter(|g| g.status == GoalStatus::Active)
            .filter(|g| g.target_date >= today && g.target_date <= horizon)
            .collect();
        upcoming.sort_by_key(|g| g.target_date);

        Self {
            total_goals: goals.len(),
            active_goals: with_status(GoalStatus::Active),
            completed_goals,
            paused_goals: with_status(GoalStatus::Paused),
            cancelled_goals: with_status(GoalStatus::Cancelled),
            overdue_goals: goals
                .iter()
                .filter(|g| g.status == GoalStatus::Active && g.target_date < today)
                .count(),
            goals_by_type,
            completion_rate,
            upcoming_deadlines: upcoming
                .into_iter()
                .map(|g| GoalView::new(g.clone(), today))
                .collect(),
        }
    }
}

/// Summary shown on the account page.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserSummary {
    pub total_catches: usize,
    pub active_goals: usize,
    pub personal_best: Option<Catch>,
}

impl UserSummary {
    pub fn compute(catches: &[Catch], goals: &[Goal], today: NaiveDate) -> Self {
        Self {
            total_catches: catches.len(),
            active_goals: active_goals(goals, today).count(),
            personal_best: max_by_field(catches, |c| c.details.weight),
        }
    }
}

/// Active goals whose deadline has not passed yet.
pub fn active_goals(goals: &[Goal], today: NaiveDate) -> impl Iterator<Item = &Goal> {
    goals
        .iter()
        .filter(move |g| g.status == GoalStatus::Active && g.target_date >= today)
}
