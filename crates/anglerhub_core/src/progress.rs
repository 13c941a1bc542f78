//! crates/anglerhub_core/src/progress.rs
//!
//! Goal progress evaluation. Given a goal and every catch its owner has
//! logged, recompute the goal's counter and decide whether it is now complete.
//!
//! Evaluation is a pure function of its inputs (the current time is passed in)
//! and never fails: criteria that cannot be applied leave the counter as is.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::criteria::{CountCriteria, GoalCriteria, LocationCriteria, SpeciesCriteria};
use crate::domain::{Catch, Goal, GoalStatus};

/// The outcome of one evaluation, ready to be written back to the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub current_value: i32,
    pub status: GoalStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Evaluation {
    /// Whether applying this evaluation would modify `goal`.
    pub fn changes(&self, goal: &Goal) -> bool {
        self.current_value != goal.current_value
            || self.status != goal.status
            || self.completed_at != goal.completed_at
    }

    pub fn apply_to(self, goal: &mut Goal) {
        goal.current_value = self.current_value;
        goal.status = self.status;
        goal.completed_at = self.completed_at;
    }
}

/// Recomputes `goal`'s progress against `catches`.
///
/// `catches` must be the owner's full catch history; filtering happens here.
/// Paused and cancelled goals are returned unchanged.
pub fn evaluate(goal: &Goal, catches: &[Catch], now: DateTime<Utc>) -> Evaluation {
    let unchanged = Evaluation {
        current_value: goal.current_value,
        status: goal.status,
        completed_at: goal.completed_at,
    };
    if goal.status.is_frozen() {
        return unchanged;
    }

    let current_value = aggregate(&goal.criteria, catches).unwrap_or(goal.current_value);

    let target_reached = goal
        .target_value
        .is_some_and(|target| current_value >= target);
    if goal.status == GoalStatus::Active && target_reached {
        return Evaluation {
            current_value,
            status: GoalStatus::Completed,
            completed_at: Some(now),
        };
    }

    Evaluation {
        current_value,
        ..unchanged
    }
}

/// `None` means "no automatic aggregation": the counter keeps its value.
fn aggregate(criteria: &GoalCriteria, catches: &[Catch]) -> Option<i32> {
    match criteria {
        GoalCriteria::Species(SpeciesCriteria {
            species,
            min_weight,
        }) => {
            let needle = non_empty(species)?;
            Some(count(catches.iter().filter(|c| {
                contains_ignore_case(&c.details.species, &needle)
                    && min_weight.map_or(true, |min| c.details.weight.is_some_and(|w| w >= min))
            })))
        }
        GoalCriteria::Weight(_) => {
            let heaviest = catches
                .iter()
                .filter_map(|c| c.details.weight)
                .filter(|w| w.is_finite())
                .fold(0.0_f64, f64::max);
            Some(to_counter(heaviest))
        }
        GoalCriteria::Count(CountCriteria {
            date_range,
            species,
        }) => {
            let needle = species.as_deref().and_then(non_empty);
            Some(count(catches.iter().filter(|c| {
                date_range.map_or(true, |range| range.contains(c.details.caught_at))
                    && needle
                        .as_deref()
                        .map_or(true, |n| contains_ignore_case(&c.details.species, n))
            })))
        }
        GoalCriteria::Location(LocationCriteria { location }) => {
            let needle = non_empty(location)?;
            Some(count(
                catches
                    .iter()
                    .filter(|c| contains_ignore_case(&c.details.location, &needle)),
            ))
        }
        GoalCriteria::Custom(_) => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// `needle` is already lowercase.
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn count<'a>(matching: impl Iterator<Item = &'a Catch>) -> i32 {
    i32::try_from(matching.count()).unwrap_or(i32::MAX)
}

/// Weights are decimals but the counter is an integer; fractions are dropped.
fn to_counter(weight: f64) -> i32 {
    weight.floor().clamp(0.0, f64::from(i32::MAX)) as i32
}

//=========================================================================================
// Derived, read-only progress fields
//=========================================================================================

/// Computed fields rendered alongside a goal. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub progress_percentage: f64,
    pub is_completed: bool,
    pub is_overdue: bool,
    pub days_remaining: Option<i64>,
    pub type_name: &'static str,
    pub status_name: &'static str,
}

impl GoalProgress {
    pub fn for_goal(goal: &Goal, today: NaiveDate) -> Self {
        Self {
            progress_percentage: progress_percentage(goal),
            is_completed: is_completed(goal),
            is_overdue: is_overdue(goal, today),
            days_remaining: days_remaining(goal, today),
            type_name: goal.criteria.goal_type().label(),
            status_name: goal.status.label(),
        }
    }
}

/// `min(100, current / target * 100)`, or 0 without a positive target.
pub fn progress_percentage(goal: &Goal) -> f64 {
    match goal.target_value {
        Some(target) if target > 0 => {
            (f64::from(goal.current_value) / f64::from(target) * 100.0).min(100.0)
        }
        _ => 0.0,
    }
}

pub fn is_completed(goal: &Goal) -> bool {
    goal.status == GoalStatus::Completed
        || goal
            .target_value
            .is_some_and(|target| goal.current_value >= target)
}

pub fn is_overdue(goal: &Goal, today: NaiveDate) -> bool {
    goal.status == GoalStatus::Active && goal.target_date < today && !is_completed(goal)
}

/// Signed day count until the target date; negative once it has passed.
pub fn days_remaining(goal: &Goal, today: NaiveDate) -> Option<i64> {
    if is_completed(goal) {
        return None;
    }
    Some((goal.target_date - today).num_days())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{CustomCriteria, DateRange, WeightCriteria};
    use crate::domain::CatchDetails;
    use chrono::TimeZone;
    use rstest::rstest;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn catch(species: &str, weight: Option<f64>, location: &str, caught_at: DateTime<Utc>) -> Catch {
        Catch {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            details: CatchDetails {
                species: species.to_string(),
                weight,
                length: None,
                location: location.to_string(),
                latitude: None,
                longitude: None,
                water_body: None,
                caught_at,
                bait_lure: None,
                technique: None,
                water_temp: None,
                air_temp: None,
                weather_conditions: None,
                photos: Vec::new(),
                notes: None,
                is_released: false,
                is_personal_best: false,
            },
            created_at: caught_at,
            updated_at: caught_at,
        }
    }

    fn goal(criteria: GoalCriteria, target_value: Option<i32>) -> Goal {
        let now = at(2024, 1, 1);
        Goal {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            title: "goal".into(),
            description: None,
            criteria,
            target_value,
            current_value: 0,
            start_date: now.date_naive(),
            target_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            status: GoalStatus::Active,
            completed_at: None,
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn bass_goal() -> Goal {
        goal(
            GoalCriteria::Species(SpeciesCriteria {
                species: "bass".into(),
                min_weight: Some(5.0),
            }),
            Some(3),
        )
    }

    fn bass_catches() -> Vec<Catch> {
        let when = at(2024, 5, 1);
        vec![
            catch("Largemouth Bass", Some(6.0), "Lake A", when),
            catch("Smallmouth Bass", Some(4.0), "Lake A", when),
            catch("Bass", Some(7.0), "Lake B", when),
            catch("Trout", Some(10.0), "River C", when),
        ]
    }

    #[test]
    fn species_goal_counts_matching_heavy_catches() {
        let now = at(2024, 5, 2);
        let result = evaluate(&bass_goal(), &bass_catches(), now);
        assert_eq!(result.current_value, 2);
        assert_eq!(result.status, GoalStatus::Active);
        assert_eq!(result.completed_at, None);
    }

    #[test]
    fn species_goal_completes_when_target_reached() {
        let now = at(2024, 5, 3);
        let mut catches = bass_catches();
        catches.push(catch("Bass", Some(8.0), "Lake B", now));

        let result = evaluate(&bass_goal(), &catches, now);
        assert_eq!(result.current_value, 3);
        assert_eq!(result.status, GoalStatus::Completed);
        assert_eq!(result.completed_at, Some(now));
    }

    #[test]
    fn species_min_weight_skips_unweighed_catches() {
        let catches = vec![catch("Bass", None, "Lake", at(2024, 5, 1))];
        let result = evaluate(&bass_goal(), &catches, at(2024, 5, 2));
        assert_eq!(result.current_value, 0);
    }

    #[test]
    fn count_goal_without_filters_counts_everything() {
        let goal = goal(GoalCriteria::Count(CountCriteria::default()), None);
        let result = evaluate(&goal, &bass_catches(), at(2024, 5, 2));
        assert_eq!(result.current_value, 4);
    }

    #[test]
    fn count_goal_date_range_is_inclusive_by_day() {
        let goal = goal(
            GoalCriteria::Count(CountCriteria {
                date_range: Some(DateRange {
                    start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                    end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
                }),
                species: Some("trout".into()),
            }),
            None,
        );
        let late_on_last_day = Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 0).unwrap();
        let catches = vec![
            catch("Rainbow Trout", None, "River", at(2024, 6, 1)),
            catch("Brown trout", None, "River", late_on_last_day),
            catch("Trout", None, "River", at(2024, 7, 1)),
            catch("Pike", None, "River", at(2024, 6, 15)),
        ];
        assert_eq!(evaluate(&goal, &catches, at(2024, 7, 2)).current_value, 2);
    }

    #[test]
    fn weight_goal_tracks_heaviest_catch() {
        let goal = goal(
            GoalCriteria::Weight(WeightCriteria {
                target_weight: Some(100.0),
            }),
            Some(12),
        );
        let result = evaluate(&goal, &bass_catches(), at(2024, 5, 2));
        assert_eq!(result.current_value, 10);
        // target_weight is informational only.
        assert_eq!(result.status, GoalStatus::Active);
    }

    #[test]
    fn weight_goal_without_weighed_catches_is_zero() {
        let goal = goal(GoalCriteria::Weight(WeightCriteria { target_weight: None }), None);
        let catches = vec![catch("Bass", None, "Lake", at(2024, 5, 1))];
        assert_eq!(evaluate(&goal, &catches, at(2024, 5, 2)).current_value, 0);
        assert_eq!(evaluate(&goal, &[], at(2024, 5, 2)).current_value, 0);
    }

    #[test]
    fn location_goal_matches_substring_case_insensitively() {
        let goal = goal(
            GoalCriteria::Location(LocationCriteria {
                location: "lake".into(),
            }),
            None,
        );
        assert_eq!(evaluate(&goal, &bass_catches(), at(2024, 5, 2)).current_value, 3);
    }

    #[test]
    fn custom_goal_keeps_manual_value() {
        let mut goal = goal(GoalCriteria::Custom(CustomCriteria::default()), Some(10));
        goal.current_value = 7;
        let result = evaluate(&goal, &bass_catches(), at(2024, 5, 2));
        assert_eq!(result.current_value, 7);
        assert_eq!(result.status, GoalStatus::Active);
    }

    #[test]
    fn blank_criteria_leave_counter_unchanged() {
        let mut goal = goal(
            GoalCriteria::Location(LocationCriteria {
                location: "   ".into(),
            }),
            None,
        );
        goal.current_value = 5;
        assert_eq!(evaluate(&goal, &bass_catches(), at(2024, 5, 2)).current_value, 5);
    }

    #[rstest]
    #[case(GoalStatus::Paused)]
    #[case(GoalStatus::Cancelled)]
    fn frozen_goals_are_not_evaluated(#[case] status: GoalStatus) {
        let mut goal = bass_goal();
        goal.status = status;
        goal.current_value = 1;
        let result = evaluate(&goal, &bass_catches(), at(2024, 5, 2));
        assert!(!result.changes(&goal));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let now = at(2024, 5, 2);
        let mut goal = bass_goal();
        let first = evaluate(&goal, &bass_catches(), now);
        first.apply_to(&mut goal);
        let second = evaluate(&goal, &bass_catches(), now);
        assert_eq!(first, second);
        assert!(!second.changes(&goal));
    }

    #[test]
    fn completed_goals_stay_completed() {
        let first_pass = at(2024, 5, 3);
        let mut goal = bass_goal();
        let mut catches = bass_catches();
        catches.push(catch("Bass", Some(8.0), "Lake B", first_pass));
        evaluate(&goal, &catches, first_pass).apply_to(&mut goal);
        assert_eq!(goal.status, GoalStatus::Completed);

        // All catches gone; the counter drops but the goal stays completed.
        let later = at(2024, 6, 1);
        let result = evaluate(&goal, &[], later);
        assert_eq!(result.current_value, 0);
        assert_eq!(result.status, GoalStatus::Completed);
        assert_eq!(result.completed_at, Some(first_pass));
    }

    #[test]
    fn zero_progress_completes_goal_without_positive_target() {
        // A target of zero is reached immediately, including at creation.
        let goal = goal(GoalCriteria::Count(CountCriteria::default()), Some(0));
        let result = evaluate(&goal, &[], at(2024, 5, 2));
        assert_eq!(result.status, GoalStatus::Completed);
    }

    #[test]
    fn derived_fields() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();
        let mut goal = bass_goal();
        goal.current_value = 2;

        let progress = GoalProgress::for_goal(&goal, today);
        assert!((progress.progress_percentage - 66.666).abs() < 0.01);
        assert!(!progress.is_completed);
        assert!(!progress.is_overdue);
        assert_eq!(progress.days_remaining, Some(10));
        assert_eq!(progress.type_name, "Species Target");
        assert_eq!(progress.status_name, "Active");

        let after_deadline = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert!(is_overdue(&goal, after_deadline));
        assert_eq!(days_remaining(&goal, after_deadline), Some(-2));

        goal.current_value = 9;
        assert_eq!(progress_percentage(&goal), 100.0);
        assert!(!is_overdue(&goal, after_deadline));
        assert_eq!(days_remaining(&goal, after_deadline), None);

        goal.target_value = None;
        assert_eq!(progress_percentage(&goal), 0.0);
    }
}
