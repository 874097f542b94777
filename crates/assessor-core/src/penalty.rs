//! Late-submission penalty.

use chrono::{DateTime, Utc};

use crate::model::{AssessmentConfig, Attempt};

/// Whether a submission at `completed_at` is past `due`.
pub fn is_late(completed_at: DateTime<Utc>, due: Option<DateTime<Utc>>) -> bool {
    due.is_some_and(|due| completed_at > due)
}

/// Days late, counted in UTC calendar days past the due date.
///
/// Zero when on time; at least one once late, so a submission a minute
/// after the deadline is one day late.
pub fn days_late(completed_at: DateTime<Utc>, due: DateTime<Utc>) -> u32 {
    if completed_at <= due {
        return 0;
    }
    let days = (completed_at.date_naive() - due.date_naive()).num_days();
    u32::try_from(days).unwrap_or(u32::MAX).max(1)
}

/// Penalty in percentage points, capped at 100. Negative or NaN rates count as zero.
pub fn penalty_points(days_late: u32, percent_per_day: f64) -> f64 {
    (percent_per_day.max(0.0) * f64::from(days_late)).min(100.0)
}

/// Adjust a raw score for lateness. Never raises the score.
///
/// Fractional penalties round the final score half up.
pub fn apply_penalty(raw_score_percent: u32, attempt: &Attempt, config: &AssessmentConfig) -> u32 {
    if !attempt.is_late {
        return raw_score_percent;
    }
    let days = match (attempt.completed_at, config.due_date) {
        (Some(completed), Some(due)) => days_late(completed, due),
        // Flagged late without the timestamps to measure by: one day.
        _ => 1,
    };
    let penalty = penalty_points(days, config.late_penalty_percent_per_day);
    let score = (f64::from(raw_score_percent) - penalty).max(0.0).round();
    // Bounded by `raw_score_percent`, so the cast is exact.
    score as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn config(per_day: f64) -> AssessmentConfig {
        let mut config: AssessmentConfig = serde_json::from_str(r#"{"id": "a1"}"#).unwrap();
        config.due_date = Some(at("2024-01-10T00:00:00Z"));
        config.late_penalty_percent_per_day = per_day;
        config.allow_late_submission = true;
        config
    }

    fn submitted(at_time: &str, due: Option<DateTime<Utc>>) -> Attempt {
        let completed = at(at_time);
        let mut attempt = Attempt::new("a1", "u1", at("2024-01-01T00:00:00Z"));
        attempt.completed_at = Some(completed);
        attempt.is_late = is_late(completed, due);
        attempt
    }

    #[test]
    fn on_time_keeps_raw_score() {
        let config = config(10.0);
        let attempt = submitted("2024-01-09T23:59:59Z", config.due_date);
        assert!(!attempt.is_late);
        assert_eq!(apply_penalty(90, &attempt, &config), 90);
    }

    #[test]
    fn two_days_late() {
        let config = config(10.0);
        let attempt = submitted("2024-01-12T01:00:00Z", config.due_date);
        assert!(attempt.is_late);
        assert_eq!(apply_penalty(90, &attempt, &config), 70);
    }

    #[test]
    fn minimum_one_day_once_late() {
        let due = at("2024-01-10T00:00:00Z");
        assert_eq!(days_late(at("2024-01-10T00:00:01Z"), due), 1);
        assert_eq!(days_late(due, due), 0);
        assert_eq!(days_late(at("2024-01-11T23:00:00Z"), due), 1);
    }

    #[test]
    fn penalty_is_capped_and_score_floored() {
        assert_eq!(penalty_points(30, 10.0), 100.0);
        let config = config(40.0);
        let attempt = submitted("2024-01-13T00:00:00Z", config.due_date);
        assert_eq!(apply_penalty(90, &attempt, &config), 0);
    }

    #[test]
    fn fractional_rate_rounds_final_score_half_up() {
        let config = config(2.5);
        // Three days late: 7.5 points off 90.
        let attempt = submitted("2024-01-13T06:00:00Z", config.due_date);
        assert_eq!(apply_penalty(90, &attempt, &config), 83);
        // One day late: 2.5 points off 90.
        let attempt = submitted("2024-01-10T06:00:00Z", config.due_date);
        assert_eq!(apply_penalty(90, &attempt, &config), 88);
    }

    #[test]
    fn negative_rate_is_no_penalty() {
        let config = config(-5.0);
        let attempt = submitted("2024-01-12T06:00:00Z", config.due_date);
        assert_eq!(apply_penalty(90, &attempt, &config), 90);
    }

    #[test]
    fn final_never_exceeds_raw() {
        let config = config(7.0);
        for day in 10..20 {
            let attempt = submitted(&format!("2024-01-{day}T06:00:00Z"), config.due_date);
            for raw in [0, 13, 50, 99, 100] {
                assert!(apply_penalty(raw, &attempt, &config) <= raw);
            }
        }
    }

    #[test]
    fn no_due_date_is_never_late() {
        assert!(!is_late(at("2030-01-01T00:00:00Z"), None));
    }
}
