//! SLA evaluation.
//!
//! Pure functions that decide the SLA state of a single email from its timestamps
//! and the threshold of the department it is attributed to. Nothing here touches
//! storage or reads the clock on its own; callers pass `now` explicitly.
//!
//! Two kinds of breach exist and are kept apart on purpose:
//! - a *confirmed* breach belongs to a replied email and is stored on the row
//!   (`is_sla_breach`) at reply time;
//! - a *pending* breach belongs to an unreplied email and is derived on every
//!   evaluation from the elapsed time. It is never persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppError;

/// Threshold used when an email has no department attribution.
pub const DEFAULT_SLA_THRESHOLD_HOURS: f64 = 4.0;

/// Reject thresholds that would make every email (or none) a breach.
pub fn validate_threshold(hours: f64) -> Result<f64, AppError> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "SLA threshold must be a positive number of hours, got {}",
            hours
        )));
    }
    Ok(hours)
}

/// Department threshold, or the configured fallback for unattributed emails.
pub fn effective_threshold(department_threshold: Option<f64>, fallback: f64) -> f64 {
    department_threshold.unwrap_or(fallback)
}

/// Hours between two instants at full precision.
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 3_600_000_000.0,
        None => delta.num_seconds() as f64 / 3_600.0,
    }
}

/// Display rounding. Stored values keep full precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Outcome of the reply transition, computed once and stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplyEvaluation {
    pub response_time_hours: f64,
    pub is_sla_breach: bool,
}

/// Breach is strict: a reply landing exactly on the threshold is compliant.
pub fn evaluate_reply(
    received_at: DateTime<Utc>,
    replied_at: DateTime<Utc>,
    threshold_hours: f64,
) -> ReplyEvaluation {
    let response_time_hours = hours_between(received_at, replied_at);
    ReplyEvaluation {
        response_time_hours,
        is_sla_breach: response_time_hours > threshold_hours,
    }
}

pub fn is_pending_breach(received_at: DateTime<Utc>, now: DateTime<Utc>, threshold_hours: f64) -> bool {
    hours_between(received_at, now) > threshold_hours
}

/// Full SLA classification of one email at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlaState {
    /// Replied within the threshold.
    Compliant { response_time_hours: f64 },
    /// Replied after the threshold.
    Breached { response_time_hours: f64 },
    /// Unreplied, still inside the threshold.
    Pending { hours_elapsed: f64 },
    /// Unreplied and already past the threshold.
    PendingBreach { hours_elapsed: f64 },
}

impl SlaState {
    pub fn is_breach(&self) -> bool {
        matches!(self, SlaState::Breached { .. } | SlaState::PendingBreach { .. })
    }
}

pub fn classify(
    received_at: DateTime<Utc>,
    replied_at: Option<DateTime<Utc>>,
    threshold_hours: f64,
    now: DateTime<Utc>,
) -> SlaState {
    match replied_at {
        Some(replied_at) => {
            let eval = evaluate_reply(received_at, replied_at, threshold_hours);
            if eval.is_sla_breach {
                SlaState::Breached {
                    response_time_hours: eval.response_time_hours,
                }
            } else {
                SlaState::Compliant {
                    response_time_hours: eval.response_time_hours,
                }
            }
        }
        None => {
            let hours_elapsed = hours_between(received_at, now);
            if hours_elapsed > threshold_hours {
                SlaState::PendingBreach { hours_elapsed }
            } else {
                SlaState::Pending { hours_elapsed }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn five_hour_reply_breaches_four_hour_sla() {
        let eval = evaluate_reply(t0(), t0() + Duration::hours(5), 4.0);
        assert_eq!(eval.response_time_hours, 5.0);
        assert!(eval.is_sla_breach);
    }

    #[test]
    fn reply_exactly_on_threshold_is_compliant() {
        let eval = evaluate_reply(t0(), t0() + Duration::hours(4), 4.0);
        assert_eq!(eval.response_time_hours, 4.0);
        assert!(!eval.is_sla_breach);
    }

    #[test]
    fn response_time_keeps_full_precision() {
        let eval = evaluate_reply(t0(), t0() + Duration::seconds(3_601), 4.0);
        assert!((eval.response_time_hours - 3_601.0 / 3_600.0).abs() < 1e-12);
        assert_eq!(round2(eval.response_time_hours), 1.0);
    }

    #[test]
    fn pending_breach_is_strict() {
        assert!(!is_pending_breach(t0(), t0() + Duration::hours(4), 4.0));
        assert!(is_pending_breach(
            t0(),
            t0() + Duration::minutes(4 * 60 + 1),
            4.0
        ));
    }

    #[test]
    fn classify_covers_all_states() {
        let now = t0() + Duration::minutes(270);
        assert!(matches!(
            classify(t0(), None, 4.0, now),
            SlaState::PendingBreach { .. }
        ));
        assert!(matches!(
            classify(t0(), None, 8.0, now),
            SlaState::Pending { .. }
        ));
        assert!(matches!(
            classify(t0(), Some(t0() + Duration::hours(2)), 4.0, now),
            SlaState::Compliant { .. }
        ));
        let breached = classify(t0(), Some(t0() + Duration::hours(6)), 4.0, now);
        assert!(breached.is_breach());
    }

    #[test]
    fn threshold_validation_rejects_non_positive() {
        assert!(validate_threshold(0.0).is_err());
        assert!(validate_threshold(-1.5).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
        assert_eq!(validate_threshold(2.5).unwrap(), 2.5);
    }

    #[test]
    fn unattributed_email_uses_fallback_threshold() {
        assert_eq!(
            effective_threshold(None, DEFAULT_SLA_THRESHOLD_HOURS),
            4.0
        );
        assert_eq!(effective_threshold(Some(1.5), 4.0), 1.5);
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(2.344), 2.34);
    }
}
