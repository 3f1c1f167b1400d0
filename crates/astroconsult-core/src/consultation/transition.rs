//! Pure consultation state transitions and billing math.
//!
//! Each transition takes the current value and a timestamp and returns the
//! next value, or `StateConflict` when the source status is wrong. Nothing
//! here touches storage; the registry pairs these with a compare-and-set on
//! the repository.
//!
//! Duration policy: elapsed time is truncated to whole minutes. A session
//! that lasted 12m59s bills as 12 minutes.

use astroconsult_types::consultation::{Consultation, ConsultationStatus};
use astroconsult_types::error::ConsultationError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Whole minutes from `start` to `end`, truncated. Clock skew (end before
/// start) yields zero.
pub fn whole_minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let seconds = (end - start).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    u32::try_from(seconds / 60).unwrap_or(u32::MAX)
}

/// Minutes left to bill after the promotional allowance.
pub fn billable_minutes(duration_minutes: u32, free_minutes: u32) -> u32 {
    duration_minutes.saturating_sub(free_minutes)
}

/// `rate × max(0, duration − free)`, rounded to paise.
pub fn compute_total_cost(rate_per_minute: Decimal, duration_minutes: u32, free_minutes: u32) -> Decimal {
    let billable = Decimal::from(billable_minutes(duration_minutes, free_minutes));
    (rate_per_minute * billable).round_dp(2)
}

/// Live elapsed minutes for display. Never used for billing.
///
/// Active sessions count from `started_at` to `now`; completed sessions
/// report their final duration; everything else is zero.
pub fn elapsed_minutes(consultation: &Consultation, now: DateTime<Utc>) -> u32 {
    match (consultation.status, consultation.started_at) {
        (ConsultationStatus::Active, Some(started_at)) => whole_minutes_between(started_at, now),
        (ConsultationStatus::Completed, _) => consultation.duration_minutes,
        _ => 0,
    }
}

fn require_status(
    consultation: &Consultation,
    expected: ConsultationStatus,
) -> Result<(), ConsultationError> {
    if consultation.status == expected {
        Ok(())
    } else {
        Err(ConsultationError::StateConflict {
            expected,
            actual: consultation.status,
        })
    }
}

/// `pending -> active`, stamping `started_at`.
pub fn start(consultation: &Consultation, now: DateTime<Utc>) -> Result<Consultation, ConsultationError> {
    require_status(consultation, ConsultationStatus::Pending)?;
    Ok(Consultation {
        status: ConsultationStatus::Active,
        started_at: Some(now),
        updated_at: now,
        ..consultation.clone()
    })
}

/// `active -> completed`, stamping `ended_at` and writing the final bill.
pub fn end(consultation: &Consultation, now: DateTime<Utc>) -> Result<Consultation, ConsultationError> {
    require_status(consultation, ConsultationStatus::Active)?;

    let duration_minutes = consultation
        .started_at
        .map(|started_at| whole_minutes_between(started_at, now))
        .unwrap_or(0);
    let total_cost = compute_total_cost(
        consultation.rate_per_minute,
        duration_minutes,
        consultation.free_minutes_used,
    );

    Ok(Consultation {
        status: ConsultationStatus::Completed,
        ended_at: Some(now),
        duration_minutes,
        total_cost: Some(total_cost),
        updated_at: now,
        ..consultation.clone()
    })
}

/// `pending -> cancelled`, stamping `ended_at`. Nothing is billed.
pub fn cancel(consultation: &Consultation, now: DateTime<Utc>) -> Result<Consultation, ConsultationError> {
    require_status(consultation, ConsultationStatus::Pending)?;
    Ok(Consultation {
        status: ConsultationStatus::Cancelled,
        ended_at: Some(now),
        updated_at: now,
        ..consultation.clone()
    })
}
