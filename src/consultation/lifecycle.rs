//! Status transitions for consultations.
//!
//! The transition table is strict: anything not listed in [`TRANSITIONS`] is
//! rejected with [`ApiError::InvalidTransition`], including moves out of the
//! terminal `completed` and `cancelled` states.

use super::model::{Consultation, ConsultationStatus, ScheduledDate};
use crate::core::{ApiError, ApiResult};

use ConsultationStatus::*;

/// Legal `(from, to)` pairs. `scheduled -> scheduled` is a reschedule.
pub const TRANSITIONS: &[(ConsultationStatus, ConsultationStatus)] = &[
    (Pending, Scheduled),
    (Pending, Cancelled),
    (Scheduled, Scheduled),
    (Scheduled, Completed),
];

/// Initial state of every new consultation.
pub const INITIAL_STATUS: ConsultationStatus = Pending;

pub fn can_transition(from: ConsultationStatus, to: ConsultationStatus) -> bool {
    TRANSITIONS.contains(&(from, to))
}

/// Validates and applies a status change to `record` in place.
///
/// Moving into `scheduled` requires a date, which replaces any earlier one.
/// Any other target must come without a date; an existing `scheduled_date`
/// is kept as-is.
pub fn apply(
    record: &mut Consultation,
    to: ConsultationStatus,
    scheduled_date: Option<ScheduledDate>,
) -> ApiResult<()> {
    let from = record.status;
    if from.is_terminal() {
        return Err(ApiError::InvalidTransition(format!(
            "consultation {} is already {from}",
            record.id
        )));
    }
    if !can_transition(from, to) {
        return Err(ApiError::InvalidTransition(format!(
            "cannot move consultation {} from {from} to {to}",
            record.id
        )));
    }

    match (to, scheduled_date) {
        (Scheduled, Some(date)) => record.scheduled_date = Some(date),
        (Scheduled, None) => {
            return Err(ApiError::validation(
                "scheduledDate is required when scheduling a consultation",
            ))
        }
        (_, Some(_)) => {
            return Err(ApiError::validation(format!(
                "scheduledDate is only accepted with status {}",
                Scheduled
            )))
        }
        (_, None) => {}
    }

    record.status = to;
    Ok(())
}
