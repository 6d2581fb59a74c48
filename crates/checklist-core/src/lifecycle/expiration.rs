//! Completion expiry.

use chrono::{DateTime, Days, Months, Utc};

use crate::models::ExpirationPolicy;

/// Computes when a completion stops counting.
///
/// Agencies may plug in their own due-date rules; the engine treats the
/// result as opaque.
pub trait ExpirationCalculator {
    fn expires_on(&self, policy: &ExpirationPolicy, reference: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// Calendar arithmetic on the policy's unit. Month ends clamp (Jan 31 + 1 month = Feb 28/29).
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarExpiration;

impl ExpirationCalculator for CalendarExpiration {
    fn expires_on(&self, policy: &ExpirationPolicy, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *policy {
            ExpirationPolicy::Never => None,
            ExpirationPolicy::Days(count) => reference.checked_add_days(Days::new(u64::from(count))),
            ExpirationPolicy::Months(count) => reference.checked_add_months(Months::new(count)),
            ExpirationPolicy::Years(count) => {
                reference.checked_add_months(Months::new(count.saturating_mul(12)))
            }
        }
    }
}
