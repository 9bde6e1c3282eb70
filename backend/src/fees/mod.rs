//! Fee calculation for parking stays and charging sessions.
//!
//! Everything here is pure: callers pass the interval, the functions return
//! an amount rounded to two decimal places.

pub mod charging;
pub mod tariff;

pub use charging::ChargingMeter;
pub use tariff::{tariff_from_config, FlatTariff, ParkingTariff, TieredTariff};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Error types for fee calculation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    #[error("Negative duration: interval ends {0} µs before it starts")]
    NegativeDuration(i64),
}

/// Result type for fee calculation
pub type FeeResult<T> = Result<T, FeeError>;

const MICROS_PER_HOUR: i64 = 3_600_000_000;
const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Elapsed time in (fractional) hours. Negative intervals are rejected, never clamped,
/// however small the inversion.
pub fn elapsed_hours(elapsed: Duration) -> FeeResult<Decimal> {
    if elapsed < Duration::zero() {
        let behind = (-elapsed).num_microseconds().unwrap_or(i64::MAX).max(1);
        return Err(FeeError::NegativeDuration(behind));
    }
    match elapsed.num_microseconds() {
        Some(micros) => Ok(Decimal::from(micros) / Decimal::from(MICROS_PER_HOUR)),
        // Only intervals of several hundred thousand years overflow microseconds
        None => Ok(Decimal::from(elapsed.num_milliseconds()) / Decimal::from(MILLIS_PER_HOUR)),
    }
}

/// Hours between `start` and `end`
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> FeeResult<Decimal> {
    elapsed_hours(end.signed_duration_since(start))
}

/// Round a monetary amount to cents, halves away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
