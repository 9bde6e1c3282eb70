use super::{hours_between, round_money, FeeResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Accrues charging cost at a fixed hourly rate.
///
/// Cost is folded into the running total each time a session segment ends;
/// the segment start is discarded afterwards, so totals are never rebuilt
/// from a start time.
#[derive(Debug, Clone)]
pub struct ChargingMeter {
    rate_per_hour: Decimal,
}

impl ChargingMeter {
    pub fn new(rate_per_hour: Decimal) -> Self {
        Self { rate_per_hour }
    }

    pub fn rate_per_hour(&self) -> Decimal {
        self.rate_per_hour
    }

    /// Cost of the segment `[started_at, now)`
    pub fn segment_cost(&self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> FeeResult<Decimal> {
        Ok(round_money(hours_between(started_at, now)? * self.rate_per_hour))
    }

    /// `accumulated + segment_cost(started_at, now)`
    pub fn accrue(
        &self,
        accumulated: Decimal,
        started_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> FeeResult<Decimal> {
        Ok(accumulated + self.segment_cost(started_at, now)?)
    }
}
