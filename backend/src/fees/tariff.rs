use super::{elapsed_hours, round_money, FeeResult};
use crate::config::{TariffConfig, TariffPolicy};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Pricing strategy for a parking stay
pub trait ParkingTariff: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Fee for a stay of `elapsed`, rounded to cents
    fn fee(&self, elapsed: Duration) -> FeeResult<Decimal>;

    /// Fee for the stay `[entry, exit)`
    fn fee_between(&self, entry: DateTime<Utc>, exit: DateTime<Utc>) -> FeeResult<Decimal> {
        self.fee(exit.signed_duration_since(entry))
    }
}

/// First hour at a flat price, every hour after at `hourly_rate`.
///
/// `d <= 1h -> first_hour_fee`, `d > 1h -> first_hour_fee + (d - 1) * hourly_rate`
#[derive(Debug, Clone)]
pub struct TieredTariff {
    pub first_hour_fee: Decimal,
    pub hourly_rate: Decimal,
}

impl TieredTariff {
    pub fn new(first_hour_fee: Decimal, hourly_rate: Decimal) -> Self {
        Self {
            first_hour_fee,
            hourly_rate,
        }
    }
}

impl Default for TieredTariff {
    fn default() -> Self {
        Self::new(Decimal::new(60, 0), Decimal::new(20, 0))
    }
}

impl ParkingTariff for TieredTariff {
    fn name(&self) -> &'static str {
        "tiered"
    }

    fn fee(&self, elapsed: Duration) -> FeeResult<Decimal> {
        let hours = elapsed_hours(elapsed)?;
        if hours <= Decimal::ONE {
            return Ok(round_money(self.first_hour_fee));
        }
        Ok(round_money(
            self.first_hour_fee + (hours - Decimal::ONE) * self.hourly_rate,
        ))
    }
}

/// `d * hourly_rate`, no minimum charge
#[derive(Debug, Clone)]
pub struct FlatTariff {
    pub hourly_rate: Decimal,
}

impl FlatTariff {
    pub fn new(hourly_rate: Decimal) -> Self {
        Self { hourly_rate }
    }
}

impl Default for FlatTariff {
    fn default() -> Self {
        Self::new(Decimal::new(50, 0))
    }
}

impl ParkingTariff for FlatTariff {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn fee(&self, elapsed: Duration) -> FeeResult<Decimal> {
        Ok(round_money(elapsed_hours(elapsed)? * self.hourly_rate))
    }
}

/// Build the configured tariff
pub fn tariff_from_config(config: &TariffConfig) -> Arc<dyn ParkingTariff> {
    match config.policy {
        TariffPolicy::Tiered => Arc::new(TieredTariff::new(
            config.first_hour_fee,
            config.hourly_rate,
        )),
        TariffPolicy::Flat => Arc::new(FlatTariff::new(config.flat_hourly_rate)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::FeeError;

    #[test]
    fn test_tiered_first_hour_is_flat() {
        let tariff = TieredTariff::default();
        assert_eq!(tariff.fee(Duration::minutes(30)).unwrap(), Decimal::new(60, 0));
        assert_eq!(tariff.fee(Duration::zero()).unwrap(), Decimal::new(60, 0));
    }

    #[test]
    fn test_tiered_boundary_is_inclusive() {
        let tariff = TieredTariff::default();
        assert_eq!(tariff.fee(Duration::hours(1)).unwrap(), Decimal::new(60, 0));
    }

    #[test]
    fn test_tiered_after_first_hour() {
        let tariff = TieredTariff::default();
        assert_eq!(tariff.fee(Duration::hours(2)).unwrap(), Decimal::new(80, 0));
        // 1h20m -> 60 + 1/3 * 20 = 66.666.. -> 66.67
        assert_eq!(tariff.fee(Duration::minutes(80)).unwrap(), Decimal::new(6667, 2));
    }

    #[test]
    fn test_flat_tariff() {
        let tariff = FlatTariff::default();
        assert_eq!(tariff.fee(Duration::minutes(30)).unwrap(), Decimal::new(25, 0));
        assert_eq!(tariff.fee(Duration::hours(3)).unwrap(), Decimal::new(150, 0));
        assert_eq!(tariff.fee(Duration::zero()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_inverted_stay_is_an_error() {
        let entry = Utc::now();
        let exit = entry - Duration::minutes(1);
        assert!(matches!(
            TieredTariff::default().fee_between(entry, exit),
            Err(FeeError::NegativeDuration(_))
        ));
        assert!(FlatTariff::default().fee_between(entry, exit).is_err());
    }

    #[test]
    fn test_tariff_from_config() {
        let mut config = TariffConfig::default();
        assert_eq!(tariff_from_config(&config).name(), "tiered");

        config.policy = TariffPolicy::Flat;
        let tariff = tariff_from_config(&config);
        assert_eq!(tariff.name(), "flat");
        assert_eq!(tariff.fee(Duration::hours(2)).unwrap(), Decimal::new(100, 0));
    }
}
