use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::Money;

/// The platform-wide commission when no `commission_config` row applies: 10%.
pub const DEFAULT_COMMISSION_BPS: i64 = 1_000;

const BPS_PER_UNIT: i64 = 10_000;

//--------------------------------------   CommissionRate    ---------------------------------------------------------
/// The marketplace's cut of an order, in basis points (1 bps = 0.01%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct CommissionRate(i64);

#[derive(Debug, Clone, Error)]
#[error("Commission rate must be between 0 and 10000 basis points. Got {0}")]
pub struct InvalidCommissionRate(pub i64);

impl Default for CommissionRate {
    fn default() -> Self {
        Self(DEFAULT_COMMISSION_BPS)
    }
}

impl TryFrom<i64> for CommissionRate {
    type Error = InvalidCommissionRate;

    fn try_from(bps: i64) -> Result<Self, Self::Error> {
        if (0..=BPS_PER_UNIT).contains(&bps) {
            Ok(Self(bps))
        } else {
            Err(InvalidCommissionRate(bps))
        }
    }
}

impl Display for CommissionRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

impl CommissionRate {
    pub fn bps(&self) -> i64 {
        self.0
    }

    /// The fee owed to the marketplace on `amount`, rounded down to the nearest minor unit.
    pub fn fee_for(&self, amount: Money) -> Money {
        let fee = i128::from(amount.value()) * i128::from(self.0) / i128::from(BPS_PER_UNIT);
        // fee <= amount since bps <= 10_000, so this always fits
        Money::from(fee as i64)
    }
}

//--------------------------------------   CommissionSplit   ---------------------------------------------------------
/// How a gross amount is divided between the marketplace and the vendor. `marketplace_fee + vendor_payout == gross`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    pub gross: Money,
    pub marketplace_fee: Money,
    pub vendor_payout: Money,
}

impl CommissionSplit {
    pub fn new(gross: Money, rate: CommissionRate) -> Self {
        Self::with_fee(gross, rate.fee_for(gross))
    }

    /// Use a fee reported by the payment provider rather than computing one.
    pub fn with_fee(gross: Money, marketplace_fee: Money) -> Self {
        Self { gross, marketplace_fee, vendor_payout: gross - marketplace_fee }
    }
}
