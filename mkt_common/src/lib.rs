mod commission;
mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use commission::{CommissionRate, CommissionSplit, InvalidCommissionRate, DEFAULT_COMMISSION_BPS};
pub use money::{Money, MoneyConversionError, DEFAULT_CURRENCY_CODE, DEFAULT_CURRENCY_CODE_LOWER};
pub use secret::Secret;
