pub mod money;
pub mod period;
pub mod transaction;

pub use money::{Money, MoneyError};
pub use period::{DateRange, MonthKey};
pub use transaction::{
    CategorizedTransaction, MatchTier, SignConvention, Transaction, TxKind, FALLBACK_CATEGORY,
};
