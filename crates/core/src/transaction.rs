use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;
use super::period::MonthKey;

/// Category assigned when no rule tier matches.
pub const FALLBACK_CATEGORY: &str = "Uncategorized";

/// Direction flag for extractors that report unsigned amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Income,
    Expense,
}

impl std::str::FromStr for TxKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "credit" | "cr" | "deposit" => Ok(TxKind::Income),
            "expense" | "debit" | "dr" | "withdrawal" => Ok(TxKind::Expense),
            other => Err(format!("Unknown transaction kind: '{other}'")),
        }
    }
}

/// How a transaction's amount encodes income vs. expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    /// Negative amounts are expenses, positive amounts are income.
    #[default]
    Signed,
    /// Direction comes from `Transaction::kind`; the amount is a magnitude.
    /// Transactions without a kind fall back to the amount's sign.
    KindFlag,
}

impl std::str::FromStr for SignConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "signed" => Ok(SignConvention::Signed),
            "kind_flag" | "kind" => Ok(SignConvention::KindFlag),
            other => Err(format!("Unknown sign convention: '{other}'")),
        }
    }
}

/// A transaction as handed over by the statement extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// `None` when the statement date was missing or could not be parsed.
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TxKind>,
}

impl Transaction {
    pub fn new(date: NaiveDate, description: &str, amount: Money) -> Self {
        Transaction {
            date: Some(date),
            description: description.to_string(),
            amount,
            kind: None,
        }
    }

    pub fn undated(description: &str, amount: Money) -> Self {
        Transaction {
            date: None,
            description: description.to_string(),
            amount,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: TxKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn month_key(&self) -> Option<MonthKey> {
        self.date.map(MonthKey::from_date)
    }

    /// Amount with income positive and expense negative under `convention`.
    pub fn signed_amount(&self, convention: SignConvention) -> Money {
        match (convention, self.kind) {
            (SignConvention::KindFlag, Some(TxKind::Income)) => self.amount.abs(),
            (SignConvention::KindFlag, Some(TxKind::Expense)) => -self.amount.abs(),
            _ => self.amount,
        }
    }
}

/// Which matching tier produced a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Fuzzy,
    Regex,
    None,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchTier::Exact => write!(f, "exact"),
            MatchTier::Fuzzy => write!(f, "fuzzy"),
            MatchTier::Regex => write!(f, "regex"),
            MatchTier::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub category: String,
    pub match_tier: MatchTier,
}

impl CategorizedTransaction {
    pub fn new(transaction: Transaction, category: &str, match_tier: MatchTier) -> Self {
        CategorizedTransaction {
            transaction,
            category: category.to_string(),
            match_tier,
        }
    }

    pub fn is_uncategorized(&self) -> bool {
        self.match_tier == MatchTier::None
    }
}
