use serde::{Deserialize, Serialize};
use tally_core::{CategorizedTransaction, DateRange, Money, MonthKey, SignConvention};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    /// Signed sum: expenses negative, income positive.
    pub total_amount: Money,
    pub transaction_count: usize,
    pub average_amount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthBalance {
    Surplus,
    Deficit,
}

impl MonthBalance {
    pub fn from_net(net: Money) -> Self {
        if net.is_positive() {
            MonthBalance::Surplus
        } else {
            MonthBalance::Deficit
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthReport {
    pub key: MonthKey,
    pub total_income: Money,
    /// Magnitude of all expenses in the month (non-negative).
    pub total_expense: Money,
    pub net: Money,
    pub income_count: usize,
    pub expense_count: usize,
    pub balance: MonthBalance,
    /// Largest absolute total first.
    pub category_summaries: Vec<CategorySummary>,
    /// Ascending by date.
    pub transactions: Vec<CategorizedTransaction>,
}

impl MonthReport {
    pub fn label(&self) -> String {
        self.key.label()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn category(&self, name: &str) -> Option<&CategorySummary> {
        self.category_summaries.iter().find(|c| c.category == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallSummary {
    pub total_income: Money,
    pub total_expense: Money,
    pub net: Money,
    pub transaction_count: usize,
    pub income_count: usize,
    pub expense_count: usize,
    pub average_income: Money,
    pub average_expense: Money,
    /// First to last dated transaction.
    pub period: Option<DateRange>,
    pub category_summaries: Vec<CategorySummary>,
}

impl OverallSummary {
    pub fn category(&self, name: &str) -> Option<&CategorySummary> {
        self.category_summaries.iter().find(|c| c.category == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Ascending by month.
    pub month_reports: Vec<MonthReport>,
    pub overall_summary: OverallSummary,
    /// Transactions left out of `month_reports` for lack of a usable date.
    pub unclassifiable_count: usize,
    pub unclassifiable: Vec<CategorizedTransaction>,
    pub sign_convention: SignConvention,
}

impl AnalysisResult {
    pub fn month(&self, key: MonthKey) -> Option<&MonthReport> {
        self.month_reports.iter().find(|m| m.key == key)
    }

    /// Dated plus undated transactions; equals the aggregator's input size.
    pub fn total_transactions(&self) -> usize {
        self.month_reports
            .iter()
            .map(MonthReport::transaction_count)
            .sum::<usize>()
            + self.unclassifiable_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_from_net() {
        assert_eq!(MonthBalance::from_net(Money::from_cents(1)), MonthBalance::Surplus);
        assert_eq!(MonthBalance::from_net(Money::zero()), MonthBalance::Deficit);
        assert_eq!(MonthBalance::from_net(Money::from_cents(-1)), MonthBalance::Deficit);
    }

    #[test]
    fn default_result_is_zero_valued() {
        let result = AnalysisResult::default();
        assert!(result.month_reports.is_empty());
        assert_eq!(result.overall_summary.net, Money::zero());
        assert_eq!(result.overall_summary.transaction_count, 0);
        assert!(result.overall_summary.period.is_none());
        assert_eq!(result.total_transactions(), 0);
    }
}
