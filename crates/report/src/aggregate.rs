use std::collections::{BTreeMap, HashMap};

use tally_core::{CategorizedTransaction, DateRange, Money, MonthKey, SignConvention};

use crate::summary::{AnalysisResult, CategorySummary, MonthBalance, MonthReport, OverallSummary};

/// Groups categorized transactions by calendar month and summarizes them.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthlyAggregator {
    convention: SignConvention,
}

/// Aggregates with the signed-amount convention.
pub fn aggregate(categorized: Vec<CategorizedTransaction>) -> AnalysisResult {
    MonthlyAggregator::default().aggregate(categorized)
}

impl MonthlyAggregator {
    pub fn new(convention: SignConvention) -> Self {
        Self { convention }
    }

    pub fn aggregate(&self, categorized: Vec<CategorizedTransaction>) -> AnalysisResult {
        let mut partitions: BTreeMap<MonthKey, Vec<CategorizedTransaction>> = BTreeMap::new();
        let mut unclassifiable = Vec::new();

        for ct in categorized {
            match ct.transaction.month_key() {
                Some(key) => partitions.entry(key).or_default().push(ct),
                None => unclassifiable.push(ct),
            }
        }

        if !unclassifiable.is_empty() {
            tracing::warn!(
                count = unclassifiable.len(),
                "Transactions without a usable date excluded from monthly reports"
            );
        }

        let partitions: Vec<(MonthKey, Vec<CategorizedTransaction>)> = partitions.into_iter().collect();

        #[cfg(feature = "parallel")]
        let summarized: Vec<(MonthReport, Totals)> = {
            use rayon::prelude::*;
            partitions
                .into_par_iter()
                .map(|(key, txs)| self.summarize_month(key, txs))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let summarized: Vec<(MonthReport, Totals)> = partitions
            .into_iter()
            .map(|(key, txs)| self.summarize_month(key, txs))
            .collect();

        let mut overall = Totals::default();
        let mut month_reports = Vec::with_capacity(summarized.len());
        for (report, totals) in summarized {
            overall.merge(totals);
            month_reports.push(report);
        }

        let period = DateRange::spanning(
            month_reports
                .iter()
                .flat_map(|m| m.transactions.iter())
                .filter_map(|ct| ct.transaction.date),
        );
        let overall_summary = overall.into_overall(period);

        tracing::info!(
            months = month_reports.len(),
            transactions = overall_summary.transaction_count,
            unclassifiable = unclassifiable.len(),
            net = %overall_summary.net,
            "Aggregated monthly reports"
        );

        AnalysisResult {
            month_reports,
            overall_summary,
            unclassifiable_count: unclassifiable.len(),
            unclassifiable,
            sign_convention: self.convention,
        }
    }

    fn summarize_month(
        &self,
        key: MonthKey,
        mut transactions: Vec<CategorizedTransaction>,
    ) -> (MonthReport, Totals) {
        let mut totals = Totals::default();
        for ct in &transactions {
            totals.add(ct, self.convention);
        }
        // Stable, so same-day transactions keep their statement order.
        transactions.sort_by_key(|ct| ct.transaction.date);

        let net = totals.income - totals.expense;
        tracing::debug!(month = %key, transactions = transactions.len(), net = %net, "Summarized month");

        let report = MonthReport {
            key,
            total_income: totals.income,
            total_expense: totals.expense,
            net,
            income_count: totals.income_count,
            expense_count: totals.expense_count,
            balance: MonthBalance::from_net(net),
            category_summaries: totals.category_summaries(),
            transactions,
        };
        (report, totals)
    }
}

/// Running sums for one month, or for the whole run after merging.
#[derive(Debug, Default)]
struct Totals {
    income: Money,
    expense: Money,
    count: usize,
    income_count: usize,
    expense_count: usize,
    by_category: HashMap<String, (Money, usize)>,
}

impl Totals {
    fn add(&mut self, ct: &CategorizedTransaction, convention: SignConvention) {
        let amount = ct.transaction.signed_amount(convention);
        self.count += 1;
        if amount.is_positive() {
            self.income += amount;
            self.income_count += 1;
        } else if amount.is_negative() {
            self.expense += amount.abs();
            self.expense_count += 1;
        }
        let entry = self
            .by_category
            .entry(ct.category.clone())
            .or_insert((Money::zero(), 0));
        entry.0 += amount;
        entry.1 += 1;
    }

    fn merge(&mut self, other: Totals) {
        self.income += other.income;
        self.expense += other.expense;
        self.count += other.count;
        self.income_count += other.income_count;
        self.expense_count += other.expense_count;
        for (category, (amount, count)) in other.by_category {
            let entry = self.by_category.entry(category).or_insert((Money::zero(), 0));
            entry.0 += amount;
            entry.1 += count;
        }
    }

    fn category_summaries(&self) -> Vec<CategorySummary> {
        let mut summaries: Vec<CategorySummary> = self
            .by_category
            .iter()
            .map(|(category, &(total, count))| CategorySummary {
                category: category.clone(),
                total_amount: total,
                transaction_count: count,
                average_amount: total.divided_by(count),
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.total_amount
                .abs()
                .cmp(&a.total_amount.abs())
                .then_with(|| a.category.cmp(&b.category))
        });
        summaries
    }

    fn into_overall(self, period: Option<DateRange>) -> OverallSummary {
        OverallSummary {
            total_income: self.income,
            total_expense: self.expense,
            net: self.income - self.expense,
            transaction_count: self.count,
            income_count: self.income_count,
            expense_count: self.expense_count,
            average_income: self.income.divided_by(self.income_count),
            average_expense: self.expense.divided_by(self.expense_count),
            period,
            category_summaries: self.category_summaries(),
        }
    }
}
