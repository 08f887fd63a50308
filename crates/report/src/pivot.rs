//! Category × month tables for the spreadsheet-style overview: one table
//! for expenses and one for income, amounts as magnitudes.

use std::collections::BTreeMap;

use serde::Serialize;
use tally_core::{Money, MonthKey};

use crate::summary::AnalysisResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotRow {
    pub category: String,
    /// One cell per entry in `CategoryPivot::months`.
    pub cells: Vec<Money>,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPivot {
    pub months: Vec<MonthKey>,
    /// Sorted by category name; categories with no amounts are left out.
    pub rows: Vec<PivotRow>,
    pub column_totals: Vec<Money>,
    pub grand_total: Money,
}

#[derive(Clone, Copy)]
enum Side {
    Expense,
    Income,
}

impl CategoryPivot {
    pub fn expenses(result: &AnalysisResult) -> Self {
        Self::build(result, Side::Expense)
    }

    pub fn income(result: &AnalysisResult) -> Self {
        Self::build(result, Side::Income)
    }

    fn build(result: &AnalysisResult, side: Side) -> Self {
        let months: Vec<MonthKey> = result.month_reports.iter().map(|m| m.key).collect();
        let mut by_category: BTreeMap<&str, Vec<Money>> = BTreeMap::new();

        for (col, report) in result.month_reports.iter().enumerate() {
            for ct in &report.transactions {
                let amount = ct.transaction.signed_amount(result.sign_convention);
                let magnitude = match side {
                    Side::Expense if amount.is_negative() => amount.abs(),
                    Side::Income if amount.is_positive() => amount,
                    _ => continue,
                };
                let cells = by_category
                    .entry(ct.category.as_str())
                    .or_insert_with(|| vec![Money::zero(); months.len()]);
                cells[col] += magnitude;
            }
        }

        let rows: Vec<PivotRow> = by_category
            .into_iter()
            .map(|(category, cells)| PivotRow {
                category: category.to_string(),
                total: cells.iter().sum(),
                cells,
            })
            .collect();

        let column_totals: Vec<Money> = (0..months.len())
            .map(|col| rows.iter().map(|r| r.cells[col]).sum())
            .collect();
        let grand_total = column_totals.iter().sum();

        CategoryPivot {
            months,
            rows,
            column_totals,
            grand_total,
        }
    }

    pub fn row(&self, category: &str) -> Option<&PivotRow> {
        self.rows.iter().find(|r| r.category == category)
    }
}
