//! Three-tier categorization.
//!
//! Each tier is checked against every category before the next tier is
//! tried, so an exact hit in a late category beats a fuzzy or regex hit in
//! an earlier one. Within a tier the first-declared category wins.

use std::collections::HashMap;

use serde::Serialize;
use tally_core::{CategorizedTransaction, MatchTier, Transaction, FALLBACK_CATEGORY};

use crate::normalize::normalize;
use crate::rule_set::RuleSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Categorization<'a> {
    pub category: &'a str,
    pub tier: MatchTier,
}

impl Categorization<'_> {
    fn fallback() -> Self {
        Categorization {
            category: FALLBACK_CATEGORY,
            tier: MatchTier::None,
        }
    }
}

pub fn categorize<'a>(description: &str, rules: &'a RuleSet) -> Categorization<'a> {
    let text = normalize(description);
    let mode = rules.options().exact_mode;

    let rule_list = rules.rules();
    let found = rule_list
        .iter()
        .find(|rule| rule.matches_exact(&text, mode))
        .map(|rule| (rule, MatchTier::Exact))
        .or_else(|| {
            rule_list
                .iter()
                .find(|rule| rule.matches_fuzzy(&text))
                .map(|rule| (rule, MatchTier::Fuzzy))
        })
        .or_else(|| {
            rule_list
                .iter()
                .find(|rule| rule.matches_regex(&text))
                .map(|rule| (rule, MatchTier::Regex))
        });

    if let Some((rule, tier)) = found {
        tracing::debug!(%tier, category = rule.name(), description, "Matched");
        return Categorization {
            category: rule.name(),
            tier,
        };
    }

    Categorization::fallback()
}

impl RuleSet {
    pub fn categorize(&self, description: &str) -> Categorization<'_> {
        categorize(description, self)
    }
}

pub fn categorize_transaction(transaction: Transaction, rules: &RuleSet) -> CategorizedTransaction {
    let Categorization { category, tier } = categorize(&transaction.description, rules);
    CategorizedTransaction::new(transaction, category, tier)
}

/// Categorizes a batch, keeping input order.
pub fn categorize_all(transactions: Vec<Transaction>, rules: &RuleSet) -> Vec<CategorizedTransaction> {
    #[cfg(feature = "parallel")]
    let categorized: Vec<CategorizedTransaction> = {
        use rayon::prelude::*;
        transactions
            .into_par_iter()
            .map(|tx| categorize_transaction(tx, rules))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let categorized: Vec<CategorizedTransaction> = transactions
        .into_iter()
        .map(|tx| categorize_transaction(tx, rules))
        .collect();

    let uncategorized = categorized.iter().filter(|ct| ct.is_uncategorized()).count();
    tracing::info!(
        total = categorized.len(),
        uncategorized,
        "Categorized transactions"
    );
    categorized
}

/// Transactions per category, most frequent first, ties by name.
pub fn category_counts(categorized: &[CategorizedTransaction]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for ct in categorized {
        *counts.entry(ct.category.as_str()).or_insert(0) += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, n)| (name.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_set::{ExactMatchMode, MatchOptions, RuleDefinition};
    use chrono::NaiveDate;
    use tally_core::Money;

    fn rules(defs: Vec<(&str, RuleDefinition)>) -> RuleSet {
        RuleSet::from_definitions(
            defs.into_iter().map(|(n, d)| (n.to_string(), d)),
            MatchOptions::default(),
        )
        .unwrap()
    }

    fn scenario_rules() -> RuleSet {
        RuleSet::from_json(r#"{"Food": {"exact": ["starbucks"]}, "Shopping": {"fuzzy": ["amazon"]}}"#)
            .unwrap()
    }

    // ── single tiers ────────────────────────────────────────────────────────

    #[test]
    fn exact_match_with_merchant_suffix() {
        let set = scenario_rules();
        let result = categorize("STARBUCKS #123", &set);
        assert_eq!(result, Categorization { category: "Food", tier: MatchTier::Exact });
    }

    #[test]
    fn fuzzy_match_term_in_description() {
        let set = scenario_rules();
        let result = categorize("AMAZON MKTPLACE", &set);
        assert_eq!(result, Categorization { category: "Shopping", tier: MatchTier::Fuzzy });
    }

    #[test]
    fn fuzzy_match_description_in_term() {
        let set = rules(vec![("Telecom", RuleDefinition::fuzzy(["verizon wireless"]))]);
        let result = categorize("  Verizon  ", &set);
        assert_eq!(result, Categorization { category: "Telecom", tier: MatchTier::Fuzzy });
    }

    #[test]
    fn empty_description_does_not_fuzzy_match_everything() {
        let set = rules(vec![("Telecom", RuleDefinition::fuzzy(["verizon"]))]);
        assert_eq!(categorize("   ", &set).tier, MatchTier::None);
    }

    // ── tier priority ───────────────────────────────────────────────────────

    #[test]
    fn exact_beats_fuzzy_declared_earlier() {
        let set = rules(vec![
            ("Shopping", RuleDefinition::fuzzy(["coffee"])),
            ("Food", RuleDefinition::exact(["starbucks"])),
        ]);
        let result = categorize("STARBUCKS COFFEE", &set);
        assert_eq!(result, Categorization { category: "Food", tier: MatchTier::Exact });
    }

    #[test]
    fn fuzzy_beats_regex_declared_earlier() {
        let set = rules(vec![
            ("Cash", RuleDefinition::regex([r"\d{4}"])),
            ("Fuel", RuleDefinition::fuzzy(["shell"])),
        ]);
        let result = categorize("SHELL 4411", &set);
        assert_eq!(result, Categorization { category: "Fuel", tier: MatchTier::Fuzzy });
    }

    #[test]
    fn first_declared_wins_within_exact_tier() {
        let set = rules(vec![
            ("Groceries", RuleDefinition::exact(["target"])),
            ("Shopping", RuleDefinition::exact(["target"])),
        ]);
        assert_eq!(categorize("TARGET 0042", &set).category, "Groceries");

        let reversed = rules(vec![
            ("Shopping", RuleDefinition::exact(["target"])),
            ("Groceries", RuleDefinition::exact(["target"])),
        ]);
        assert_eq!(categorize("TARGET 0042", &reversed).category, "Shopping");
    }

    #[test]
    fn first_declared_wins_within_fuzzy_tier() {
        let set = rules(vec![
            ("A", RuleDefinition::fuzzy(["market"])),
            ("B", RuleDefinition::fuzzy(["super"])),
        ]);
        assert_eq!(categorize("SUPER MARKET", &set).category, "A");
    }

    #[test]
    fn regex_tier_in_declaration_order() {
        let set = rules(vec![
            ("Cash", RuleDefinition::regex([r"^atm", r"withdrawal"])),
            ("Fees", RuleDefinition::regex([r"withdrawal fee"])),
        ]);
        let result = categorize("Withdrawal FEE", &set);
        assert_eq!(result, Categorization { category: "Cash", tier: MatchTier::Regex });
    }

    #[test]
    fn regex_sees_normalized_description() {
        let set = rules(vec![("Cash", RuleDefinition::regex([r"^atm withdrawal$"]))]);
        assert_eq!(categorize("  ATM    Withdrawal ", &set).tier, MatchTier::Regex);
    }

    #[test]
    fn disabled_regex_tier_falls_through() {
        let set = RuleSet::from_json(
            r#"{"Broken": {"fuzzy": ["zzz"], "regex": ["atm", "("]}, "Cash": {"regex": ["atm"]}}"#,
        )
        .unwrap();
        assert_eq!(categorize("ATM 1", &set).category, "Cash");
    }

    // ── fallback ────────────────────────────────────────────────────────────

    #[test]
    fn unknown_vendor_is_uncategorized() {
        let set = scenario_rules();
        let result = categorize("UNKNOWN VENDOR XYZ", &set);
        assert_eq!(result, Categorization { category: "Uncategorized", tier: MatchTier::None });
    }

    #[test]
    fn empty_rule_set_is_uncategorized() {
        let empty = RuleSet::default();
        let result = categorize("ANYTHING", &empty);
        assert_eq!(result.category, FALLBACK_CATEGORY);
        assert_eq!(result.tier, MatchTier::None);
    }

    #[test]
    fn categorize_is_deterministic() {
        let set = RuleSet::from_json(&crate::RuleSource::template().to_json_pretty().unwrap()).unwrap();
        for desc in ["UBER TRIP", "CVS PHARMACY", "GAS STATION 12", "???", "Water Dept"] {
            let first = categorize(desc, &set);
            for _ in 0..5 {
                assert_eq!(categorize(desc, &set), first);
            }
        }
    }

    // ── options ─────────────────────────────────────────────────────────────

    #[test]
    fn whole_word_mode_rejects_embedded_terms() {
        let set = rules(vec![("Fuel", RuleDefinition::exact(["gas"]))])
            .with_options(MatchOptions { exact_mode: ExactMatchMode::WholeWord });
        assert_eq!(categorize("VEGAS HOTEL", &set).tier, MatchTier::None);
        assert_eq!(categorize("GAS 4411", &set).tier, MatchTier::Exact);

        let substring = rules(vec![("Fuel", RuleDefinition::exact(["gas"]))]);
        assert_eq!(categorize("VEGAS HOTEL", &substring).tier, MatchTier::Exact);
    }

    // ── batches ─────────────────────────────────────────────────────────────

    #[test]
    fn categorize_all_keeps_order() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let txs = vec![
            Transaction::new(date, "AMAZON MKTPLACE", Money::from_cents(-3210)),
            Transaction::new(date, "STARBUCKS #123", Money::from_cents(-450)),
            Transaction::undated("PAYROLL", Money::from_cents(320000)),
        ];
        let out = categorize_all(txs, &scenario_rules());
        let cats: Vec<_> = out.iter().map(|c| (c.category.as_str(), c.match_tier)).collect();
        assert_eq!(
            cats,
            vec![
                ("Shopping", MatchTier::Fuzzy),
                ("Food", MatchTier::Exact),
                ("Uncategorized", MatchTier::None),
            ]
        );
        assert_eq!(out[2].transaction.description, "PAYROLL");
    }

    #[test]
    fn category_counts_sorted_by_frequency() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let txs = ["STARBUCKS", "AMAZON", "STARBUCKS #2", "RENT", "DENTIST"]
            .iter()
            .map(|d| Transaction::new(date, d, Money::from_cents(-100)))
            .collect();
        let counts = category_counts(&categorize_all(txs, &scenario_rules()));
        assert_eq!(
            counts,
            vec![
                ("Food".to_string(), 2),
                ("Uncategorized".to_string(), 2),
                ("Shopping".to_string(), 1),
            ]
        );
    }
}
