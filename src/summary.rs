// 📊 Aggregation - Summary rows, totals and expense breakdown
//
// Summary rows group entries by day (YYYY-MM-DD) or month (YYYY-MM).
// Income and expense figures are SUMMED per group, but capital remaining is a
// running balance: each group keeps the value of the LAST entry scanned into
// it (source sequence order), it is never summed.

use crate::entry::LedgerEntry;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// GROUPING MODE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    #[default]
    Daily,
    Monthly,
}

impl GroupMode {
    pub fn toggle(&self) -> Self {
        match self {
            GroupMode::Daily => GroupMode::Monthly,
            GroupMode::Monthly => GroupMode::Daily,
        }
    }

    /// Grouping key of an entry under this mode
    pub fn key_for(&self, entry: &LedgerEntry) -> String {
        match self {
            GroupMode::Daily => entry.date_key(),
            GroupMode::Monthly => entry.month_key(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            GroupMode::Daily => "Daily",
            GroupMode::Monthly => "Monthly",
        }
    }
}

impl fmt::Display for GroupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupMode::Daily => write!(f, "daily"),
            GroupMode::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for GroupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(GroupMode::Daily),
            "monthly" | "month" => Ok(GroupMode::Monthly),
            other => Err(format!("unknown view mode '{}' (expected daily or monthly)", other)),
        }
    }
}

// ============================================================================
// SUMMARY ROWS
// ============================================================================

/// One aggregated row for charts and reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// YYYY-MM-DD (daily) or YYYY-MM (monthly)
    pub key: String,
    pub net_income: Decimal,
    pub gross_income: Decimal,
    pub production: Decimal,
    pub total_expenses: Decimal,
    /// Last-wins, not summed
    pub capital_remaining: Decimal,
    pub entry_count: usize,
}

impl SummaryRow {
    fn start(key: String, entry: &LedgerEntry) -> Self {
        SummaryRow {
            key,
            net_income: entry.net_income,
            gross_income: entry.gross_income,
            production: entry.production,
            total_expenses: entry.total_expenses(),
            capital_remaining: entry.capital_remaining,
            entry_count: 1,
        }
    }

    fn absorb(&mut self, entry: &LedgerEntry) {
        self.net_income = self.net_income.saturating_add(entry.net_income);
        self.gross_income = self.gross_income.saturating_add(entry.gross_income);
        self.production = self.production.saturating_add(entry.production);
        self.total_expenses = self.total_expenses.saturating_add(entry.total_expenses());
        self.capital_remaining = entry.capital_remaining;
        self.entry_count += 1;
    }
}

/// Group entries by day or month, ordered by key ascending.
/// Within a group the entry scanned last sets capital remaining.
pub fn summarize(entries: &[LedgerEntry], mode: GroupMode) -> Vec<SummaryRow> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<SummaryRow> = Vec::new();

    for entry in entries {
        let key = mode.key_for(entry);
        match index.get(&key) {
            Some(&i) => rows[i].absorb(entry),
            None => {
                index.insert(key.clone(), rows.len());
                rows.push(SummaryRow::start(key, entry));
            }
        }
    }

    // Zero-padded keys sort chronologically as strings
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows
}

// ============================================================================
// TOTALS
// ============================================================================

/// Whole-ledger totals for stats cards and the export summary table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub entry_count: usize,
    pub total_capital: Decimal,
    pub total_factory_expenses: Decimal,
    pub total_personal_expenses: Decimal,
    pub total_loans: Decimal,
    pub total_rejects: Decimal,
    pub total_production: Decimal,
    pub total_gross_income: Decimal,
    pub total_net_income: Decimal,
    /// Capital remaining of the latest-dated entry (later in sequence wins ties)
    pub final_capital_remaining: Decimal,
}

impl Totals {
    pub fn total_expenses(&self) -> Decimal {
        self.total_factory_expenses
            .saturating_add(self.total_personal_expenses)
            .saturating_add(self.total_loans)
            .saturating_add(self.total_rejects)
    }
}

/// Sums saturate at the `Decimal` range
pub fn totals(entries: &[LedgerEntry]) -> Totals {
    let mut totals = Totals::default();
    let mut latest: Option<&LedgerEntry> = None;

    for entry in entries {
        totals.entry_count += 1;
        totals.total_capital = totals.total_capital.saturating_add(entry.capital);
        totals.total_factory_expenses = totals.total_factory_expenses.saturating_add(entry.factory_expenses);
        totals.total_personal_expenses = totals.total_personal_expenses.saturating_add(entry.personal_expenses);
        totals.total_loans = totals.total_loans.saturating_add(entry.loans);
        totals.total_rejects = totals.total_rejects.saturating_add(entry.rejects);
        totals.total_production = totals.total_production.saturating_add(entry.production);
        totals.total_gross_income = totals.total_gross_income.saturating_add(entry.gross_income);
        totals.total_net_income = totals.total_net_income.saturating_add(entry.net_income);

        if latest.map_or(true, |l| entry.date >= l.date) {
            latest = Some(entry);
        }
    }

    totals.final_capital_remaining = latest.map(|e| e.capital_remaining).unwrap_or(Decimal::ZERO);
    totals
}

// ============================================================================
// EXPENSE BREAKDOWN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseSlice {
    pub name: &'static str,
    pub value: Decimal,
    /// Fraction of total expenses in [0, 1]
    pub share: f64,
}

/// The four expense components as slices of the whole
pub fn expense_breakdown(totals: &Totals) -> Vec<ExpenseSlice> {
    let parts = [
        ("Factory Expenses", totals.total_factory_expenses),
        ("Personal Expenses", totals.total_personal_expenses),
        ("Loans", totals.total_loans),
        ("Rejects", totals.total_rejects),
    ];

    // Negative components have no meaningful share of a pie
    let whole = parts
        .iter()
        .fold(Decimal::ZERO, |acc, (_, v)| acc.saturating_add((*v).max(Decimal::ZERO)));

    parts
        .iter()
        .map(|&(name, value)| {
            let share = if whole > Decimal::ZERO && value > Decimal::ZERO {
                (value / whole).to_f64().unwrap_or(0.0).clamp(0.0, 1.0)
            } else {
                0.0
            };
            ExpenseSlice { name, value, share }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryInput, IncomeBasis, DATE_FORMAT};
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_test_entry(id: &str, date: &str, capital: &str, production: &str, factory: &str) -> LedgerEntry {
        let input = EntryInput {
            capital: d(capital),
            production: d(production),
            gross_income: d(production),
            factory_expenses: d(factory),
            ..EntryInput::zeroed(NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap())
        };
        LedgerEntry::derive(id.to_string(), &input, IncomeBasis::Production)
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[], GroupMode::Daily).is_empty());
        assert!(summarize(&[], GroupMode::Monthly).is_empty());
    }

    #[test]
    fn test_daily_groups_sum_and_last_wins() {
        let entries = vec![
            create_test_entry("1", "2025-01-02", "1000", "500", "100"), // net 400, cap 1400
            create_test_entry("2", "2025-01-01", "200", "50", "10"),    // net 40, cap 240
            create_test_entry("3", "2025-01-02", "300", "100", "20"),   // net 80, cap 380
        ];

        let rows = summarize(&entries, GroupMode::Daily);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "2025-01-01");
        assert_eq!(rows[0].net_income, d("40"));
        assert_eq!(rows[1].key, "2025-01-02");
        assert_eq!(rows[1].net_income, d("480"));
        assert_eq!(rows[1].total_expenses, d("120"));
        assert_eq!(rows[1].gross_income, d("600"));
        assert_eq!(rows[1].entry_count, 2);
        // Overwritten by the later entry in the sequence, not summed
        assert_eq!(rows[1].capital_remaining, d("380"));
    }

    #[test]
    fn test_monthly_groups_use_scan_order_for_capital() {
        let entries = vec![
            create_test_entry("1", "2025-02-20", "100", "0", "0"),
            create_test_entry("2", "2025-01-31", "50", "10", "0"),
            create_test_entry("3", "2025-02-03", "70", "0", "0"),
        ];

        let rows = summarize(&entries, GroupMode::Monthly);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "2025-01");
        assert_eq!(rows[1].key, "2025-02");
        assert_eq!(rows[1].entry_count, 2);
        // Entry 3 is scanned after entry 1 even though its date is earlier
        assert_eq!(rows[1].capital_remaining, d("70"));
    }

    #[test]
    fn test_summary_sums_match_totals() {
        let entries = vec![
            create_test_entry("1", "2025-03-01", "1000", "500", "100"),
            create_test_entry("2", "2025-03-05", "1400", "300", "250"),
            create_test_entry("3", "2025-04-01", "1450", "800", "75.5"),
            create_test_entry("4", "2025-03-05", "10", "0", "5"),
        ];
        let t = totals(&entries);

        for mode in [GroupMode::Daily, GroupMode::Monthly] {
            let rows = summarize(&entries, mode);
            let net: Decimal = rows.iter().map(|r| r.net_income).sum();
            let expenses: Decimal = rows.iter().map(|r| r.total_expenses).sum();
            let count: usize = rows.iter().map(|r| r.entry_count).sum();

            assert_eq!(net, t.total_net_income);
            assert_eq!(expenses, t.total_expenses());
            assert_eq!(count, entries.len());
            assert_eq!(rows.last().unwrap().capital_remaining, t.final_capital_remaining);
        }
    }

    #[test]
    fn test_totals_final_capital_is_latest_date() {
        let entries = vec![
            create_test_entry("1", "2025-05-10", "100", "0", "0"),
            create_test_entry("2", "2025-05-01", "999", "0", "0"),
        ];

        let t = totals(&entries);

        assert_eq!(t.entry_count, 2);
        assert_eq!(t.total_capital, d("1099"));
        assert_eq!(t.final_capital_remaining, d("100"));
    }

    #[test]
    fn test_huge_amounts_saturate() {
        let huge = "50000000000000000000000000000";
        let entries = vec![
            create_test_entry("1", "2025-04-01", huge, huge, "0"),
            create_test_entry("2", "2025-04-01", huge, huge, huge),
        ];

        let t = totals(&entries);
        assert_eq!(t.total_capital, Decimal::MAX);
        assert_eq!(t.total_production, Decimal::MAX);
        assert_eq!(t.total_net_income, d(huge));
        assert_eq!(t.final_capital_remaining, d(huge));

        let rows = summarize(&entries, GroupMode::Daily);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].gross_income, Decimal::MAX);
        assert_eq!(rows[0].capital_remaining, d(huge));

        let both = vec![entries[1].clone(), entries[1].clone()];
        let all = totals(&both);
        assert_eq!(all.total_expenses(), Decimal::MAX);
        let slices = expense_breakdown(&all);
        assert_eq!(slices[0].share, 1.0);
    }

    #[test]
    fn test_totals_empty() {
        let t = totals(&[]);
        assert_eq!(t, Totals::default());
        assert_eq!(t.final_capital_remaining, Decimal::ZERO);
    }

    #[test]
    fn test_expense_breakdown_shares() {
        let t = Totals {
            total_factory_expenses: d("300"),
            total_personal_expenses: d("100"),
            total_loans: Decimal::ZERO,
            total_rejects: d("100"),
            ..Totals::default()
        };

        let slices = expense_breakdown(&t);

        assert_eq!(slices.len(), 4);
        assert_eq!(slices[0].name, "Factory Expenses");
        assert!((slices[0].share - 0.6).abs() < 1e-9);
        assert!((slices[1].share - 0.2).abs() < 1e-9);
        assert_eq!(slices[2].share, 0.0);
        let sum: f64 = slices.iter().map(|s| s.share).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_group_mode_parse_and_toggle() {
        assert_eq!("Monthly".parse::<GroupMode>(), Ok(GroupMode::Monthly));
        assert!("weekly".parse::<GroupMode>().is_err());
        assert_eq!(GroupMode::Daily.toggle(), GroupMode::Monthly);
        assert_eq!(GroupMode::Monthly.to_string(), "monthly");
    }
}
