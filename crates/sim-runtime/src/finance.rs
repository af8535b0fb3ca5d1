//! Cash, categorized expenses, and daily/all-time statistics.
//!
//! All money is `Decimal` rounded to cents. Voluntary spending goes
//! through [`FinancialLedger::debit`], which refuses to overdraw;
//! obligations (wages, overhead) go through
//! [`FinancialLedger::charge_obligation`], which may push the balance
//! negative so a cash crisis is visible rather than silently skipped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::SimError;
use std::collections::BTreeMap;

/// Expense buckets for reporting.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ExpenseCategory {
    Ingredients,
    Wages,
    Overhead,
    Other,
}

/// Rolling intra-day counters, reset at close.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    /// Gross sales revenue.
    pub revenue: Decimal,
    /// Expenses by category.
    pub expenses: BTreeMap<ExpenseCategory, Decimal>,
    /// Cost basis of goods sold.
    pub cogs: Decimal,
    /// Units sold.
    pub units_sold: f64,
    /// Individual sale count.
    pub transactions: u32,
    /// Customers who wanted to buy but could not (out of stock or balked).
    pub missed_customers: u32,
}

impl DailyStats {
    /// Total expenses across categories.
    pub fn total_expenses(&self) -> Decimal {
        self.expenses.values().copied().sum()
    }

    /// Revenue minus all expenses.
    pub fn profit(&self) -> Decimal {
        self.revenue - self.total_expenses()
    }
}

/// Lifetime aggregates, never reset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AllTimeStats {
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub total_units_sold: f64,
    pub total_transactions: u32,
    pub total_missed_customers: u32,
    pub days_operated: u32,
    /// Best single-day revenue seen so far, with its day.
    pub best_revenue_day: Option<(u32, Decimal)>,
    /// Best single-day profit seen so far, with its day.
    pub best_profit_day: Option<(u32, Decimal)>,
}

impl AllTimeStats {
    /// Lifetime profit.
    pub fn total_profit(&self) -> Decimal {
        self.total_revenue - self.total_expenses
    }
}

/// Closed-day report handed back by [`FinancialLedger::close_day`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub day: u32,
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub profit: Decimal,
    pub units_sold: f64,
    pub transactions: u32,
    pub missed_customers: u32,
    pub closing_cash: Decimal,
}

/// The money book: one cash balance plus daily and lifetime stats.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialLedger {
    cash: Decimal,
    today: DailyStats,
    all_time: AllTimeStats,
}

impl FinancialLedger {
    /// Open the books with starting capital.
    pub fn new(starting_cash: Decimal) -> Self {
        Self {
            cash: starting_cash.round_dp(2),
            today: DailyStats::default(),
            all_time: AllTimeStats::default(),
        }
    }

    /// Current balance.
    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Today's counters so far.
    pub fn today(&self) -> &DailyStats {
        &self.today
    }

    /// Lifetime counters.
    pub fn all_time(&self) -> &AllTimeStats {
        &self.all_time
    }

    /// Voluntary spend. Fails without mutating anything if the balance
    /// cannot cover it.
    pub fn debit(&mut self, amount: Decimal, category: ExpenseCategory) -> Result<(), SimError> {
        let amount = amount.round_dp(2);
        if amount > self.cash {
            return Err(SimError::InsufficientFunds {
                needed: amount,
                available: self.cash,
            });
        }
        self.cash -= amount;
        self.book_expense(amount, category);
        Ok(())
    }

    /// Obligatory spend (wages, overhead). Always booked; the balance may
    /// go negative.
    pub fn charge_obligation(&mut self, amount: Decimal, category: ExpenseCategory) {
        let amount = amount.round_dp(2);
        self.cash -= amount;
        if self.cash < Decimal::ZERO {
            tracing::warn!(target: "finance", cash = %self.cash, "balance is negative");
        }
        self.book_expense(amount, category);
    }

    /// Book a sale: revenue in, cost basis and unit counters updated.
    pub fn credit_sale(&mut self, revenue: Decimal, cogs: Decimal, units: f64) {
        let revenue = revenue.round_dp(2);
        self.cash += revenue;
        self.today.revenue += revenue;
        self.today.cogs += cogs.round_dp(2);
        self.today.units_sold += units;
        self.today.transactions += 1;
    }

    /// Miscellaneous income outside the sales counters (tips, extras).
    pub fn credit_other(&mut self, amount: Decimal) {
        let amount = amount.round_dp(2);
        self.cash += amount;
        self.today.revenue += amount;
    }

    /// A would-be buyer left empty-handed.
    pub fn record_missed_customer(&mut self) {
        self.today.missed_customers += 1;
    }

    /// Close the day: roll today's counters into the lifetime stats,
    /// update best-day records, reset the daily block, and return the
    /// summary. Closing an untouched day books zeros and still counts as
    /// a day operated.
    pub fn close_day(&mut self, day: u32) -> DaySummary {
        let expenses = self.today.total_expenses();
        let profit = self.today.profit();
        let summary = DaySummary {
            day,
            revenue: self.today.revenue,
            expenses,
            profit,
            units_sold: self.today.units_sold,
            transactions: self.today.transactions,
            missed_customers: self.today.missed_customers,
            closing_cash: self.cash,
        };

        self.all_time.total_revenue += self.today.revenue;
        self.all_time.total_expenses += expenses;
        self.all_time.total_units_sold += self.today.units_sold;
        self.all_time.total_transactions += self.today.transactions;
        self.all_time.total_missed_customers += self.today.missed_customers;
        self.all_time.days_operated += 1;
        if self
            .all_time
            .best_revenue_day
            .map(|(_, best)| summary.revenue > best)
            .unwrap_or(true)
        {
            self.all_time.best_revenue_day = Some((day, summary.revenue));
        }
        if self
            .all_time
            .best_profit_day
            .map(|(_, best)| profit > best)
            .unwrap_or(true)
        {
            self.all_time.best_profit_day = Some((day, profit));
        }

        self.today = DailyStats::default();
        tracing::info!(
            target: "finance",
            day,
            revenue = %summary.revenue,
            profit = %summary.profit,
            cash = %summary.closing_cash,
            "day closed"
        );
        summary
    }

    fn book_expense(&mut self, amount: Decimal, category: ExpenseCategory) {
        *self
            .today
            .expenses
            .entry(category)
            .or_insert(Decimal::ZERO) += amount;
    }
}
