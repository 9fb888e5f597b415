//! Monthly net breakdown of a registry.
//!
//! Amounts are signed with the convention "expense is positive, income is
//! negative": the registry stores expenses as negative values, so every
//! extracted amount is negated before it is accumulated.
use super::registry::{RegistryEntry, RegistryPayload, UnallocatedPolicy};
use anyhow::{Result, anyhow, bail};
use chrono::{Datelike, Local, NaiveDateTime};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

/// Largest gap tolerated between an entry amount and the sum of its allocations.
pub const ALLOCATION_TOLERANCE: f64 = 1e-6;

/// A calendar month in `YYYY-MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetMonth {
    year: i32,
    month: u32,
}

impl TargetMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("Invalid month: {month}");
        }
        Ok(Self { year, month })
    }

    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn contains(&self, date: &NaiveDateTime) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl Display for TargetMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for TargetMonth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || anyhow!("Invalid month '{}', expected YYYY-MM", s);
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || month.len() != 2 || !all_digits(year) || !all_digits(month) {
            return Err(invalid());
        }
        Self::new(
            year.parse().map_err(|_| invalid())?,
            month.parse().map_err(|_| invalid())?,
        )
    }
}

/// Monthly totals, derived from the category nets only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub expenses: f64,
    pub incomes: f64,
    pub net: f64,
}

impl Totals {
    pub fn from_nets(nets: impl IntoIterator<Item = f64>) -> Self {
        nets.into_iter().fold(Totals::default(), |mut totals, net| {
            if net > 0.0 {
                totals.expenses += net;
            } else if net < 0.0 {
                totals.incomes -= net;
            }
            totals.net += net;
            totals
        })
    }
}

/// An entry whose allocations do not add up to its amount.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationMismatch {
    pub entry_id: Option<String>,
    pub allocated: f64,
    pub amount: f64,
}

impl Display for AllocationMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "allocations ({}) != entry amount ({}) for ID={}",
            self.allocated,
            self.amount,
            self.entry_id.as_deref().unwrap_or("?")
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct MonthlyBreakdown {
    pub per_category: HashMap<String, f64>,
    pub per_payer: HashMap<String, f64>,
    pub per_beneficiary: HashMap<String, f64>,
    pub totals: Totals,
    pub diagnostics: Vec<AllocationMismatch>,
}

impl MonthlyBreakdown {
    pub fn is_empty(&self) -> bool {
        self.per_category.is_empty()
    }
}

/// Sorts a net mapping by value, largest first. Ties are ordered by label.
pub fn sorted_desc(nets: &HashMap<String, f64>) -> Vec<(&str, f64)> {
    let mut sorted: Vec<(&str, f64)> = nets.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted
}

/// Computes the net breakdown of `month`.
///
/// Entries without allocations go wholly to their payer.
pub fn monthly_breakdown(payload: &RegistryPayload, month: TargetMonth) -> MonthlyBreakdown {
    let mut breakdown = MonthlyBreakdown::default();

    let in_month = payload
        .entries()
        .filter(RegistryEntry::is_active)
        .filter(|entry| entry.date().is_some_and(|date| month.contains(&date)));

    for entry in in_month {
        let amount = entry.amount();
        if amount == 0.0 {
            continue;
        }
        let signed = -amount;

        add(&mut breakdown.per_category, entry.category(), signed);
        let payer = entry.payer().display_name();
        add(&mut breakdown.per_payer, payer, signed);

        let mut allocations = entry.allocations().peekable();
        if allocations.peek().is_none() {
            if let Some(beneficiary) = UnallocatedPolicy::AttributeToPayer.fallback(&entry) {
                add(
                    &mut breakdown.per_beneficiary,
                    beneficiary.display_name(),
                    signed,
                );
            }
            continue;
        }

        let mut allocated = 0.0;
        for allocation in allocations {
            let share = allocation.amount();
            allocated += share;
            if share == 0.0 {
                continue;
            }
            add(
                &mut breakdown.per_beneficiary,
                allocation.membership().display_name(),
                -share,
            );
        }

        if (allocated - amount).abs() > ALLOCATION_TOLERANCE {
            let mismatch = AllocationMismatch {
                entry_id: entry.id(),
                allocated,
                amount,
            };
            debug!(%mismatch, "Allocations do not match entry amount");
            breakdown.diagnostics.push(mismatch);
        }
    }

    breakdown.totals = Totals::from_nets(breakdown.per_category.values().copied());
    debug!(
        %month,
        categories = breakdown.per_category.len(),
        net = breakdown.totals.net,
        "Computed monthly breakdown"
    );
    breakdown
}

fn add(nets: &mut HashMap<String, f64>, key: &str, value: f64) {
    *nets.entry(key.to_string()).or_insert(0.0) += value;
}
