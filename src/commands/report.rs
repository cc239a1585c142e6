use crate::api::{ExpenseFilter, Mode};
use crate::commands::{failure_reason, manager, Out};
use crate::{Config, Outcome, Result};
use anyhow::bail;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Total spending and the per-category breakdown for a set of expenses. Categories with no
/// expenses do not appear.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SpendingReport {
    total: Decimal,
    by_category: BTreeMap<String, Decimal>,
}

impl SpendingReport {
    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn by_category(&self) -> &BTreeMap<String, Decimal> {
        &self.by_category
    }
}

/// Handles the `expenses report` command.
pub async fn report(config: &Config, mode: Mode, filter: ExpenseFilter) -> Result<Out<SpendingReport>> {
    let manager = manager(config, mode).await?;
    if manager.load_expenses(&filter).await != Outcome::Completed {
        bail!(failure_reason(&manager, "Failed to load expenses"));
    }

    let report = SpendingReport {
        total: manager.total_spending(),
        // BTreeMap for a stable category order in the output.
        by_category: manager.spending_by_category().into_iter().collect(),
    };
    Ok(Out::new(render(&report), report))
}

fn render(report: &SpendingReport) -> String {
    let mut lines = vec![format!("Total spending: {}", report.total)];
    for (category, total) in &report.by_category {
        lines.push(format!("  {category}: {total}"));
    }
    lines.join("\n")
}
