use crate::api::{ExpenseFilter, Mode};
use crate::commands::{failure_reason, manager, Out};
use crate::model::Expense;
use crate::{Config, Outcome, Result};
use anyhow::bail;
use rust_decimal::Decimal;

const NO_SESSION: &str = "No active session, run 'expenses login' first";

/// Handles the `expenses list` command.
pub async fn list(config: &Config, mode: Mode, filter: ExpenseFilter) -> Result<Out<Vec<Expense>>> {
    let manager = manager(config, mode).await?;
    match manager.load_expenses(&filter).await {
        Outcome::Completed => {
            let expenses = manager.expenses();
            Ok(Out::new(render(&expenses), expenses))
        }
        _ => bail!(failure_reason(&manager, "Failed to load expenses")),
    }
}

/// Handles the `expenses add` command.
pub async fn add(
    config: &Config,
    mode: Mode,
    amount: Decimal,
    description: &str,
    date: &str,
    category: &str,
) -> Result<Out<Vec<Expense>>> {
    let manager = manager(config, mode).await?;
    match manager.add_expense(amount, description, date, category).await {
        Outcome::Completed => Ok(Out::new(
            format!("Recorded {amount} for '{description}' on {date}"),
            manager.expenses(),
        )),
        Outcome::Skipped => bail!(NO_SESSION),
        _ => bail!(failure_reason(&manager, "Failed to add expense")),
    }
}

/// Handles the `expenses update` command.
pub async fn update(
    config: &Config,
    mode: Mode,
    id: &str,
    amount: Decimal,
    description: &str,
    date: &str,
    category: &str,
) -> Result<Out<Vec<Expense>>> {
    let manager = manager(config, mode).await?;
    match manager
        .update_expense(id, amount, description, date, category)
        .await
    {
        Outcome::Completed => Ok(Out::new(
            format!("Updated expense '{id}'"),
            manager.expenses(),
        )),
        Outcome::Skipped => bail!(NO_SESSION),
        _ => bail!(failure_reason(&manager, "Failed to update expense")),
    }
}

/// Handles the `expenses delete` command.
pub async fn delete(config: &Config, mode: Mode, id: &str) -> Result<Out<Vec<Expense>>> {
    let manager = manager(config, mode).await?;
    match manager.delete_expense(id).await {
        Outcome::Completed => Ok(Out::new(
            format!("Deleted expense '{id}'"),
            manager.expenses(),
        )),
        _ => bail!(failure_reason(&manager, "Failed to delete expense")),
    }
}

/// One line per expense: id, date, amount, category, description.
fn render(expenses: &[Expense]) -> String {
    if expenses.is_empty() {
        return "No expenses found".to_string();
    }
    let mut lines = vec![format!("{} expense(s):", expenses.len())];
    for expense in expenses {
        lines.push(format!(
            "{:<8} {}  {:>10}  {:<14} {}",
            expense.id().unwrap_or("-"),
            expense.date(),
            expense.amount().to_string(),
            expense.category(),
            expense.description()
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestGateway;
    use crate::commands::login;
    use crate::test::TestEnv;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_list_seeded_expenses() {
        let env = TestEnv::new().await;
        let out = list(env.config(), Mode::Test, ExpenseFilter::default())
            .await
            .unwrap();
        let expenses = out.structure().unwrap();
        assert_eq!(expenses.len(), 6);
        assert!(out.message().starts_with("6 expense(s):"));
    }

    #[tokio::test]
    async fn test_list_with_category_filter() {
        let env = TestEnv::new().await;
        let out = list(
            env.config(),
            Mode::Test,
            ExpenseFilter::default().with_category("Food"),
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_add_requires_session() {
        let env = TestEnv::new().await;
        let err = add(
            env.config(),
            Mode::Test,
            dec("10"),
            "lunch",
            "2024-01-01",
            "Food",
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("No active session"));
    }

    #[tokio::test]
    async fn test_add_after_login() {
        let env = TestEnv::new().await;
        login(env.config(), Mode::Test, TestGateway::DEMO_EMAIL, "pw")
            .await
            .unwrap();

        let out = add(
            env.config(),
            Mode::Test,
            dec("10.25"),
            "lunch",
            "2024-03-11",
            "Food",
        )
        .await
        .unwrap();
        assert!(out.message().contains("10.25"));
        // The returned collection includes the seed data plus the new expense.
        assert_eq!(out.structure().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_fails() {
        let env = TestEnv::new().await;
        let err = delete(env.config(), Mode::Test, "missing")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[]), "No expenses found");
    }
}
