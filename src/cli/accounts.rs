use comfy_table::Table;

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::{money, variance_percent};
use crate::funds::FundType;
use crate::repository::SqliteRepository;
use crate::settings::get_data_dir;

pub fn list(period: Option<i64>, fund: Option<String>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("muni.db"))?;
    let repo = SqliteRepository::new(conn);

    let period_id = match period {
        Some(id) => id,
        None => match repo.list_budget_periods()?.last().and_then(|p| p.id) {
            Some(id) => id,
            None => {
                println!("No budget periods yet. Run an import first.");
                return Ok(());
            }
        },
    };
    let fund = fund.map(|f| FundType::parse(&f)).transpose()?;

    let accounts = repo.list_accounts(period_id, fund)?;
    if accounts.is_empty() {
        println!("No accounts in period {period_id}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Account", "Name", "Type", "Fund", "Balance", "Budget", "Var"]);
    for account in &accounts {
        // Indent by hierarchy depth so rollup structure is visible.
        let indent = "  ".repeat(account.number.level() - 1);
        table.add_row(vec![
            format!("{indent}{}", account.number),
            account.name.clone(),
            account.account_type.as_str().to_string(),
            account.fund.as_str().to_string(),
            money(account.balance),
            money(account.budget_amount),
            variance_percent(account.balance, account.budget_amount).unwrap_or_default(),
        ]);
    }
    println!("{table}");
    println!("{} accounts in period {period_id}", accounts.len());
    Ok(())
}
