use std::collections::BTreeMap;

use crate::funds::{FundClass, FundType};
use crate::models::{AccountType, MunicipalAccount};
use crate::validation::ValidationResult;

const UNCOLLECTIBLE_MARKERS: &[&str] = &["UNCOLLECTIBLE", "ALLOWANCE FOR DOUBTFUL", "BAD DEBT"];
const MILL_LEVY_MARKERS: &[&str] = &["MILL LEVY", "PROPERTY TAX"];

/// Account-type / fund compatibility rules: which account categories may
/// legally appear in which fund types and classes.
pub fn validate(accounts: &[MunicipalAccount]) -> ValidationResult {
    let mut result = ValidationResult::new();
    for account in accounts {
        check_type_placement(account, &mut result);
    }
    check_uncollectible_provisions(accounts, &mut result);
    result
}

fn check_type_placement(account: &MunicipalAccount, result: &mut ValidationResult) {
    match account.account_type {
        AccountType::CapitalOutlay => {
            if !matches!(account.fund, FundType::CapitalProjects | FundType::Enterprise) {
                result.error(format!(
                    "Account {} ({}): CapitalOutlay accounts belong in capital projects or enterprise funds, not {}",
                    account.number,
                    account.name,
                    account.fund.as_str()
                ));
            }
        }
        AccountType::Debt => {
            if !matches!(account.fund, FundType::DebtService | FundType::Enterprise) {
                result.error(format!(
                    "Account {} ({}): Debt accounts belong in debt service or enterprise funds, not {}",
                    account.number,
                    account.name,
                    account.fund.as_str()
                ));
            }
        }
        AccountType::RetainedEarnings => {
            if account.fund_class != FundClass::Proprietary {
                result.error(format!(
                    "Account {} ({}): retained earnings equity is only valid in proprietary funds",
                    account.number, account.name
                ));
            }
        }
        AccountType::FundBalance => {
            if account.fund_class != FundClass::Governmental {
                result.error(format!(
                    "Account {} ({}): fund balance equity is only valid in governmental funds",
                    account.number, account.name
                ));
            }
        }
        AccountType::Taxes if is_mill_levy(account) => {
            if !matches!(account.fund, FundType::General | FundType::SpecialRevenue) {
                result.error(format!(
                    "Account {} ({}): mill levy / property tax revenue belongs in the general or a special revenue fund",
                    account.number, account.name
                ));
            }
        }
        _ => {}
    }
}

fn is_mill_levy(account: &MunicipalAccount) -> bool {
    let upper = account.name.to_uppercase();
    MILL_LEVY_MARKERS.iter().any(|m| upper.contains(m))
}

fn has_uncollectible_name(account: &MunicipalAccount) -> bool {
    let upper = account.name.to_uppercase();
    UNCOLLECTIBLE_MARKERS.iter().any(|m| upper.contains(m))
}

// Every fund carrying mill-levy revenue must also carry a provision for the
// portion that will not be collected.
fn check_uncollectible_provisions(accounts: &[MunicipalAccount], result: &mut ValidationResult) {
    let mut funds_with_levy: BTreeMap<&str, &MunicipalAccount> = BTreeMap::new();
    for account in accounts {
        if account.account_type == AccountType::Taxes && is_mill_levy(account) {
            funds_with_levy.entry(account.fund.as_str()).or_insert(account);
        }
    }
    for (fund, example) in funds_with_levy {
        let covered = accounts
            .iter()
            .any(|a| a.fund.as_str() == fund && has_uncollectible_name(a));
        if !covered {
            result.error(format!(
                "Fund {} carries property tax revenue (e.g. account {}) but no uncollectible provision account",
                fund, example.number
            ));
        }
    }
}
