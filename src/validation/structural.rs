use std::collections::{BTreeMap, BTreeSet};

use crate::account_number::AccountNumber;
use crate::funds::FundClass;
use crate::models::{AccountType, MunicipalAccount};
use crate::validation::ValidationResult;

/// Amounts above this are treated as likely data-entry errors (warning).
const IMPLAUSIBLE_AMOUNT: f64 = 1e9;

/// Structural and business validation: required fields, numeric sanity,
/// duplicate detection and parent/child consistency.
pub fn validate(accounts: &[MunicipalAccount]) -> ValidationResult {
    let mut result = ValidationResult::new();
    let by_number: BTreeMap<&AccountNumber, &MunicipalAccount> =
        accounts.iter().map(|a| (&a.number, a)).collect();

    for account in accounts {
        check_fields(account, &mut result);
        check_parent_link(account, &by_number, &mut result);
    }
    check_duplicates(accounts, &mut result);
    check_departments(accounts, &mut result);
    result
}

fn check_fields(account: &MunicipalAccount, result: &mut ValidationResult) {
    // The number itself was syntax-checked at parse time; blank names are not.
    if account.name.trim().is_empty() {
        result.error(format!("Account {} has no name", account.number));
    }
    if account.fund_class == FundClass::Governmental
        && account.account_type == AccountType::FundBalance
        && account.balance < 0.0
    {
        result.error(format!(
            "Account {} ({}): governmental funds may not carry a negative fund balance ({:.2})",
            account.number, account.name, account.balance
        ));
    }
    if account.budget_amount.abs() > IMPLAUSIBLE_AMOUNT {
        result.warning(format!(
            "Account {} budget amount {:.2} looks like a data-entry error",
            account.number, account.budget_amount
        ));
    }
    if account.balance.abs() > IMPLAUSIBLE_AMOUNT {
        result.warning(format!(
            "Account {} balance {:.2} looks like a data-entry error",
            account.number, account.balance
        ));
    }
}

fn check_parent_link(
    account: &MunicipalAccount,
    by_number: &BTreeMap<&AccountNumber, &MunicipalAccount>,
    result: &mut ValidationResult,
) {
    let Some(parent_number) = &account.parent_number else {
        return;
    };
    let Some(parent) = by_number.get(parent_number) else {
        result.error(format!(
            "Account {} references parent {} which is not in the batch",
            account.number, parent_number
        ));
        return;
    };
    if !account
        .number
        .as_str()
        .starts_with(&format!("{}.", parent.number))
    {
        result.error(format!(
            "Account {} is linked to parent {} but does not extend its code",
            account.number, parent.number
        ));
    }
    if account.number.level() != parent.number.level() + 1 {
        result.error(format!(
            "Account {} (level {}) must sit exactly one level below parent {} (level {})",
            account.number,
            account.number.level(),
            parent.number,
            parent.number.level()
        ));
    }
}

fn check_duplicates(accounts: &[MunicipalAccount], result: &mut ValidationResult) {
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    for account in accounts {
        if !seen.insert(&account.number) && reported.insert(&account.number) {
            result.error(format!("Duplicate account number {} in batch", account.number));
        }
    }
}

fn check_departments(accounts: &[MunicipalAccount], result: &mut ValidationResult) {
    for account in accounts {
        if account.department_code.is_none()
            && (account.balance != 0.0 || account.budget_amount != 0.0)
        {
            result.warning(format!(
                "Account {} carries amounts but has no department assignment",
                account.number
            ));
        }
    }
}
