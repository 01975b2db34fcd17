use serde::{Deserialize, Serialize};

use crate::account_number::AccountNumber;
use crate::error::{MuniError, Result};
use crate::funds::{FundClass, FundType};

/// Ledger account categories recognized by the compliance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    // Revenue
    Taxes,
    Fees,
    Sales,
    Grants,
    Interest,
    PermitsAndAssessments,
    // Expense
    Salaries,
    Supplies,
    Services,
    Utilities,
    Maintenance,
    Insurance,
    Depreciation,
    CapitalOutlay,
    ProfessionalServices,
    ContractLabor,
    DuesAndSubscriptions,
    // Assets
    Cash,
    Investments,
    Receivables,
    Inventory,
    FixedAssets,
    // Liabilities
    Payables,
    Debt,
    AccruedLiabilities,
    // Equity
    FundBalance,
    RetainedEarnings,
    // Other
    Transfers,
}

impl AccountType {
    pub fn is_revenue(&self) -> bool {
        matches!(
            self,
            AccountType::Taxes
                | AccountType::Fees
                | AccountType::Sales
                | AccountType::Grants
                | AccountType::Interest
                | AccountType::PermitsAndAssessments
        )
    }

    pub fn is_expense(&self) -> bool {
        matches!(
            self,
            AccountType::Salaries
                | AccountType::Supplies
                | AccountType::Services
                | AccountType::Utilities
                | AccountType::Maintenance
                | AccountType::Insurance
                | AccountType::Depreciation
                | AccountType::CapitalOutlay
                | AccountType::ProfessionalServices
                | AccountType::ContractLabor
                | AccountType::DuesAndSubscriptions
        )
    }

    pub fn is_asset(&self) -> bool {
        matches!(
            self,
            AccountType::Cash
                | AccountType::Investments
                | AccountType::Receivables
                | AccountType::Inventory
                | AccountType::FixedAssets
        )
    }

    pub fn is_liability(&self) -> bool {
        matches!(
            self,
            AccountType::Payables | AccountType::Debt | AccountType::AccruedLiabilities
        )
    }

    pub fn is_equity(&self) -> bool {
        matches!(self, AccountType::FundBalance | AccountType::RetainedEarnings)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Taxes => "taxes",
            AccountType::Fees => "fees",
            AccountType::Sales => "sales",
            AccountType::Grants => "grants",
            AccountType::Interest => "interest",
            AccountType::PermitsAndAssessments => "permits_and_assessments",
            AccountType::Salaries => "salaries",
            AccountType::Supplies => "supplies",
            AccountType::Services => "services",
            AccountType::Utilities => "utilities",
            AccountType::Maintenance => "maintenance",
            AccountType::Insurance => "insurance",
            AccountType::Depreciation => "depreciation",
            AccountType::CapitalOutlay => "capital_outlay",
            AccountType::ProfessionalServices => "professional_services",
            AccountType::ContractLabor => "contract_labor",
            AccountType::DuesAndSubscriptions => "dues_and_subscriptions",
            AccountType::Cash => "cash",
            AccountType::Investments => "investments",
            AccountType::Receivables => "receivables",
            AccountType::Inventory => "inventory",
            AccountType::FixedAssets => "fixed_assets",
            AccountType::Payables => "payables",
            AccountType::Debt => "debt",
            AccountType::AccruedLiabilities => "accrued_liabilities",
            AccountType::FundBalance => "fund_balance",
            AccountType::RetainedEarnings => "retained_earnings",
            AccountType::Transfers => "transfers",
        }
    }

    pub fn parse(s: &str) -> Result<AccountType> {
        match s {
            "taxes" => Ok(AccountType::Taxes),
            "fees" => Ok(AccountType::Fees),
            "sales" => Ok(AccountType::Sales),
            "grants" => Ok(AccountType::Grants),
            "interest" => Ok(AccountType::Interest),
            "permits_and_assessments" => Ok(AccountType::PermitsAndAssessments),
            "salaries" => Ok(AccountType::Salaries),
            "supplies" => Ok(AccountType::Supplies),
            "services" => Ok(AccountType::Services),
            "utilities" => Ok(AccountType::Utilities),
            "maintenance" => Ok(AccountType::Maintenance),
            "insurance" => Ok(AccountType::Insurance),
            "depreciation" => Ok(AccountType::Depreciation),
            "capital_outlay" => Ok(AccountType::CapitalOutlay),
            "professional_services" => Ok(AccountType::ProfessionalServices),
            "contract_labor" => Ok(AccountType::ContractLabor),
            "dues_and_subscriptions" => Ok(AccountType::DuesAndSubscriptions),
            "cash" => Ok(AccountType::Cash),
            "investments" => Ok(AccountType::Investments),
            "receivables" => Ok(AccountType::Receivables),
            "inventory" => Ok(AccountType::Inventory),
            "fixed_assets" => Ok(AccountType::FixedAssets),
            "payables" => Ok(AccountType::Payables),
            "debt" => Ok(AccountType::Debt),
            "accrued_liabilities" => Ok(AccountType::AccruedLiabilities),
            "fund_balance" => Ok(AccountType::FundBalance),
            "retained_earnings" => Ok(AccountType::RetainedEarnings),
            "transfers" => Ok(AccountType::Transfers),
            other => Err(MuniError::Other(format!("unknown account type: {other}"))),
        }
    }
}

/// One ledger line. Built by the parser from a worksheet row; the id fields
/// are filled in once the record has been committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MunicipalAccount {
    pub id: Option<i64>,
    pub number: AccountNumber,
    pub name: String,
    pub account_type: AccountType,
    pub fund: FundType,
    pub fund_class: FundClass,
    pub balance: f64,
    pub budget_amount: f64,
    pub department_code: Option<String>,
    /// Set when the batch contains this account's parent. The stored row
    /// carries the resolved `parent_account_id` instead.
    pub parent_number: Option<AccountNumber>,
    pub is_active: bool,
}

impl MunicipalAccount {
    pub fn new(
        number: AccountNumber,
        name: String,
        account_type: AccountType,
        fund: FundType,
    ) -> Self {
        MunicipalAccount {
            id: None,
            fund_class: fund.class(),
            number,
            name,
            account_type,
            fund,
            balance: 0.0,
            budget_amount: 0.0,
            department_code: None,
            parent_number: None,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Option<i64>,
    pub code: String,
    pub name: String,
    pub fund: FundType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodStatus {
    Draft,
    Active,
    Closed,
}

impl PeriodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodStatus::Draft => "draft",
            PeriodStatus::Active => "active",
            PeriodStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Result<PeriodStatus> {
        match s {
            "draft" => Ok(PeriodStatus::Draft),
            "active" => Ok(PeriodStatus::Active),
            "closed" => Ok(PeriodStatus::Closed),
            other => Err(MuniError::Other(format!("unknown period status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetPeriod {
    pub id: Option<i64>,
    pub year: i32,
    pub name: String,
    pub status: PeriodStatus,
    pub created_date: String,
}

/// Caller-facing import configuration.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Parse and validate only; no repository writes of any kind.
    pub preview_only: bool,
    /// Reuse an existing period instead of resolving by (year, name).
    pub budget_period_id: Option<i64>,
    /// Fund assigned when the sheet name matches no classification rule.
    pub default_fund: FundType,
    /// Proceed despite validation errors, up to `max_validation_errors`.
    pub skip_validation_errors: bool,
    pub max_validation_errors: usize,
    pub validate_gasb_compliance: bool,
    /// Always create a fresh period rather than reusing a (year, name) match.
    pub create_new_budget_period: bool,
    /// Update mutable fields on accounts that already exist in the period.
    pub overwrite_existing_accounts: bool,
    /// Overrides the year extracted from the worksheet.
    pub budget_year: Option<i32>,
    /// Restrict processing to these sheet names; empty means all sheets.
    pub worksheets: Vec<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            preview_only: false,
            budget_period_id: None,
            default_fund: FundType::General,
            skip_validation_errors: false,
            max_validation_errors: 0,
            validate_gasb_compliance: true,
            create_new_budget_period: false,
            overwrite_existing_accounts: true,
            budget_year: None,
            worksheets: Vec::new(),
        }
    }
}

/// Outcome of one import run, success or not.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub success: bool,
    pub accounts: Vec<MunicipalAccount>,
    pub departments: Vec<Department>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub rows_parsed: usize,
    pub accounts_imported: usize,
    pub departments_imported: usize,
    pub elapsed_ms: u128,
    pub budget_period_id: Option<i64>,
}

impl ImportResult {
    pub fn rejected(errors: Vec<String>, warnings: Vec<String>) -> Self {
        ImportResult {
            success: false,
            accounts: Vec::new(),
            departments: Vec::new(),
            errors,
            warnings,
            rows_parsed: 0,
            accounts_imported: 0,
            departments_imported: 0,
            elapsed_ms: 0,
            budget_period_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_categories() {
        assert!(AccountType::Taxes.is_revenue());
        assert!(AccountType::PermitsAndAssessments.is_revenue());
        assert!(AccountType::CapitalOutlay.is_expense());
        assert!(AccountType::ContractLabor.is_expense());
        assert!(AccountType::Cash.is_asset());
        assert!(AccountType::Debt.is_liability());
        assert!(AccountType::FundBalance.is_equity());
        assert!(AccountType::RetainedEarnings.is_equity());
        assert!(!AccountType::Transfers.is_revenue());
        assert!(!AccountType::Transfers.is_expense());
    }

    #[test]
    fn test_account_type_string_round_trip() {
        for t in [
            AccountType::Taxes,
            AccountType::CapitalOutlay,
            AccountType::DuesAndSubscriptions,
            AccountType::AccruedLiabilities,
            AccountType::Transfers,
        ] {
            assert_eq!(AccountType::parse(t.as_str()).unwrap(), t);
        }
        assert!(AccountType::parse("widgets").is_err());
    }

    #[test]
    fn test_new_account_derives_fund_class() {
        let n = crate::account_number::AccountNumber::parse("405").unwrap();
        let acct = MunicipalAccount::new(
            n,
            "Road Maintenance".into(),
            AccountType::Maintenance,
            FundType::Utility,
        );
        assert_eq!(acct.fund_class, FundClass::Proprietary);
        assert!(acct.is_active);
        assert!(acct.id.is_none());
    }
}
