use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use log::debug;
use regex::Regex;

use crate::account_number::AccountNumber;
use crate::funds::{classify_worksheet, FundType};
use crate::grid::SheetGrid;
use crate::models::{AccountType, Department, ImportOptions, MunicipalAccount};
use crate::validation::ValidationResult;

// ---------------------------------------------------------------------------
// Currency parsing
// ---------------------------------------------------------------------------

/// Parse a currency string: strips `$`, commas and quotes; `(500.00)` reads
/// as -500.00. Returns None for anything that is not a number.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

fn cell_currency(grid: &SheetGrid, row: usize, col: usize) -> Option<f64> {
    match grid.cell(row, col) {
        crate::grid::CellValue::Number(n) => Some(*n),
        crate::grid::CellValue::Text(s) => parse_currency(s),
        crate::grid::CellValue::Empty => None,
    }
}

// ---------------------------------------------------------------------------
// Account-type inference
// ---------------------------------------------------------------------------

// Keyword rules over the uppercased description, first match wins. Multi-word
// rules sit above their one-word fallbacks.
const ACCOUNT_TYPE_RULES: &[(&str, AccountType)] = &[
    ("FUND BALANCE", AccountType::FundBalance),
    ("RETAINED EARNINGS", AccountType::RetainedEarnings),
    ("SALES TAX", AccountType::Sales),
    ("MILL LEVY", AccountType::Taxes),
    ("PROPERTY TAX", AccountType::Taxes),
    ("TAX", AccountType::Taxes),
    ("PERMIT", AccountType::PermitsAndAssessments),
    ("ASSESSMENT", AccountType::PermitsAndAssessments),
    ("GRANT", AccountType::Grants),
    ("INTEREST", AccountType::Interest),
    ("TRANSFER", AccountType::Transfers),
    ("INTERFUND", AccountType::Transfers),
    ("SALAR", AccountType::Salaries),
    ("WAGE", AccountType::Salaries),
    ("PAYROLL", AccountType::Salaries),
    ("SUPPL", AccountType::Supplies),
    ("UTILIT", AccountType::Utilities),
    ("ELECTRIC", AccountType::Utilities),
    ("TELEPHONE", AccountType::Utilities),
    ("MAINT", AccountType::Maintenance),
    ("REPAIR", AccountType::Maintenance),
    ("INSURANCE", AccountType::Insurance),
    ("DEPRECIATION", AccountType::Depreciation),
    ("CAPITAL OUTLAY", AccountType::CapitalOutlay),
    ("CAPITAL", AccountType::CapitalOutlay),
    ("EQUIPMENT", AccountType::CapitalOutlay),
    ("PROFESSIONAL", AccountType::ProfessionalServices),
    ("LEGAL", AccountType::ProfessionalServices),
    ("ENGINEER", AccountType::ProfessionalServices),
    ("AUDIT", AccountType::ProfessionalServices),
    ("CONTRACT", AccountType::ContractLabor),
    ("DUES", AccountType::DuesAndSubscriptions),
    ("SUBSCRIPTION", AccountType::DuesAndSubscriptions),
    ("CASH", AccountType::Cash),
    ("CHECKING", AccountType::Cash),
    ("INVESTMENT", AccountType::Investments),
    ("RECEIVABLE", AccountType::Receivables),
    ("INVENTORY", AccountType::Inventory),
    ("FIXED ASSET", AccountType::FixedAssets),
    ("LAND", AccountType::FixedAssets),
    ("BUILDING", AccountType::FixedAssets),
    ("PAYABLE", AccountType::Payables),
    ("BOND", AccountType::Debt),
    ("LOAN", AccountType::Debt),
    ("DEBT", AccountType::Debt),
    ("ACCRUED", AccountType::AccruedLiabilities),
    ("FEE", AccountType::Fees),
    ("CHARGE", AccountType::Fees),
    ("SALES", AccountType::Sales),
    ("SERVICE", AccountType::Services),
];

/// Infer an account type from its description, falling back to the leading
/// digit of the account code: 1 asset-like, 2 liability-like, 3 revenue-like,
/// 4-5 expense-like.
pub fn infer_account_type(description: &str, number: &AccountNumber) -> AccountType {
    let upper = description.to_uppercase();
    for (keyword, account_type) in ACCOUNT_TYPE_RULES {
        if upper.contains(keyword) {
            return *account_type;
        }
    }
    match number.as_str().as_bytes().first() {
        Some(b'1') => AccountType::Cash,
        Some(b'2') => AccountType::Payables,
        Some(b'3') => AccountType::Taxes,
        Some(b'4') | Some(b'5') => AccountType::Services,
        _ => AccountType::Services,
    }
}

// ---------------------------------------------------------------------------
// Format detection — enum dispatch over known institutional dialects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SheetFormat {
    /// Fixed 6-column Town of Wiley budget layout.
    TownOfWiley,
    /// Heuristic 3-column fallback: account, description, amount.
    Generic,
}

const DETECT_ROWS: usize = 20;
const DETECT_COLS: usize = 5;

const WILEY_MARKERS: &[&str] = &["TOWN OF WILEY", "WILEY SANITATION"];

impl SheetFormat {
    pub fn detect(grid: &SheetGrid) -> SheetFormat {
        for row in 1..=DETECT_ROWS.min(grid.row_count()) {
            for col in 1..=DETECT_COLS {
                if let Some(text) = grid.cell(row, col).as_text() {
                    let upper = text.to_uppercase();
                    if WILEY_MARKERS.iter().any(|m| upper.contains(m)) {
                        return SheetFormat::TownOfWiley;
                    }
                }
            }
        }
        SheetFormat::Generic
    }

    pub fn parse(&self, grid: &SheetGrid, default_fund: FundType) -> Vec<MunicipalAccount> {
        match self {
            SheetFormat::TownOfWiley => parse_wiley(grid),
            SheetFormat::Generic => parse_generic(grid, default_fund),
        }
    }
}

// ---------------------------------------------------------------------------
// Town of Wiley dialect
// ---------------------------------------------------------------------------

// Columns: account, description, prior year, seven-month actual, estimate,
// budget. Data starts after the three header rows (title, year, labels).
const WILEY_HEADER_ROWS: usize = 3;
const WILEY_COL_ACCOUNT: usize = 1;
const WILEY_COL_DESCRIPTION: usize = 2;
const WILEY_COL_ESTIMATE: usize = 5;
const WILEY_COL_BUDGET: usize = 6;

fn parse_wiley(grid: &SheetGrid) -> Vec<MunicipalAccount> {
    let fund = classify_worksheet(&grid.name);
    let mut accounts = Vec::new();
    for row in (WILEY_HEADER_ROWS + 1)..=grid.row_count() {
        let account_cell = grid.cell(row, WILEY_COL_ACCOUNT).as_text();
        let description = grid.cell(row, WILEY_COL_DESCRIPTION).as_text();
        if account_cell.is_none() && description.is_none() {
            continue;
        }
        let Some(raw_number) = account_cell else {
            debug!("{}: row {} has description but no account code", grid.name, row);
            continue;
        };
        let Some(number) = AccountNumber::parse(&raw_number) else {
            debug!("{}: row {} account {:?} is not a dotted code", grid.name, row, raw_number);
            continue;
        };
        let name = description.unwrap_or_default();
        let account_type = infer_account_type(&name, &number);
        let mut account = MunicipalAccount::new(number, name, account_type, fund);
        account.balance = cell_currency(grid, row, WILEY_COL_ESTIMATE).unwrap_or(0.0);
        account.budget_amount = cell_currency(grid, row, WILEY_COL_BUDGET).unwrap_or(0.0);
        accounts.push(account);
    }
    accounts
}

// ---------------------------------------------------------------------------
// Generic fallback
// ---------------------------------------------------------------------------

fn parse_generic(grid: &SheetGrid, default_fund: FundType) -> Vec<MunicipalAccount> {
    let mut accounts = Vec::new();
    for row in 1..=grid.row_count() {
        let Some(raw_number) = grid.cell(row, 1).as_text() else {
            continue;
        };
        let Some(number) = AccountNumber::parse(&raw_number) else {
            continue;
        };
        let Some(name) = grid.cell(row, 2).as_text() else {
            debug!("{}: row {} skipped, no description", grid.name, row);
            continue;
        };
        let Some(amount) = cell_currency(grid, row, 3) else {
            debug!("{}: row {} skipped, unparseable amount", grid.name, row);
            continue;
        };
        let account_type = infer_account_type(&name, &number);
        let mut account = MunicipalAccount::new(number, name, account_type, default_fund);
        account.balance = amount;
        account.budget_amount = amount;
        accounts.push(account);
    }
    accounts
}

// ---------------------------------------------------------------------------
// Department and budget-year extraction
// ---------------------------------------------------------------------------

/// Scan every cell for department-code-shaped tokens: 2-4 chars, uppercase
/// alphanumeric, leading letter. One department per distinct code.
pub fn extract_departments(grid: &SheetGrid) -> Vec<Department> {
    let shape = Regex::new(r"^[A-Z][A-Z0-9]{1,3}$").unwrap();
    let fund = classify_worksheet(&grid.name);
    let mut codes = BTreeSet::new();
    for row in 1..=grid.row_count() {
        for col in 1..=grid.col_count() {
            if let crate::grid::CellValue::Text(s) = grid.cell(row, col) {
                for token in s.split_whitespace() {
                    if shape.is_match(token) {
                        codes.insert(token.to_string());
                    }
                }
            }
        }
    }
    codes
        .into_iter()
        .map(|code| Department {
            id: None,
            name: code.clone(),
            code,
            fund,
        })
        .collect()
}

fn year_in_text(text: &str) -> Option<i32> {
    let token = Regex::new(r"\b(\d{4})\b").unwrap();
    for cap in token.captures_iter(text) {
        if let Ok(year) = cap[1].parse::<i32>() {
            if (2000..=2100).contains(&year) {
                return Some(year);
            }
        }
    }
    None
}

/// Budget year: a 4-digit token in [2000, 2100] in the sheet name, then in
/// the first 10x5 cell window, else the current calendar year.
pub fn extract_budget_year(grid: &SheetGrid) -> i32 {
    if let Some(year) = year_in_text(&grid.name) {
        return year;
    }
    for row in 1..=10.min(grid.row_count()) {
        for col in 1..=5 {
            if let Some(text) = grid.cell(row, col).as_text() {
                if let Some(year) = year_in_text(&text) {
                    return year;
                }
            }
        }
    }
    chrono::Local::now().year()
}

// ---------------------------------------------------------------------------
// Sheet-shape sanity — warnings only, parsing stays best-effort
// ---------------------------------------------------------------------------

pub fn check_sheet(grid: &SheetGrid) -> ValidationResult {
    let mut result = ValidationResult::new();
    if grid.row_count() < 2 {
        result.warning(format!(
            "Worksheet '{}' has too few rows ({}) to hold budget data",
            grid.name,
            grid.row_count()
        ));
    }
    if grid.col_count() < 2 {
        result.warning(format!(
            "Worksheet '{}' has too few columns ({}) to hold budget data",
            grid.name,
            grid.col_count()
        ));
    }
    let has_content = (1..=grid.row_count())
        .any(|row| (1..=grid.col_count()).any(|col| !grid.cell(row, col).is_empty()));
    if grid.row_count() > 0 && !has_content {
        result.warning(format!("Worksheet '{}' has no content", grid.name));
    }
    result
}

// ---------------------------------------------------------------------------
// Workbook parse — full candidate batch
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ParsedBatch {
    pub accounts: Vec<MunicipalAccount>,
    pub departments: Vec<Department>,
    pub budget_year: i32,
    /// Sheet-shape warnings; never blocks the import.
    pub structure: ValidationResult,
}

/// Parse every selected sheet of a workbook into one candidate batch, then
/// resolve in-batch parent links by account-number lookup.
pub fn parse_workbook(sheets: &[SheetGrid], options: &ImportOptions) -> ParsedBatch {
    let mut accounts: Vec<MunicipalAccount> = Vec::new();
    let mut departments: BTreeMap<String, Department> = BTreeMap::new();
    let mut budget_year: Option<i32> = None;
    let mut structure = ValidationResult::new();

    for grid in sheets {
        if !options.worksheets.is_empty() && !options.worksheets.iter().any(|w| w == &grid.name) {
            continue;
        }
        structure.merge(check_sheet(grid));
        let format = SheetFormat::detect(grid);
        debug!("sheet '{}' detected as {:?}", grid.name, format);
        accounts.extend(format.parse(grid, options.default_fund));
        for dept in extract_departments(grid) {
            departments.entry(dept.code.clone()).or_insert(dept);
        }
        if budget_year.is_none() {
            budget_year = Some(extract_budget_year(grid));
        }
    }

    let budget_year = options
        .budget_year
        .or(budget_year)
        .unwrap_or_else(|| chrono::Local::now().year());

    // Parent links resolve against the batch itself; a code whose parent is
    // absent stays unlinked and is caught by the hierarchy validators.
    let known: BTreeSet<AccountNumber> = accounts.iter().map(|a| a.number.clone()).collect();
    for account in &mut accounts {
        if let Some(parent) = account.number.parent_code() {
            if known.contains(&parent) {
                account.parent_number = Some(parent);
            }
        }
    }

    ParsedBatch {
        accounts,
        departments: departments.into_values().collect(),
        budget_year,
        structure,
    }
}
