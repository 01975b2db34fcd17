use std::path::PathBuf;

use colored::Colorize;
use comfy_table::Table;

use crate::db::get_connection;
use crate::error::{MuniError, Result};
use crate::fmt::money;
use crate::funds::FundType;
use crate::grid::load_workbook;
use crate::models::{ImportOptions, ImportResult};
use crate::orchestrator::{run_import, ImportOrchestrator};
use crate::parser::parse_workbook;
use crate::repository::SqliteRepository;
use crate::settings::{get_data_dir, load_settings};

pub struct ImportArgs {
    pub file: String,
    pub sheets: Vec<String>,
    pub preview: bool,
    pub year: Option<i32>,
    pub default_fund: Option<String>,
    pub skip_errors: Option<usize>,
    pub no_gasb: bool,
    pub new_period: bool,
    pub period_id: Option<i64>,
    pub keep_existing: bool,
}

pub fn run(args: ImportArgs) -> Result<()> {
    let settings = load_settings();
    let default_fund = match &args.default_fund {
        Some(name) => FundType::parse(name)?,
        None => settings.default_fund_type(),
    };
    let options = ImportOptions {
        preview_only: args.preview,
        budget_period_id: args.period_id,
        default_fund,
        skip_validation_errors: args.skip_errors.is_some(),
        max_validation_errors: args.skip_errors.unwrap_or(0),
        validate_gasb_compliance: !args.no_gasb,
        create_new_budget_period: args.new_period,
        overwrite_existing_accounts: !args.keep_existing,
        budget_year: args.year,
        worksheets: args.sheets,
    };

    let file_path = PathBuf::from(&args.file);
    let sheets = load_workbook(&file_path)?;
    let batch = parse_workbook(&sheets, &options);

    let orchestrator = ImportOrchestrator::new();
    if !orchestrator.try_begin() {
        return Err(MuniError::ImportBusy);
    }
    let conn = get_connection(&get_data_dir().join("muni.db"))?;
    let mut repo = SqliteRepository::new(conn);
    let result = run_import(&mut repo, &batch, &options);
    orchestrator.finish();

    if !options.preview_only {
        let filename = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&args.file);
        repo.record_import(filename, &result)?;
    }

    print_result(&result, options.preview_only);
    Ok(())
}

fn print_result(result: &ImportResult, preview: bool) {
    for warning in &result.warnings {
        println!("{} {warning}", "warning:".yellow());
    }
    for error in &result.errors {
        println!("{} {error}", "error:".red());
    }

    if preview {
        let mut table = Table::new();
        table.set_header(vec!["Account", "Name", "Type", "Fund", "Balance", "Budget"]);
        for account in &result.accounts {
            table.add_row(vec![
                account.number.to_string(),
                account.name.clone(),
                account.account_type.as_str().to_string(),
                account.fund.as_str().to_string(),
                money(account.balance),
                money(account.budget_amount),
            ]);
        }
        println!("{table}");
        let verdict = if result.errors.is_empty() {
            "would import cleanly".green()
        } else {
            "would be rejected".red()
        };
        println!(
            "Preview: {} rows parsed, {} departments found, {verdict} ({}ms)",
            result.rows_parsed,
            result.departments.len(),
            result.elapsed_ms
        );
        return;
    }

    if result.success {
        println!(
            "{} {} accounts and {} departments imported into period {} ({} rows parsed, {}ms)",
            "ok:".green(),
            result.accounts_imported,
            result.departments_imported,
            result
                .budget_period_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "?".to_string()),
            result.rows_parsed,
            result.elapsed_ms
        );
    } else {
        println!(
            "{} import rejected with {} error(s); nothing was written",
            "failed:".red(),
            result.errors.len()
        );
    }
}
