use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info, warn};

use crate::error::{MuniError, Result};
use crate::models::{BudgetPeriod, ImportOptions, ImportResult, PeriodStatus};
use crate::parser::ParsedBatch;
use crate::repository::BudgetRepository;
use crate::validation::validate_batch;

/// Import lifecycle. Validation happens entirely before any storage
/// interaction; once the commit phase starts it runs to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Validating,
    Rejected,
    Importing,
    Committed,
    RolledBack,
}

/// Single-flight guard for callers. The engine itself takes no lock; the UI
/// layer checks this flag to avoid double-submission.
#[derive(Default)]
pub struct ImportOrchestrator {
    busy: AtomicBool,
}

impl ImportOrchestrator {
    pub fn new() -> Self {
        ImportOrchestrator {
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Claim the guard; returns false when an import is already running.
    pub fn try_begin(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn finish(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Validate the candidate batch, then commit it atomically: reject on
/// validation errors (unless the caller tolerates up to a limit), upsert
/// departments before accounts inside one transaction, roll everything back
/// on any storage failure.
pub fn run_import(
    repo: &mut dyn BudgetRepository,
    batch: &ParsedBatch,
    options: &ImportOptions,
) -> ImportResult {
    let started = Instant::now();
    debug!("import state: {:?}", ImportState::Validating);

    let mut validation = batch.structure.clone();
    validation.merge(validate_batch(&batch.accounts, options));

    let acceptable = validation.is_valid()
        || (options.skip_validation_errors
            && validation.errors.len() <= options.max_validation_errors);
    if !acceptable {
        debug!("import state: {:?}", ImportState::Rejected);
        info!(
            "import rejected: {} errors, {} warnings",
            validation.errors.len(),
            validation.warnings.len()
        );
        let mut result = ImportResult::rejected(validation.errors, validation.warnings);
        result.accounts = batch.accounts.clone();
        result.departments = batch.departments.clone();
        result.rows_parsed = batch.accounts.len();
        result.elapsed_ms = started.elapsed().as_millis();
        return result;
    }

    if options.preview_only {
        // Review-before-commit: full parse + validation outcome, zero
        // repository interaction.
        return ImportResult {
            success: true,
            accounts: batch.accounts.clone(),
            departments: batch.departments.clone(),
            errors: validation.errors,
            warnings: validation.warnings,
            rows_parsed: batch.accounts.len(),
            accounts_imported: 0,
            departments_imported: 0,
            elapsed_ms: started.elapsed().as_millis(),
            budget_period_id: None,
        };
    }

    let mut state = ImportState::Importing;
    let mut errors = validation.errors;
    let warnings = validation.warnings;

    let outcome = match repo.begin_transaction() {
        Ok(()) => {
            let staged = write_batch(repo, batch, options);
            match staged {
                Ok(counts) => match repo.save_changes().and_then(|_| repo.commit()) {
                    Ok(()) => {
                        state = ImportState::Committed;
                        Some(counts)
                    }
                    Err(e) => {
                        state = ImportState::RolledBack;
                        errors.push(format!("Import failed during commit: {e}"));
                        attempt_rollback(repo, &mut errors);
                        None
                    }
                },
                Err(e) => {
                    state = ImportState::RolledBack;
                    errors.push(format!("Import failed: {e}"));
                    attempt_rollback(repo, &mut errors);
                    None
                }
            }
        }
        Err(e) => {
            errors.push(format!("Could not open transaction: {e}"));
            None
        }
    };

    let success = state == ImportState::Committed;
    let (period_id, accounts_imported, departments_imported) = match outcome {
        Some((period_id, accounts, departments)) => (Some(period_id), accounts, departments),
        None => (None, 0, 0),
    };
    if success {
        info!(
            "imported {} accounts, {} departments into period {:?}",
            accounts_imported, departments_imported, period_id
        );
    }

    ImportResult {
        success,
        accounts: batch.accounts.clone(),
        departments: batch.departments.clone(),
        errors,
        warnings,
        rows_parsed: batch.accounts.len(),
        accounts_imported,
        departments_imported,
        elapsed_ms: started.elapsed().as_millis(),
        budget_period_id: period_id,
    }
}

// A rollback failure compounds the report but must not mask the original
// cause, which is already in `errors`.
fn attempt_rollback(repo: &mut dyn BudgetRepository, errors: &mut Vec<String>) {
    if let Err(e) = repo.rollback() {
        warn!("rollback failed: {e}");
        errors.push(format!("Rollback also failed: {e}"));
    }
}

/// All writes for one batch, inside the already-open transaction:
/// resolve/create the budget period, upsert departments, then accounts with
/// parents ahead of their children.
fn write_batch(
    repo: &mut dyn BudgetRepository,
    batch: &ParsedBatch,
    options: &ImportOptions,
) -> Result<(i64, usize, usize)> {
    let period_id = resolve_period(repo, batch, options)?;

    let mut departments_imported = 0usize;
    for dept in &batch.departments {
        match repo.find_department(&dept.code)? {
            Some(existing) => {
                let mut updated = existing;
                updated.name = dept.name.clone();
                updated.fund = dept.fund;
                repo.update_department(&updated)?;
            }
            None => {
                repo.add_department(dept)?;
            }
        }
        departments_imported += 1;
    }

    let mut ordered: Vec<&crate::models::MunicipalAccount> = batch.accounts.iter().collect();
    ordered.sort_by_key(|a| (a.number.level(), a.number.clone()));

    let mut accounts_imported = 0usize;
    for account in ordered {
        match repo.find_account(&account.number, period_id)? {
            Some(_) if !options.overwrite_existing_accounts => {
                debug!("account {} exists, overwrite disabled", account.number);
            }
            Some(_) => {
                repo.update_account(account, period_id)?;
                accounts_imported += 1;
            }
            None => {
                repo.add_account(account, period_id)?;
                accounts_imported += 1;
            }
        }
    }

    Ok((period_id, accounts_imported, departments_imported))
}

fn resolve_period(
    repo: &mut dyn BudgetRepository,
    batch: &ParsedBatch,
    options: &ImportOptions,
) -> Result<i64> {
    if let Some(id) = options.budget_period_id {
        return match repo.get_budget_period(id)? {
            Some(period) => Ok(period.id.unwrap_or(id)),
            None => Err(MuniError::PeriodNotFound(id)),
        };
    }
    let year = options.budget_year.unwrap_or(batch.budget_year);
    let name = format!("FY{year}");
    if !options.create_new_budget_period {
        if let Some(existing) = repo.find_budget_period(year, &name)? {
            if let Some(id) = existing.id {
                return Ok(id);
            }
        }
    }
    repo.add_budget_period(&BudgetPeriod {
        id: None,
        year,
        name,
        status: PeriodStatus::Draft,
        created_date: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account_number::AccountNumber;
    use crate::funds::FundType;
    use crate::models::{AccountType, Department, MunicipalAccount};
    use crate::parser::ParsedBatch;
    use crate::repository::SqliteRepository;
    use crate::validation::ValidationResult;

    // -----------------------------------------------------------------------
    // Mock repository with staged/committed write sets and failure injection
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct MockRepo {
        committed_accounts: Vec<MunicipalAccount>,
        committed_departments: Vec<Department>,
        staged_accounts: Vec<MunicipalAccount>,
        staged_departments: Vec<Department>,
        periods: Vec<BudgetPeriod>,
        write_calls: usize,
        total_calls: usize,
        fail_at_write: Option<usize>,
        fail_rollback: bool,
        begin_count: usize,
        commit_count: usize,
        rollback_count: usize,
    }

    impl MockRepo {
        fn maybe_fail(&mut self) -> Result<()> {
            self.write_calls += 1;
            if self.fail_at_write == Some(self.write_calls) {
                return Err(MuniError::Other("injected storage failure".into()));
            }
            Ok(())
        }
    }

    impl BudgetRepository for MockRepo {
        fn find_account(
            &mut self,
            number: &AccountNumber,
            _period_id: i64,
        ) -> Result<Option<MunicipalAccount>> {
            self.total_calls += 1;
            Ok(self
                .committed_accounts
                .iter()
                .chain(self.staged_accounts.iter())
                .find(|a| &a.number == number)
                .cloned())
        }

        fn find_department(&mut self, code: &str) -> Result<Option<Department>> {
            self.total_calls += 1;
            Ok(self
                .committed_departments
                .iter()
                .chain(self.staged_departments.iter())
                .find(|d| d.code == code)
                .cloned())
        }

        fn find_budget_period(&mut self, year: i32, name: &str) -> Result<Option<BudgetPeriod>> {
            self.total_calls += 1;
            Ok(self
                .periods
                .iter()
                .find(|p| p.year == year && p.name == name)
                .cloned())
        }

        fn get_budget_period(&mut self, id: i64) -> Result<Option<BudgetPeriod>> {
            self.total_calls += 1;
            Ok(self.periods.iter().find(|p| p.id == Some(id)).cloned())
        }

        fn add_budget_period(&mut self, period: &BudgetPeriod) -> Result<i64> {
            self.total_calls += 1;
            self.maybe_fail()?;
            let id = self.periods.len() as i64 + 1;
            let mut period = period.clone();
            period.id = Some(id);
            self.periods.push(period);
            Ok(id)
        }

        fn add_department(&mut self, department: &Department) -> Result<i64> {
            self.total_calls += 1;
            self.maybe_fail()?;
            self.staged_departments.push(department.clone());
            Ok(self.staged_departments.len() as i64)
        }

        fn update_department(&mut self, department: &Department) -> Result<()> {
            self.total_calls += 1;
            self.maybe_fail()?;
            for d in self
                .committed_departments
                .iter_mut()
                .chain(self.staged_departments.iter_mut())
            {
                if d.code == department.code {
                    *d = department.clone();
                }
            }
            Ok(())
        }

        fn add_account(&mut self, account: &MunicipalAccount, _period_id: i64) -> Result<i64> {
            self.total_calls += 1;
            self.maybe_fail()?;
            self.staged_accounts.push(account.clone());
            Ok(self.staged_accounts.len() as i64)
        }

        fn update_account(&mut self, account: &MunicipalAccount, _period_id: i64) -> Result<()> {
            self.total_calls += 1;
            self.maybe_fail()?;
            for a in self
                .committed_accounts
                .iter_mut()
                .chain(self.staged_accounts.iter_mut())
            {
                if a.number == account.number {
                    *a = account.clone();
                }
            }
            Ok(())
        }

        fn begin_transaction(&mut self) -> Result<()> {
            self.total_calls += 1;
            self.begin_count += 1;
            Ok(())
        }

        fn commit(&mut self) -> Result<()> {
            self.total_calls += 1;
            self.commit_count += 1;
            self.committed_accounts.append(&mut self.staged_accounts);
            self.committed_departments.append(&mut self.staged_departments);
            Ok(())
        }

        fn rollback(&mut self) -> Result<()> {
            self.total_calls += 1;
            self.rollback_count += 1;
            self.staged_accounts.clear();
            self.staged_departments.clear();
            if self.fail_rollback {
                return Err(MuniError::Other("rollback failed too".into()));
            }
            Ok(())
        }

        fn save_changes(&mut self) -> Result<()> {
            self.total_calls += 1;
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Batch fixtures
    // -----------------------------------------------------------------------

    fn account(number: &str, name: &str, balance: f64) -> MunicipalAccount {
        let mut a = MunicipalAccount::new(
            AccountNumber::parse(number).unwrap(),
            name.to_string(),
            AccountType::Maintenance,
            FundType::General,
        );
        a.balance = balance;
        a.budget_amount = balance;
        a.department_code = Some("PW".to_string());
        a
    }

    fn batch(accounts: Vec<MunicipalAccount>) -> ParsedBatch {
        let departments = vec![Department {
            id: None,
            code: "PW".to_string(),
            name: "PW".to_string(),
            fund: FundType::General,
        }];
        ParsedBatch {
            accounts,
            departments,
            budget_year: 2025,
            structure: ValidationResult::new(),
        }
    }

    fn valid_batch() -> ParsedBatch {
        let mut parent = account("405", "Roads", 20_000.0);
        parent.budget_amount = 20_000.0;
        let mut child = account("405.1", "Paving", 20_000.0);
        child.parent_number = Some(AccountNumber::parse("405").unwrap());
        batch(vec![parent, child])
    }

    fn no_gasb() -> ImportOptions {
        ImportOptions {
            validate_gasb_compliance: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_successful_import() {
        let mut repo = MockRepo::default();
        let result = run_import(&mut repo, &valid_batch(), &no_gasb());
        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.accounts_imported, 2);
        assert_eq!(result.departments_imported, 1);
        assert_eq!(repo.committed_accounts.len(), 2);
        assert_eq!(repo.commit_count, 1);
        assert_eq!(repo.rollback_count, 0);
        assert!(result.budget_period_id.is_some());
    }

    #[test]
    fn test_rejected_batch_never_touches_storage() {
        let mut repo = MockRepo::default();
        let bad = batch(vec![account("405", "  ", 100.0)]);
        let result = run_import(&mut repo, &bad, &no_gasb());
        assert!(!result.success);
        assert!(!result.errors.is_empty());
        assert_eq!(repo.total_calls, 0);
        assert_eq!(repo.begin_count, 0);
    }

    #[test]
    fn test_preview_performs_zero_repository_calls() {
        let mut repo = MockRepo::default();
        let options = ImportOptions {
            preview_only: true,
            validate_gasb_compliance: false,
            ..Default::default()
        };
        let result = run_import(&mut repo, &valid_batch(), &options);
        assert!(result.success);
        assert_eq!(result.accounts.len(), 2);
        assert_eq!(result.accounts_imported, 0);
        assert_eq!(repo.total_calls, 0);
    }

    #[test]
    fn test_atomicity_on_injected_failure() {
        let mut repo = MockRepo::default();
        // Writes: period(1), department(2), account(3), account(4) — fail on
        // the last account.
        repo.fail_at_write = Some(4);
        let result = run_import(&mut repo, &valid_batch(), &no_gasb());
        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.contains("injected storage failure")));
        assert_eq!(repo.rollback_count, 1);
        assert_eq!(repo.commit_count, 0);
        assert!(repo.committed_accounts.is_empty());
        assert!(repo.committed_departments.is_empty());
        assert!(repo.staged_accounts.is_empty());
    }

    #[test]
    fn test_rollback_failure_compounds_without_masking() {
        let mut repo = MockRepo::default();
        repo.fail_at_write = Some(3);
        repo.fail_rollback = true;
        let result = run_import(&mut repo, &valid_batch(), &no_gasb());
        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.contains("injected storage failure")));
        assert!(result.errors.iter().any(|e| e.contains("Rollback also failed")));
    }

    #[test]
    fn test_skip_validation_errors_tolerates_up_to_limit() {
        let bad = batch(vec![account("405", " ", 100.0)]);
        let mut repo = MockRepo::default();
        let options = ImportOptions {
            skip_validation_errors: true,
            max_validation_errors: 1,
            validate_gasb_compliance: false,
            ..Default::default()
        };
        let result = run_import(&mut repo, &bad, &options);
        assert!(result.success);
        // The tolerated errors stay in the result for caller review.
        assert_eq!(result.errors.len(), 1);

        let mut strict_repo = MockRepo::default();
        let strict = ImportOptions {
            skip_validation_errors: true,
            max_validation_errors: 0,
            validate_gasb_compliance: false,
            ..Default::default()
        };
        assert!(!run_import(&mut strict_repo, &bad, &strict).success);
    }

    #[test]
    fn test_period_reuse_and_explicit_creation() {
        let mut repo = MockRepo::default();
        let first = run_import(&mut repo, &valid_batch(), &no_gasb());
        let second = run_import(&mut repo, &valid_batch(), &no_gasb());
        assert_eq!(first.budget_period_id, second.budget_period_id);
        assert_eq!(repo.periods.len(), 1);

        let fresh = ImportOptions {
            create_new_budget_period: true,
            validate_gasb_compliance: false,
            ..Default::default()
        };
        let third = run_import(&mut repo, &valid_batch(), &fresh);
        assert!(third.success);
        assert_eq!(repo.periods.len(), 2);
    }

    #[test]
    fn test_explicit_period_id_must_exist() {
        let mut repo = MockRepo::default();
        let options = ImportOptions {
            budget_period_id: Some(42),
            validate_gasb_compliance: false,
            ..Default::default()
        };
        let result = run_import(&mut repo, &valid_batch(), &options);
        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.contains("42")));
        assert_eq!(repo.rollback_count, 1);
    }

    #[test]
    fn test_reimport_without_overwrite_leaves_existing_rows() {
        let mut repo = MockRepo::default();
        run_import(&mut repo, &valid_batch(), &no_gasb());

        let mut changed = valid_batch();
        changed.accounts[0].balance = 99_999.0;
        changed.accounts[1].balance = 99_999.0;
        let keep = ImportOptions {
            overwrite_existing_accounts: false,
            validate_gasb_compliance: false,
            ..Default::default()
        };
        let result = run_import(&mut repo, &changed, &keep);
        assert!(result.success);
        assert_eq!(result.accounts_imported, 0);
        assert!(repo.committed_accounts.iter().all(|a| a.balance == 20_000.0));
    }

    #[test]
    fn test_idempotent_reimport_with_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let conn = crate::db::get_connection(&dir.path().join("test.db")).unwrap();
        crate::db::init_db(&conn).unwrap();
        let mut repo = SqliteRepository::new(conn);

        let first = run_import(&mut repo, &valid_batch(), &no_gasb());
        assert!(first.success, "errors: {:?}", first.errors);
        let period_id = first.budget_period_id.unwrap();
        let before = repo.list_accounts(period_id, None).unwrap();

        let second = run_import(&mut repo, &valid_batch(), &no_gasb());
        assert!(second.success, "errors: {:?}", second.errors);
        assert_eq!(second.budget_period_id, Some(period_id));
        let after = repo.list_accounts(period_id, None).unwrap();

        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.number, a.number);
            assert_eq!(b.balance, a.balance);
            assert_eq!(b.budget_amount, a.budget_amount);
        }
    }

    #[test]
    fn test_busy_flag_single_flight() {
        let orchestrator = ImportOrchestrator::new();
        assert!(!orchestrator.is_busy());
        assert!(orchestrator.try_begin());
        assert!(orchestrator.is_busy());
        assert!(!orchestrator.try_begin());
        orchestrator.finish();
        assert!(orchestrator.try_begin());
    }
}
