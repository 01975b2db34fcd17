use rusqlite::{Connection, OptionalExtension};

use crate::account_number::AccountNumber;
use crate::error::Result;
use crate::funds::{FundClass, FundType};
use crate::models::{AccountType, BudgetPeriod, Department, MunicipalAccount, PeriodStatus};

/// Transactional storage collaborator for the import orchestrator. The
/// orchestrator only talks through this trait, so storage behavior (including
/// injected failures) is swappable in tests.
pub trait BudgetRepository {
    fn find_account(
        &mut self,
        number: &AccountNumber,
        period_id: i64,
    ) -> Result<Option<MunicipalAccount>>;
    fn find_department(&mut self, code: &str) -> Result<Option<Department>>;
    fn find_budget_period(&mut self, year: i32, name: &str) -> Result<Option<BudgetPeriod>>;
    fn get_budget_period(&mut self, id: i64) -> Result<Option<BudgetPeriod>>;

    fn add_budget_period(&mut self, period: &BudgetPeriod) -> Result<i64>;
    fn add_department(&mut self, department: &Department) -> Result<i64>;
    fn update_department(&mut self, department: &Department) -> Result<()>;
    /// Insert a new account row for the period, resolving department and
    /// parent references by code. Parents must be inserted before children.
    fn add_account(&mut self, account: &MunicipalAccount, period_id: i64) -> Result<i64>;
    /// Update the mutable fields of an existing `(number, period)` row.
    fn update_account(&mut self, account: &MunicipalAccount, period_id: i64) -> Result<()>;

    fn begin_transaction(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
    /// Flush pending writes without ending the transaction.
    fn save_changes(&mut self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    pub fn new(conn: Connection) -> Self {
        SqliteRepository { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<MunicipalAccount> {
        let number: String = row.get("account_number")?;
        let type_str: String = row.get("account_type")?;
        let fund_str: String = row.get("fund")?;
        let class_str: String = row.get("fund_class")?;
        Ok(MunicipalAccount {
            id: Some(row.get("id")?),
            number: AccountNumber::parse(&number).unwrap_or_else(|| {
                // The schema only ever stores parser-validated codes.
                AccountNumber::parse("0").unwrap()
            }),
            name: row.get("name")?,
            account_type: AccountType::parse(&type_str)
                .unwrap_or(AccountType::Services),
            fund: FundType::parse(&fund_str).unwrap_or(FundType::General),
            fund_class: FundClass::parse(&class_str).unwrap_or(FundClass::Governmental),
            balance: row.get("balance")?,
            budget_amount: row.get("budget_amount")?,
            department_code: row.get("department_code")?,
            parent_number: None,
            is_active: row.get::<_, i64>("is_active")? != 0,
        })
    }

    /// Accounts in a period, ordered by code; optionally restricted to a fund.
    pub fn list_accounts(
        &self,
        period_id: i64,
        fund: Option<FundType>,
    ) -> Result<Vec<MunicipalAccount>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.account_number, a.name, a.account_type, a.fund, a.fund_class,
                    a.balance, a.budget_amount, a.parent_account_id, a.is_active,
                    d.code AS department_code
             FROM accounts a LEFT JOIN departments d ON d.id = a.department_id
             WHERE a.budget_period_id = ?1 AND (?2 IS NULL OR a.fund = ?2)
             ORDER BY a.account_number",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![period_id, fund.map(|f| f.as_str())],
            |row| Self::row_to_account(row),
        )?;
        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?);
        }
        Ok(accounts)
    }

    pub fn list_departments(&self) -> Result<Vec<Department>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, code, name, fund FROM departments ORDER BY code")?;
        let rows = stmt.query_map([], |row| {
            let fund: String = row.get(3)?;
            Ok(Department {
                id: Some(row.get(0)?),
                code: row.get(1)?,
                name: row.get(2)?,
                fund: FundType::parse(&fund).unwrap_or(FundType::General),
            })
        })?;
        let mut departments = Vec::new();
        for row in rows {
            departments.push(row?);
        }
        Ok(departments)
    }

    pub fn list_budget_periods(&self) -> Result<Vec<BudgetPeriod>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, year, name, status, created_date FROM budget_periods ORDER BY year, name",
        )?;
        let rows = stmt.query_map([], Self::row_to_period)?;
        let mut periods = Vec::new();
        for row in rows {
            periods.push(row?);
        }
        Ok(periods)
    }

    fn row_to_period(row: &rusqlite::Row<'_>) -> rusqlite::Result<BudgetPeriod> {
        let status: String = row.get(3)?;
        Ok(BudgetPeriod {
            id: Some(row.get(0)?),
            year: row.get(1)?,
            name: row.get(2)?,
            status: PeriodStatus::parse(&status).unwrap_or(PeriodStatus::Draft),
            created_date: row.get(4)?,
        })
    }

    pub fn record_import(
        &self,
        filename: &str,
        result: &crate::models::ImportResult,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO import_log (filename, budget_period_id, rows_parsed, accounts_imported,
                                     departments_imported, elapsed_ms, success)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                filename,
                result.budget_period_id,
                result.rows_parsed as i64,
                result.accounts_imported as i64,
                result.departments_imported as i64,
                result.elapsed_ms as i64,
                result.success,
            ],
        )?;
        Ok(())
    }
}

impl BudgetRepository for SqliteRepository {
    fn find_account(
        &mut self,
        number: &AccountNumber,
        period_id: i64,
    ) -> Result<Option<MunicipalAccount>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT a.id, a.account_number, a.name, a.account_type, a.fund, a.fund_class,
                    a.balance, a.budget_amount, a.parent_account_id, a.is_active,
                    d.code AS department_code
             FROM accounts a LEFT JOIN departments d ON d.id = a.department_id
             WHERE a.account_number = ?1 AND a.budget_period_id = ?2",
        )?;
        let account = stmt
            .query_row(rusqlite::params![number.as_str(), period_id], Self::row_to_account)
            .optional()?;
        Ok(account)
    }

    fn find_department(&mut self, code: &str) -> Result<Option<Department>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, code, name, fund FROM departments WHERE code = ?1")?;
        let department = stmt
            .query_row([code], |row| {
                let fund: String = row.get(3)?;
                Ok(Department {
                    id: Some(row.get(0)?),
                    code: row.get(1)?,
                    name: row.get(2)?,
                    fund: FundType::parse(&fund).unwrap_or(FundType::General),
                })
            })
            .optional()?;
        Ok(department)
    }

    fn find_budget_period(&mut self, year: i32, name: &str) -> Result<Option<BudgetPeriod>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, year, name, status, created_date FROM budget_periods
             WHERE year = ?1 AND name = ?2",
        )?;
        let period = stmt
            .query_row(rusqlite::params![year, name], Self::row_to_period)
            .optional()?;
        Ok(period)
    }

    fn get_budget_period(&mut self, id: i64) -> Result<Option<BudgetPeriod>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, year, name, status, created_date FROM budget_periods WHERE id = ?1",
        )?;
        let period = stmt.query_row([id], Self::row_to_period).optional()?;
        Ok(period)
    }

    fn add_budget_period(&mut self, period: &BudgetPeriod) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO budget_periods (year, name, status) VALUES (?1, ?2, ?3)",
            rusqlite::params![period.year, period.name, period.status.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn add_department(&mut self, department: &Department) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO departments (code, name, fund) VALUES (?1, ?2, ?3)",
            rusqlite::params![department.code, department.name, department.fund.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_department(&mut self, department: &Department) -> Result<()> {
        self.conn.execute(
            "UPDATE departments SET name = ?1, fund = ?2 WHERE code = ?3",
            rusqlite::params![department.name, department.fund.as_str(), department.code],
        )?;
        Ok(())
    }

    fn add_account(&mut self, account: &MunicipalAccount, period_id: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO accounts (account_number, name, account_type, fund, fund_class,
                                   balance, budget_amount, department_id, parent_account_id,
                                   budget_period_id, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7,
                     (SELECT id FROM departments WHERE code = ?8),
                     (SELECT id FROM accounts WHERE account_number = ?9 AND budget_period_id = ?10),
                     ?10, ?11)",
            rusqlite::params![
                account.number.as_str(),
                account.name,
                account.account_type.as_str(),
                account.fund.as_str(),
                account.fund_class.as_str(),
                account.balance,
                account.budget_amount,
                account.department_code,
                account.parent_number.as_ref().map(|n| n.as_str()),
                period_id,
                account.is_active,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_account(&mut self, account: &MunicipalAccount, period_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE accounts SET name = ?1, account_type = ?2, fund = ?3, fund_class = ?4,
                                 balance = ?5, budget_amount = ?6, is_active = ?7
             WHERE account_number = ?8 AND budget_period_id = ?9",
            rusqlite::params![
                account.name,
                account.account_type.as_str(),
                account.fund.as_str(),
                account.fund_class.as_str(),
                account.balance,
                account.budget_amount,
                account.is_active,
                account.number.as_str(),
                period_id,
            ],
        )?;
        Ok(())
    }

    fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn save_changes(&mut self) -> Result<()> {
        self.conn.cache_flush()?;
        Ok(())
    }
}
