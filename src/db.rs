use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS budget_periods (
    id INTEGER PRIMARY KEY,
    year INTEGER NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    created_date TEXT DEFAULT (datetime('now')),
    UNIQUE (year, name)
);

CREATE TABLE IF NOT EXISTS departments (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    fund TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    account_number TEXT NOT NULL,
    name TEXT NOT NULL,
    account_type TEXT NOT NULL,
    fund TEXT NOT NULL,
    fund_class TEXT NOT NULL,
    balance REAL NOT NULL DEFAULT 0,
    budget_amount REAL NOT NULL DEFAULT 0,
    department_id INTEGER,
    parent_account_id INTEGER,
    budget_period_id INTEGER NOT NULL,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (account_number, budget_period_id),
    FOREIGN KEY (department_id) REFERENCES departments(id),
    FOREIGN KEY (parent_account_id) REFERENCES accounts(id),
    FOREIGN KEY (budget_period_id) REFERENCES budget_periods(id)
);

CREATE TABLE IF NOT EXISTS import_log (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    budget_period_id INTEGER,
    rows_parsed INTEGER,
    accounts_imported INTEGER,
    departments_imported INTEGER,
    elapsed_ms INTEGER,
    success INTEGER DEFAULT 0,
    imported_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (budget_period_id) REFERENCES budget_periods(id)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["budget_periods", "departments", "accounts", "import_log"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_account_number_unique_per_period() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO budget_periods (year, name) VALUES (2025, 'FY2025')", [],
        ).unwrap();
        let insert = "INSERT INTO accounts (account_number, name, account_type, fund, fund_class, budget_period_id) \
                      VALUES ('405', 'Roads', 'maintenance', 'general', 'governmental', 1)";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
