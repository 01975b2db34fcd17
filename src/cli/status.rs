use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{get_data_dir, load_settings};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = get_data_dir().join("muni.db");
    if !db_path.exists() {
        println!("No database at {}. Run 'muni init' first.", db_path.display());
        return Ok(());
    }
    let conn = get_connection(&db_path)?;

    let periods: i64 = conn.query_row("SELECT count(*) FROM budget_periods", [], |r| r.get(0))?;
    let accounts: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))?;
    let departments: i64 = conn.query_row("SELECT count(*) FROM departments", [], |r| r.get(0))?;
    let imports: i64 = conn.query_row("SELECT count(*) FROM import_log", [], |r| r.get(0))?;

    if !settings.town_name.is_empty() {
        println!("Town: {}", settings.town_name);
    }
    println!("Database: {}", db_path.display());
    println!("Budget periods: {periods}");
    println!("Accounts: {accounts}");
    println!("Departments: {departments}");
    println!("Imports recorded: {imports}");
    Ok(())
}
