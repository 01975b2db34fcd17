use comfy_table::Table;

use crate::db::get_connection;
use crate::error::Result;
use crate::repository::SqliteRepository;
use crate::settings::get_data_dir;

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("muni.db"))?;
    let repo = SqliteRepository::new(conn);
    let periods = repo.list_budget_periods()?;
    if periods.is_empty() {
        println!("No budget periods yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Year", "Name", "Status", "Created"]);
    for period in &periods {
        table.add_row(vec![
            period.id.map(|id| id.to_string()).unwrap_or_default(),
            period.year.to_string(),
            period.name.clone(),
            period.status.as_str().to_string(),
            period.created_date.clone(),
        ]);
    }
    println!("{table}");
    Ok(())
}
