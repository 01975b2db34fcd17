use comfy_table::Table;

use crate::db::get_connection;
use crate::error::Result;
use crate::repository::SqliteRepository;
use crate::settings::get_data_dir;

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("muni.db"))?;
    let repo = SqliteRepository::new(conn);
    let departments = repo.list_departments()?;
    if departments.is_empty() {
        println!("No departments yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Code", "Name", "Fund"]);
    for dept in &departments {
        table.add_row(vec![
            dept.code.clone(),
            dept.name.clone(),
            dept.fund.as_str().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
