pub mod accounts;
pub mod departments;
pub mod import;
pub mod init;
pub mod periods;
pub mod status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "muni",
    about = "Municipal budget import and GASB compliance CLI for small towns."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up muni: choose a data directory and initialize the database.
    Init {
        /// Path for muni data (default: ~/Documents/muni)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Town name shown in reports
        #[arg(long)]
        town: Option<String>,
    },
    /// Import a budget workbook (XLSX or CSV), validate it, and commit it.
    Import {
        /// Path to the workbook
        file: String,
        /// Restrict processing to a named worksheet (repeatable)
        #[arg(long = "sheet")]
        sheets: Vec<String>,
        /// Parse and validate only; write nothing
        #[arg(long)]
        preview: bool,
        /// Budget year, overriding what the worksheet says
        #[arg(long)]
        year: Option<i32>,
        /// Fund for sheets matching no classification rule
        #[arg(long = "default-fund")]
        default_fund: Option<String>,
        /// Proceed despite up to N validation errors
        #[arg(long = "skip-errors")]
        skip_errors: Option<usize>,
        /// Skip the GASB compliance validator
        #[arg(long = "no-gasb")]
        no_gasb: bool,
        /// Always create a fresh budget period
        #[arg(long = "new-period")]
        new_period: bool,
        /// Import into an existing budget period id
        #[arg(long = "period-id")]
        period_id: Option<i64>,
        /// Leave existing accounts untouched instead of updating them
        #[arg(long = "keep-existing")]
        keep_existing: bool,
    },
    /// List accounts in a budget period.
    Accounts {
        /// Budget period id (default: most recent)
        #[arg(long)]
        period: Option<i64>,
        /// Restrict to one fund, e.g. general, utility
        #[arg(long)]
        fund: Option<String>,
    },
    /// List departments.
    Departments,
    /// List budget periods.
    Periods,
    /// Show current database and summary statistics.
    Status,
}
