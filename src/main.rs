mod account_number;
mod cli;
mod db;
mod error;
mod fmt;
mod funds;
mod grid;
mod models;
mod orchestrator;
mod parser;
mod repository;
mod settings;
mod validation;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir, town } => cli::init::run(data_dir, town),
        Commands::Import {
            file,
            sheets,
            preview,
            year,
            default_fund,
            skip_errors,
            no_gasb,
            new_period,
            period_id,
            keep_existing,
        } => cli::import::run(cli::import::ImportArgs {
            file,
            sheets,
            preview,
            year,
            default_fund,
            skip_errors,
            no_gasb,
            new_period,
            period_id,
            keep_existing,
        }),
        Commands::Accounts { period, fund } => cli::accounts::list(period, fund),
        Commands::Departments => cli::departments::list(),
        Commands::Periods => cli::periods::list(),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
