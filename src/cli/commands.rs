pub mod analyze;
pub mod clean;
pub mod initdb;
pub mod profile;
pub mod report;
pub mod run_script;
pub mod validate;

pub use analyze::analyze;
pub use clean::clean;
pub use initdb::init_database;
pub use profile::fetch_profile;
pub use report::report;
pub use run_script::run_script;
pub use validate::validate;

use anyhow::Result;
use chrono::NaiveDate;
use common::TieBreak;
use pipeline::{default_context, CleaningContext};
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;
use std::fmt::Display;
use tracing::{debug, error, info, trace};

/// Options shared by the pipeline commands.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub tie_break: TieBreak,
    pub today: Option<NaiveDate>,
    pub json: bool,
}

impl RunOptions {
    pub fn context(&self) -> CleaningContext {
        default_context(self.today, self.tie_break)
    }
}

/// Connects to the database; a failure is fatal and never retried.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    trace!("Attempting to connect to database");
    match Database::connect(database_url).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            debug!("Database connection established");
            Ok(connection)
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            Err(e.into())
        }
    }
}

/// Prints a report to stdout as text or pretty JSON.
pub fn print_report<T: Serialize + Display>(report: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
