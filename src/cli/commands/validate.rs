use anyhow::Result;
use pipeline::validation::run_validation;
use tracing::{info, trace};

use super::{connect, print_report, RunOptions};

pub async fn validate(database_url: &str, options: &RunOptions) -> Result<()> {
    trace!("Entering validate function");
    let db = connect(database_url).await?;

    let report = run_validation(&db, &options.context()).await;
    info!(clean = report.is_clean(), "Validation finished");

    print_report(&report, options.json)
}
