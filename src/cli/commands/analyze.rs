use anyhow::Result;
use pipeline::analysis::run_analysis;
use tracing::{info, trace, warn};

use super::{connect, print_report, RunOptions};

pub async fn analyze(database_url: &str, options: &RunOptions) -> Result<()> {
    trace!("Entering analyze function");
    let db = connect(database_url).await?;

    let report = run_analysis(&db, &options.context()).await;
    if !report.failures.is_empty() {
        warn!("{} check(s) failed", report.failures.len());
    }
    info!("Analysis finished with {} check(s)", report.checks.len());

    print_report(&report, options.json)
}
