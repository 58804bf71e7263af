use anyhow::Result;
use pipeline::Pipeline;
use tracing::{info, trace, warn};

use super::{connect, print_report, RunOptions};

/// Runs the full pipeline and prints its summary, however many units failed.
pub async fn clean(database_url: &str, options: &RunOptions) -> Result<()> {
    trace!("Entering clean function");
    let db = connect(database_url).await?;

    let mut pipeline = Pipeline::new(options.context());
    let summary = pipeline.run(&db).await;

    match summary.failure_count() {
        0 => info!("Pipeline completed without failures"),
        n => warn!("Pipeline completed with {} failed unit(s)", n),
    }

    print_report(&summary, options.json)
}
