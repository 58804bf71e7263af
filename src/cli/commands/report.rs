use anyhow::{Context, Result};
use pipeline::report::row_counts;
use tracing::trace;

use super::{connect, print_report, RunOptions};

pub async fn report(database_url: &str, options: &RunOptions) -> Result<()> {
    trace!("Entering report function");
    let db = connect(database_url).await?;

    let counts = row_counts(&db).await.context("Failed to count rows")?;
    print_report(&counts, options.json)
}
