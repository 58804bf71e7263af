use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, trace, warn};

use super::connect;

/// Runs a SQL file; a missing file is reported before connecting.
pub async fn run_script(database_url: &str, path: &Path) -> Result<()> {
    trace!("Entering run_script function");
    if !path.is_file() {
        anyhow::bail!("Script file {} does not exist", path.display());
    }

    let db = connect(database_url).await?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = pipeline::script::run_script(&db, path, &mut out)
        .await
        .with_context(|| format!("Failed to run script {}", path.display()))?;
    out.flush()?;
    drop(out);

    if report.failed.is_empty() {
        info!("Script finished: {} statement(s) executed", report.executed);
    } else {
        warn!(
            "Script finished: {} statement(s) executed, {} failed",
            report.executed,
            report.failed.len()
        );
    }
    print!("{report}");
    Ok(())
}
