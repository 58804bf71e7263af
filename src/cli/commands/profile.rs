use anyhow::{bail, Context, Result};
use pipeline::profile;
use tracing::{debug, trace};

use super::{connect, print_report, RunOptions};

pub async fn fetch_profile(database_url: &str, user_id: i32, options: &RunOptions) -> Result<()> {
    trace!("Entering fetch_profile function");
    debug!("Fetching profile of user {}", user_id);
    let db = connect(database_url).await?;

    match profile::fetch_profile(&db, user_id)
        .await
        .context("Profile query failed")?
    {
        Some(profile) => print_report(&profile, options.json),
        None => bail!("No user with id {}", user_id),
    }
}
