pub mod analysis;
pub mod backup;
pub mod cleaning;
pub mod dedup;
pub mod error;
pub mod maintenance;
pub mod normalize;
pub mod orchestrator;
pub mod profile;
pub mod report;
pub mod script;
pub mod sql;
pub mod validation;

#[cfg(test)]
mod testing;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use common::TieBreak;

pub use cleaning::CleaningStep;
pub use error::{PipelineError, Result};
pub use orchestrator::Pipeline;

/// Values every cleaning step and check is evaluated against.
///
/// `today` bounds birth dates, `now` is stamped into `updated_at` of rewritten
/// rows, and `tie_break` orders rows with identical `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleaningContext {
    pub today: NaiveDate,
    pub now: NaiveDateTime,
    pub tie_break: TieBreak,
}

impl CleaningContext {
    pub fn new(now: NaiveDateTime, tie_break: TieBreak) -> Self {
        Self {
            today: now.date(),
            now,
            tie_break,
        }
    }
}

/// Returns the context used by the command line tool.
///
/// The provided date is used as "today" or the current date if none is provided.
pub fn default_context(today: Option<NaiveDate>, tie_break: TieBreak) -> CleaningContext {
    let now = Utc::now().naive_utc();
    match today {
        Some(today) => CleaningContext {
            today,
            now,
            tie_break,
        },
        None => CleaningContext::new(now, tie_break),
    }
}
