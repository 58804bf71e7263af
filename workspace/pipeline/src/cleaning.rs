//! The cleaning stage: fifteen ordered steps run inside one transaction.

mod assignments;
mod auth;
mod users;

use common::{CleaningReport, StepReport, UnitFailure};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use std::fmt;
use tracing::{debug, error, info, instrument, trace};

use crate::error::Result;
use crate::CleaningContext;

/// Maximum number of ids bound into one `IN (...)` list.
pub const ID_CHUNK: usize = 500;

/// Deletes the rows of `E` whose `column` is in `ids`, in chunks.
pub async fn delete_by_ids<E, C>(conn: &C, column: E::Column, ids: &[i32]) -> Result<u64>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let mut affected = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let result = E::delete_many()
            .filter(column.is_in(chunk.iter().copied()))
            .exec(conn)
            .await?;
        affected += result.rows_affected;
    }
    Ok(affected)
}

/// One cleaning step. Variants are listed in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleaningStep {
    NormalizeAuthEmails,
    DropInvalidAuthEmails,
    NormalizePhoneNumbers,
    NormalizeUsernames,
    NormalizeFullNames,
    NullOutOfRangeBirthDates,
    TrimBios,
    DeleteOrphanedUsers,
    DeduplicateUsersByUsername,
    DeduplicateAuthByEmail,
    DeleteIncompleteUsers,
    DeleteDanglingAssignments,
    NormalizeAssignmentLabels,
    DeduplicateAssignments,
    NormalizeLogActions,
}

impl CleaningStep {
    pub const ORDERED: [CleaningStep; 15] = [
        CleaningStep::NormalizeAuthEmails,
        CleaningStep::DropInvalidAuthEmails,
        CleaningStep::NormalizePhoneNumbers,
        CleaningStep::NormalizeUsernames,
        CleaningStep::NormalizeFullNames,
        CleaningStep::NullOutOfRangeBirthDates,
        CleaningStep::TrimBios,
        CleaningStep::DeleteOrphanedUsers,
        CleaningStep::DeduplicateUsersByUsername,
        CleaningStep::DeduplicateAuthByEmail,
        CleaningStep::DeleteIncompleteUsers,
        CleaningStep::DeleteDanglingAssignments,
        CleaningStep::NormalizeAssignmentLabels,
        CleaningStep::DeduplicateAssignments,
        CleaningStep::NormalizeLogActions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CleaningStep::NormalizeAuthEmails => "normalize_auth_emails",
            CleaningStep::DropInvalidAuthEmails => "drop_invalid_auth_emails",
            CleaningStep::NormalizePhoneNumbers => "normalize_phone_numbers",
            CleaningStep::NormalizeUsernames => "normalize_usernames",
            CleaningStep::NormalizeFullNames => "normalize_full_names",
            CleaningStep::NullOutOfRangeBirthDates => "null_out_of_range_birth_dates",
            CleaningStep::TrimBios => "trim_bios",
            CleaningStep::DeleteOrphanedUsers => "delete_orphaned_users",
            CleaningStep::DeduplicateUsersByUsername => "deduplicate_users_by_username",
            CleaningStep::DeduplicateAuthByEmail => "deduplicate_auth_by_email",
            CleaningStep::DeleteIncompleteUsers => "delete_incomplete_users",
            CleaningStep::DeleteDanglingAssignments => "delete_dangling_assignments",
            CleaningStep::NormalizeAssignmentLabels => "normalize_assignment_labels",
            CleaningStep::DeduplicateAssignments => "deduplicate_assignments",
            CleaningStep::NormalizeLogActions => "normalize_log_actions",
        }
    }

    /// Runs this step alone and returns the number of rows changed or deleted.
    pub async fn apply<C: ConnectionTrait>(self, conn: &C, ctx: &CleaningContext) -> Result<u64> {
        match self {
            CleaningStep::NormalizeAuthEmails => auth::normalize_emails(conn, ctx).await,
            CleaningStep::DropInvalidAuthEmails => auth::drop_invalid_emails(conn).await,
            CleaningStep::NormalizePhoneNumbers => users::normalize_phone_numbers(conn, ctx).await,
            CleaningStep::NormalizeUsernames => users::normalize_usernames(conn, ctx).await,
            CleaningStep::NormalizeFullNames => users::normalize_full_names(conn, ctx).await,
            CleaningStep::NullOutOfRangeBirthDates => {
                users::null_out_of_range_birth_dates(conn, ctx).await
            }
            CleaningStep::TrimBios => users::trim_bios(conn, ctx).await,
            CleaningStep::DeleteOrphanedUsers => users::delete_orphans(conn).await,
            CleaningStep::DeduplicateUsersByUsername => {
                users::deduplicate_by_username(conn, ctx).await
            }
            CleaningStep::DeduplicateAuthByEmail => auth::deduplicate_by_email(conn, ctx).await,
            CleaningStep::DeleteIncompleteUsers => users::delete_incomplete(conn).await,
            CleaningStep::DeleteDanglingAssignments => assignments::delete_dangling(conn).await,
            CleaningStep::NormalizeAssignmentLabels => assignments::normalize_labels(conn).await,
            CleaningStep::DeduplicateAssignments => assignments::deduplicate(conn, ctx).await,
            CleaningStep::NormalizeLogActions => assignments::normalize_log_actions(conn).await,
        }
    }
}

impl fmt::Display for CleaningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs every step in order inside a single transaction.
///
/// The first failing step rolls the whole stage back; the report then carries
/// the steps that had run, `committed == false` and the failure.
#[instrument(skip_all)]
pub async fn run_cleaning(db: &DatabaseConnection, ctx: &CleaningContext) -> Result<CleaningReport> {
    trace!("Starting cleaning stage");
    let txn = db.begin().await?;
    let mut report = CleaningReport::default();

    for step in CleaningStep::ORDERED {
        debug!("Running cleaning step {}", step);
        match step.apply(&txn, ctx).await {
            Ok(rows_affected) => {
                info!(step = step.name(), rows_affected, "Cleaning step finished");
                report.steps.push(StepReport {
                    step: step.name().to_string(),
                    rows_affected,
                });
            }
            Err(e) => {
                error!(step = step.name(), "Cleaning step failed, rolling back: {}", e);
                txn.rollback().await?;
                report.failure = Some(UnitFailure::new(step.name(), &e));
                return Ok(report);
            }
        }
    }

    txn.commit().await?;
    report.committed = true;
    info!("Cleaning stage committed");
    Ok(report)
}
