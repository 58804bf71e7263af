//! Post-cleaning validation. Observational only: findings are reported, never enforced.

use common::{UnitFailure, ValidationFinding, ValidationReport};
use model::entities::prelude::User;
use model::entities::user;
use sea_orm::{ConnectionTrait, EntityTrait, QuerySelect};
use tracing::{info, instrument, warn};

use crate::analysis::{count_where, load_assignment_pairs, load_emails, load_usernames};
use crate::dedup::surplus_count;
use crate::error::Result;
use crate::normalize::{
    birth_date_in_range, is_valid_email, normalize_email, normalize_phone, normalize_username,
};
use crate::sql::count_unresolved;
use crate::CleaningContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    MalformedEmails,
    NonCanonicalEmails,
    DuplicateEmails,
    NonCanonicalPhoneNumbers,
    OutOfRangeBirthDates,
    NonCanonicalUsernames,
    DuplicateUsernames,
    OrphanedUsers,
    DanglingRoles,
    DanglingDivisions,
    DanglingLogs,
    DuplicateRoleAssignments,
    DuplicateDivisionAssignments,
}

impl ValidationRule {
    pub const ALL: [ValidationRule; 13] = [
        ValidationRule::MalformedEmails,
        ValidationRule::NonCanonicalEmails,
        ValidationRule::DuplicateEmails,
        ValidationRule::NonCanonicalPhoneNumbers,
        ValidationRule::OutOfRangeBirthDates,
        ValidationRule::NonCanonicalUsernames,
        ValidationRule::DuplicateUsernames,
        ValidationRule::OrphanedUsers,
        ValidationRule::DanglingRoles,
        ValidationRule::DanglingDivisions,
        ValidationRule::DanglingLogs,
        ValidationRule::DuplicateRoleAssignments,
        ValidationRule::DuplicateDivisionAssignments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValidationRule::MalformedEmails => "malformed_emails",
            ValidationRule::NonCanonicalEmails => "non_canonical_emails",
            ValidationRule::DuplicateEmails => "duplicate_emails",
            ValidationRule::NonCanonicalPhoneNumbers => "non_canonical_phone_numbers",
            ValidationRule::OutOfRangeBirthDates => "out_of_range_birth_dates",
            ValidationRule::NonCanonicalUsernames => "non_canonical_usernames",
            ValidationRule::DuplicateUsernames => "duplicate_usernames",
            ValidationRule::OrphanedUsers => "orphaned_users",
            ValidationRule::DanglingRoles => "dangling_roles",
            ValidationRule::DanglingDivisions => "dangling_divisions",
            ValidationRule::DanglingLogs => "dangling_logs",
            ValidationRule::DuplicateRoleAssignments => "duplicate_role_assignments",
            ValidationRule::DuplicateDivisionAssignments => "duplicate_division_assignments",
        }
    }

    /// Number of rows violating this rule.
    pub async fn violations<C: ConnectionTrait>(self, conn: &C, ctx: &CleaningContext) -> Result<i64> {
        let count = match self {
            ValidationRule::MalformedEmails => {
                let emails = load_emails(conn).await?;
                count_where(emails.iter(), |e| !e.as_deref().is_some_and(is_valid_email))
            }
            ValidationRule::NonCanonicalEmails => {
                let emails = load_emails(conn).await?;
                count_where(emails.iter().flatten(), |e| normalize_email(e) != **e)
            }
            ValidationRule::DuplicateEmails => {
                surplus_count(load_emails(conn).await?.into_iter().flatten())
            }
            ValidationRule::NonCanonicalPhoneNumbers => {
                let phones = User::find()
                    .select_only()
                    .column(user::Column::PhoneNumber)
                    .into_tuple::<Option<String>>()
                    .all(conn)
                    .await?;
                count_where(phones.iter().flatten(), |p| {
                    normalize_phone(p).as_deref() != Some(p.as_str())
                })
            }
            ValidationRule::OutOfRangeBirthDates => {
                let dates = User::find()
                    .select_only()
                    .column(user::Column::BirthDate)
                    .into_tuple::<Option<chrono::NaiveDate>>()
                    .all(conn)
                    .await?;
                count_where(dates.into_iter().flatten(), |d| {
                    !birth_date_in_range(*d, ctx.today)
                })
            }
            ValidationRule::NonCanonicalUsernames => {
                let usernames = load_usernames(conn).await?;
                count_where(usernames.iter().flatten(), |u| normalize_username(u) != **u)
            }
            ValidationRule::DuplicateUsernames => {
                surplus_count(load_usernames(conn).await?.into_iter().flatten())
            }
            ValidationRule::OrphanedUsers => count_unresolved(conn, "users", "auth_id", "auth").await?,
            ValidationRule::DanglingRoles => count_unresolved(conn, "roles", "user_id", "users").await?,
            ValidationRule::DanglingDivisions => {
                count_unresolved(conn, "divisions", "user_id", "users").await?
            }
            ValidationRule::DanglingLogs => count_unresolved(conn, "logs", "user_id", "users").await?,
            ValidationRule::DuplicateRoleAssignments => {
                surplus_count(load_assignment_pairs(conn).await?.0)
            }
            ValidationRule::DuplicateDivisionAssignments => {
                surplus_count(load_assignment_pairs(conn).await?.1)
            }
        };
        Ok(count)
    }
}

/// Evaluates every rule; a rule that cannot be evaluated is recorded as a failure.
#[instrument(skip_all)]
pub async fn run_validation<C: ConnectionTrait>(conn: &C, ctx: &CleaningContext) -> ValidationReport {
    let mut report = ValidationReport::default();
    for rule in ValidationRule::ALL {
        match rule.violations(conn, ctx).await {
            Ok(violations) => report.findings.push(ValidationFinding {
                rule: rule.name().to_string(),
                violations,
            }),
            Err(e) => {
                warn!(rule = rule.name(), "Validation rule failed: {}", e);
                report.failures.push(UnitFailure::new(rule.name(), &e));
            }
        }
    }
    info!(clean = report.is_clean(), "Validation finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::run_cleaning;
    use crate::testing::{seed_dirty_dataset, setup_db, test_context};

    #[tokio::test]
    async fn test_dirty_dataset_has_violations() {
        let db = setup_db().await.unwrap();
        seed_dirty_dataset(&db).await.unwrap();

        let report = run_validation(&db, &test_context()).await;

        assert!(!report.is_clean());
        assert_eq!(report.findings.len(), 13);
        assert_eq!(report.violations("malformed_emails"), Some(3));
        assert_eq!(report.violations("non_canonical_emails"), Some(1));
        assert_eq!(report.violations("duplicate_emails"), Some(0));
        assert_eq!(report.violations("non_canonical_phone_numbers"), Some(2));
        assert_eq!(report.violations("out_of_range_birth_dates"), Some(1));
        assert_eq!(report.violations("non_canonical_usernames"), Some(3));
        assert_eq!(report.violations("orphaned_users"), Some(1));
    }

    #[tokio::test]
    async fn test_clean_after_cleaning() {
        let db = setup_db().await.unwrap();
        seed_dirty_dataset(&db).await.unwrap();
        let ctx = test_context();

        let cleaning = run_cleaning(&db, &ctx).await.unwrap();
        assert!(cleaning.committed);

        let report = run_validation(&db, &ctx).await;
        assert!(report.is_clean(), "{report}");
    }
}
