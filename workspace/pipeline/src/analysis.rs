//! Read-only diagnostic checks, run before and after cleaning.

use common::{AnalysisReport, CheckResult, UnitFailure};
use model::entities::prelude::{Auth, Division, Role, User};
use model::entities::{auth, division, role, user};
use sea_orm::{ConnectionTrait, EntityTrait, QuerySelect};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::dedup::surplus_count;
use crate::error::Result;
use crate::normalize::{
    birth_date_in_range, digit_count, is_valid_email, normalize_email, normalize_username,
    MIN_PHONE_DIGITS,
};
use crate::sql::{count_unresolved, query_count, quote_ident};
use crate::CleaningContext;

/// Columns whose NULL count is reported, as `(table, column)`.
pub const NULLABLE_COLUMNS: [(&str, &str); 9] = [
    ("auth", "email"),
    ("users", "auth_id"),
    ("users", "full_name"),
    ("users", "username"),
    ("users", "birth_date"),
    ("users", "phone_number"),
    ("roles", "user_id"),
    ("divisions", "user_id"),
    ("logs", "user_id"),
];

/// Foreign keys checked for unresolved references, as `(child, column, parent)`.
pub const REFERENCES: [(&str, &str, &str); 4] = [
    ("users", "auth_id", "auth"),
    ("roles", "user_id", "users"),
    ("divisions", "user_id", "users"),
    ("logs", "user_id", "users"),
];

/// One diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisCheck {
    NullCounts,
    DuplicateEmails,
    DuplicateUsernames,
    MalformedValues,
    OrphanedReferences,
    DuplicateAssignments,
}

impl AnalysisCheck {
    pub const ALL: [AnalysisCheck; 6] = [
        AnalysisCheck::NullCounts,
        AnalysisCheck::DuplicateEmails,
        AnalysisCheck::DuplicateUsernames,
        AnalysisCheck::MalformedValues,
        AnalysisCheck::OrphanedReferences,
        AnalysisCheck::DuplicateAssignments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnalysisCheck::NullCounts => "null_counts",
            AnalysisCheck::DuplicateEmails => "duplicate_emails",
            AnalysisCheck::DuplicateUsernames => "duplicate_usernames",
            AnalysisCheck::MalformedValues => "malformed_values",
            AnalysisCheck::OrphanedReferences => "orphaned_references",
            AnalysisCheck::DuplicateAssignments => "duplicate_assignments",
        }
    }

    pub async fn run<C: ConnectionTrait>(
        self,
        conn: &C,
        ctx: &CleaningContext,
    ) -> Result<CheckResult> {
        let mut result = CheckResult::new(self.name());
        match self {
            AnalysisCheck::NullCounts => {
                let backend = conn.get_database_backend();
                for (table, column) in NULLABLE_COLUMNS {
                    let count = query_count(
                        conn,
                        format!(
                            "SELECT COUNT(*) AS occurrences FROM {} WHERE {} IS NULL",
                            quote_ident(backend, table),
                            quote_ident(backend, column)
                        ),
                    )
                    .await?;
                    result.push(format!("{table}.{column}"), count);
                }
            }
            AnalysisCheck::DuplicateEmails => {
                let emails = load_emails(conn).await?;
                for (email, count) in repeated(emails.iter().flatten().map(|e| normalize_email(e))) {
                    result.push(email, count);
                }
            }
            AnalysisCheck::DuplicateUsernames => {
                let usernames = load_usernames(conn).await?;
                for (username, count) in
                    repeated(usernames.iter().flatten().map(|u| normalize_username(u)))
                {
                    result.push(username, count);
                }
            }
            AnalysisCheck::MalformedValues => {
                let emails = load_emails(conn).await?;
                result.push(
                    "auth.email",
                    count_where(emails.iter().flatten(), |e| !is_valid_email(e)),
                );

                let users = User::find().all(conn).await?;
                result.push(
                    "users.phone_number",
                    count_where(users.iter().filter_map(|u| u.phone_number.as_deref()), |p| {
                        digit_count(p) < MIN_PHONE_DIGITS
                    }),
                );
                result.push(
                    "users.birth_date",
                    count_where(users.iter().filter_map(|u| u.birth_date), |d| {
                        !birth_date_in_range(*d, ctx.today)
                    }),
                );
                result.push(
                    "users.username",
                    count_where(users.iter().filter_map(|u| u.username.as_deref()), |u| {
                        normalize_username(u) != *u
                    }),
                );
            }
            AnalysisCheck::OrphanedReferences => {
                for (child, column, parent) in REFERENCES {
                    let count = count_unresolved(conn, child, column, parent).await?;
                    result.push(format!("{child}.{column}"), count);
                }
            }
            AnalysisCheck::DuplicateAssignments => {
                let (roles, divisions) = load_assignment_pairs(conn).await?;
                result.push("roles", surplus_count(roles));
                result.push("divisions", surplus_count(divisions));
            }
        }
        Ok(result)
    }
}

impl fmt::Display for AnalysisCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs the whole battery; a failing check is recorded and the rest still run.
#[instrument(skip_all)]
pub async fn run_analysis<C: ConnectionTrait>(conn: &C, ctx: &CleaningContext) -> AnalysisReport {
    let mut report = AnalysisReport::default();
    for check in AnalysisCheck::ALL {
        match check.run(conn, ctx).await {
            Ok(result) => {
                debug!(check = check.name(), rows = result.rows.len(), "Check finished");
                report.checks.push(result);
            }
            Err(e) => {
                warn!(check = check.name(), "Check failed: {}", e);
                report.failures.push(UnitFailure::new(check.name(), &e));
            }
        }
    }
    report
}

pub(crate) async fn load_emails<C: ConnectionTrait>(conn: &C) -> Result<Vec<Option<String>>> {
    Ok(Auth::find()
        .select_only()
        .column(auth::Column::Email)
        .into_tuple::<Option<String>>()
        .all(conn)
        .await?)
}

pub(crate) async fn load_usernames<C: ConnectionTrait>(conn: &C) -> Result<Vec<Option<String>>> {
    Ok(User::find()
        .select_only()
        .column(user::Column::Username)
        .into_tuple::<Option<String>>()
        .all(conn)
        .await?)
}

/// Non-null `(user_id, role)` and `(user_id, division_name)` pairs as stored.
pub(crate) async fn load_assignment_pairs<C: ConnectionTrait>(
    conn: &C,
) -> Result<(Vec<(i32, String)>, Vec<(i32, String)>)> {
    let roles = Role::find()
        .select_only()
        .column(role::Column::UserId)
        .column(role::Column::Role)
        .into_tuple::<(Option<i32>, Option<String>)>()
        .all(conn)
        .await?
        .into_iter()
        .filter_map(|pair| match pair {
            (Some(user_id), Some(label)) => Some((user_id, label)),
            _ => None,
        })
        .collect();
    let divisions = Division::find()
        .select_only()
        .column(division::Column::UserId)
        .column(division::Column::DivisionName)
        .into_tuple::<(Option<i32>, Option<String>)>()
        .all(conn)
        .await?
        .into_iter()
        .filter_map(|pair| match pair {
            (Some(user_id), Some(label)) => Some((user_id, label)),
            _ => None,
        })
        .collect();
    Ok((roles, divisions))
}

/// Keys seen more than once with their number of occurrences, sorted by key.
pub(crate) fn repeated<I: IntoIterator<Item = String>>(keys: I) -> Vec<(String, i64)> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts.into_iter().filter(|(_, count)| *count > 1).collect()
}

pub(crate) fn count_where<T, I, F>(values: I, predicate: F) -> i64
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> bool,
{
    values.into_iter().filter(|v| predicate(v)).count() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_dirty_dataset, setup_db, test_context};

    #[test]
    fn test_repeated_keeps_only_duplicates() {
        let keys = ["b", "a", "b", "c", "a", "a"].map(String::from);
        assert_eq!(
            repeated(keys),
            vec![("a".to_string(), 3), ("b".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_analysis_of_dirty_dataset() {
        let db = setup_db().await.unwrap();
        seed_dirty_dataset(&db).await.unwrap();

        let report = run_analysis(&db, &test_context()).await;
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(report.checks.len(), 6);

        let nulls = report.check("null_counts").unwrap();
        assert_eq!(nulls.count_of("auth.email"), Some(1));
        assert_eq!(nulls.count_of("users.auth_id"), Some(1));
        assert_eq!(nulls.count_of("users.full_name"), Some(1));

        let emails = report.check("duplicate_emails").unwrap();
        assert_eq!(emails.count_of("a@test.com"), Some(2));
        assert_eq!(emails.rows.len(), 1);

        let usernames = report.check("duplicate_usernames").unwrap();
        assert_eq!(usernames.count_of("carol"), Some(2));

        let malformed = report.check("malformed_values").unwrap();
        assert_eq!(malformed.count_of("auth.email"), Some(2));
        assert_eq!(malformed.count_of("users.phone_number"), Some(1));
        assert_eq!(malformed.count_of("users.birth_date"), Some(1));
        assert_eq!(malformed.count_of("users.username"), Some(3));

        let orphans = report.check("orphaned_references").unwrap();
        assert_eq!(orphans.count_of("users.auth_id"), Some(1));
        assert_eq!(orphans.count_of("roles.user_id"), Some(0));

        let pairs = report.check("duplicate_assignments").unwrap();
        assert_eq!(pairs.count_of("roles"), Some(0));
        assert_eq!(pairs.count_of("divisions"), Some(0));
    }

    #[tokio::test]
    async fn test_missing_table_fails_only_its_checks() {
        let db = setup_db().await.unwrap();
        db.execute_unprepared("DROP TABLE \"divisions\"").await.unwrap();

        let report = run_analysis(&db, &test_context()).await;

        let failed: Vec<&str> = report.failures.iter().map(|f| f.unit.as_str()).collect();
        assert_eq!(
            failed,
            vec!["null_counts", "orphaned_references", "duplicate_assignments"]
        );
        assert_eq!(report.checks.len(), 3);
    }
}
