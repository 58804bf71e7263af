//! The optimized profile fetch.
//!
//! Counts come from grouped sub-joins and the role and division picks from
//! windowed sub-joins, so the query does one pass per child table instead of
//! one correlated subquery per output row.

use chrono::{NaiveDate, NaiveDateTime};
use common::UserProfile;
use sea_orm::{ConnectionTrait, FromQueryResult, Statement, Value};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::sql::placeholder;

#[derive(Debug, FromQueryResult)]
struct ProfileRow {
    id: i32,
    full_name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    birth_date: Option<NaiveDate>,
    phone_number: Option<String>,
    profile_json: Option<serde_json::Value>,
    role: Option<String>,
    current_division: Option<String>,
    log_count: i64,
    role_count: i64,
    division_count: i64,
    created_at: NaiveDateTime,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        UserProfile {
            id: row.id,
            full_name: row.full_name,
            username: row.username,
            email: row.email,
            birth_date: row.birth_date,
            phone_number: row.phone_number,
            profile_json: row.profile_json,
            role: row.role,
            current_division: row.current_division,
            log_count: row.log_count,
            role_count: row.role_count,
            division_count: row.division_count,
            created_at: row.created_at,
        }
    }
}

/// Profile query text with the user id bound at `param`.
pub fn profile_sql(param: &str) -> String {
    format!(
        r#"SELECT u.id, u.full_name, u.username, a.email, u.birth_date, u.phone_number,
       u.profile_json, r.role, d.division_name AS current_division,
       COALESCE(lc.occurrences, 0) AS log_count,
       COALESCE(rc.occurrences, 0) AS role_count,
       COALESCE(dc.occurrences, 0) AS division_count,
       u.created_at
FROM users u
LEFT JOIN auth a ON a.id = u.auth_id
LEFT JOIN (
    SELECT user_id, role,
           ROW_NUMBER() OVER (PARTITION BY user_id ORDER BY created_at, id) AS rn
    FROM roles
) r ON r.user_id = u.id AND r.rn = 1
LEFT JOIN (
    SELECT user_id, division_name,
           ROW_NUMBER() OVER (PARTITION BY user_id ORDER BY created_at DESC, id DESC) AS rn
    FROM divisions
) d ON d.user_id = u.id AND d.rn = 1
LEFT JOIN (SELECT user_id, COUNT(*) AS occurrences FROM logs GROUP BY user_id) lc
    ON lc.user_id = u.id
LEFT JOIN (SELECT user_id, COUNT(*) AS occurrences FROM roles GROUP BY user_id) rc
    ON rc.user_id = u.id
LEFT JOIN (SELECT user_id, COUNT(*) AS occurrences FROM divisions GROUP BY user_id) dc
    ON dc.user_id = u.id
WHERE u.id = {param}"#
    )
}

/// Fetches one profile; `None` when no user has `user_id`.
#[instrument(skip(conn))]
pub async fn fetch_profile<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<Option<UserProfile>> {
    let backend = conn.get_database_backend();
    let statement = Statement::from_sql_and_values(
        backend,
        profile_sql(&placeholder(backend, 1)),
        [Value::from(user_id)],
    );
    let row = ProfileRow::find_by_statement(statement).one(conn).await?;
    debug!(found = row.is_some(), "Profile query finished");
    Ok(row.map(UserProfile::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        insert_auth, insert_division, insert_log, insert_role, insert_user, setup_db, ts, NewUser,
    };

    #[test]
    fn test_no_correlated_subqueries() {
        let sql = profile_sql("$1");
        assert!(sql.ends_with("WHERE u.id = $1"));
        assert_eq!(sql.matches("ROW_NUMBER() OVER").count(), 2);
        assert_eq!(sql.matches("GROUP BY user_id").count(), 3);
        assert!(!sql.contains("(SELECT COUNT(*)"));
    }

    #[tokio::test]
    async fn test_fetch_profile() {
        let db = setup_db().await.unwrap();
        let auth_id = insert_auth(&db, Some("jane@example.com"), ts(1)).await.unwrap();
        let jane = insert_user(
            &db,
            NewUser {
                auth_id: Some(auth_id),
                username: Some("jane"),
                full_name: Some("Jane Doe"),
                birth_date: NaiveDate::from_ymd_opt(1990, 5, 17),
                ..Default::default()
            },
            ts(1),
        )
        .await
        .unwrap();
        let other = insert_user(
            &db,
            NewUser {
                username: Some("other"),
                ..Default::default()
            },
            ts(1),
        )
        .await
        .unwrap();

        insert_role(&db, Some(jane), Some("editor"), ts(3)).await.unwrap();
        insert_role(&db, Some(jane), Some("admin"), ts(2)).await.unwrap();
        insert_role(&db, Some(other), Some("owner"), ts(1)).await.unwrap();
        insert_division(&db, Some(jane), Some("Research"), ts(2)).await.unwrap();
        insert_division(&db, Some(jane), Some("Sales"), ts(5)).await.unwrap();
        for day in 1..=3 {
            insert_log(&db, Some(jane), Some("login"), ts(day)).await.unwrap();
        }

        let profile = fetch_profile(&db, jane).await.unwrap().unwrap();
        assert_eq!(profile.username.as_deref(), Some("jane"));
        assert_eq!(profile.email.as_deref(), Some("jane@example.com"));
        assert_eq!(profile.birth_date, NaiveDate::from_ymd_opt(1990, 5, 17));
        assert_eq!(profile.role.as_deref(), Some("admin"));
        assert_eq!(profile.current_division.as_deref(), Some("Sales"));
        assert_eq!(profile.log_count, 3);
        assert_eq!(profile.role_count, 2);
        assert_eq!(profile.division_count, 2);

        let other = fetch_profile(&db, other).await.unwrap().unwrap();
        assert_eq!(other.email, None);
        assert_eq!(other.role.as_deref(), Some("owner"));
        assert_eq!(other.current_division, None);
        assert_eq!(other.log_count, 0);
        assert_eq!(other.division_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_user_is_none() {
        let db = setup_db().await.unwrap();
        assert!(fetch_profile(&db, 42).await.unwrap().is_none());
    }
}
