//! Steps touching the tables hanging off `users`: roles, divisions and logs.

use model::entities::prelude::{Division, Log, Role, User};
use model::entities::{division, log, role, user};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use std::collections::HashSet;
use tracing::debug;

use super::delete_by_ids;
use crate::dedup::{Candidate, earliest_wins};
use crate::error::Result;
use crate::normalize::{is_blank, normalize_action, normalize_division, normalize_role};
use crate::CleaningContext;

/// Ids of rows to drop: dangling `user_id` or a blank label.
fn dangling_ids<'a>(
    rows: impl IntoIterator<Item = (i32, Option<i32>, Option<&'a str>)>,
    user_ids: &HashSet<i32>,
) -> Vec<i32> {
    rows.into_iter()
        .filter(|(_, user_id, label)| {
            !user_id.is_some_and(|id| user_ids.contains(&id)) || is_blank(*label)
        })
        .map(|(id, _, _)| id)
        .collect()
}

/// Removes role, division and log rows that point at missing users or carry no label.
pub async fn delete_dangling<C: ConnectionTrait>(conn: &C) -> Result<u64> {
    let user_ids: HashSet<i32> = User::find()
        .select_only()
        .column(user::Column::Id)
        .into_tuple::<i32>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    let roles = Role::find().all(conn).await?;
    let doomed = dangling_ids(
        roles.iter().map(|r| (r.id, r.user_id, r.role.as_deref())),
        &user_ids,
    );
    let mut affected = delete_by_ids::<Role, _>(conn, role::Column::Id, &doomed).await?;

    let divisions = Division::find().all(conn).await?;
    let doomed = dangling_ids(
        divisions
            .iter()
            .map(|d| (d.id, d.user_id, d.division_name.as_deref())),
        &user_ids,
    );
    affected += delete_by_ids::<Division, _>(conn, division::Column::Id, &doomed).await?;

    let logs = Log::find().all(conn).await?;
    let doomed = dangling_ids(
        logs.iter().map(|l| (l.id, l.user_id, l.action.as_deref())),
        &user_ids,
    );
    affected += delete_by_ids::<Log, _>(conn, log::Column::Id, &doomed).await?;

    debug!("Removed {} dangling role/division/log rows", affected);
    Ok(affected)
}

/// Role labels are lowercased and trimmed; division labels trimmed and whitespace-collapsed.
pub async fn normalize_labels<C: ConnectionTrait>(conn: &C) -> Result<u64> {
    let mut affected = 0;

    for row in Role::find().filter(role::Column::Role.is_not_null()).all(conn).await? {
        let Some(label) = row.role.as_deref() else {
            continue;
        };
        let normalized = normalize_role(label);
        if normalized != label {
            affected += Role::update_many()
                .col_expr(role::Column::Role, Expr::value(normalized))
                .filter(role::Column::Id.eq(row.id))
                .exec(conn)
                .await?
                .rows_affected;
        }
    }

    for row in Division::find()
        .filter(division::Column::DivisionName.is_not_null())
        .all(conn)
        .await?
    {
        let Some(label) = row.division_name.as_deref() else {
            continue;
        };
        let normalized = normalize_division(label);
        if normalized != label {
            affected += Division::update_many()
                .col_expr(division::Column::DivisionName, Expr::value(normalized))
                .filter(division::Column::Id.eq(row.id))
                .exec(conn)
                .await?
                .rows_affected;
        }
    }

    Ok(affected)
}

/// Earliest-wins per `(user_id, role)` and per `(user_id, division_name)`.
pub async fn deduplicate<C: ConnectionTrait>(conn: &C, ctx: &CleaningContext) -> Result<u64> {
    let roles = Role::find().all(conn).await?.into_iter().filter_map(|row| {
        match (row.user_id, row.role) {
            (Some(user_id), Some(label)) => {
                Some(Candidate::new(row.id, (user_id, label), row.created_at))
            }
            _ => None,
        }
    });
    let plan = earliest_wins(roles, ctx.tie_break);
    let mut affected = delete_by_ids::<Role, _>(conn, role::Column::Id, &plan.discarded).await?;

    let divisions = Division::find().all(conn).await?.into_iter().filter_map(|row| {
        match (row.user_id, row.division_name) {
            (Some(user_id), Some(label)) => {
                Some(Candidate::new(row.id, (user_id, label), row.created_at))
            }
            _ => None,
        }
    });
    let plan = earliest_wins(divisions, ctx.tie_break);
    affected += delete_by_ids::<Division, _>(conn, division::Column::Id, &plan.discarded).await?;

    Ok(affected)
}

/// Lowercases and trims log actions.
pub async fn normalize_log_actions<C: ConnectionTrait>(conn: &C) -> Result<u64> {
    let mut affected = 0;
    for row in Log::find().filter(log::Column::Action.is_not_null()).all(conn).await? {
        let Some(action) = row.action.as_deref() else {
            continue;
        };
        let normalized = normalize_action(action);
        if normalized != action {
            affected += Log::update_many()
                .col_expr(log::Column::Action, Expr::value(normalized))
                .filter(log::Column::Id.eq(row.id))
                .exec(conn)
                .await?
                .rows_affected;
        }
    }
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_ids() {
        let users: HashSet<i32> = [1, 2].into_iter().collect();
        let rows = vec![
            (10, Some(1), Some("admin")),
            (11, Some(3), Some("admin")),
            (12, None, Some("admin")),
            (13, Some(2), Some("  ")),
            (14, Some(2), None),
            (15, Some(2), Some("viewer")),
        ];
        assert_eq!(dangling_ids(rows, &users), vec![11, 12, 13, 14]);
    }
}
