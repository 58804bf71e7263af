//! Steps touching the `users` table.

use chrono::NaiveDate;
use model::entities::prelude::{Auth, User};
use model::entities::{auth, user};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use super::{ID_CHUNK, delete_by_ids};
use crate::dedup::{Candidate, earliest_wins};
use crate::error::Result;
use crate::normalize::{
    birth_date_in_range, collapse_whitespace, is_blank, normalize_phone, normalize_username,
    trim_to_option,
};
use crate::CleaningContext;

/// Strips phone numbers down to digits and `+`, nulling those left with too few digits.
pub async fn normalize_phone_numbers<C: ConnectionTrait>(
    conn: &C,
    ctx: &CleaningContext,
) -> Result<u64> {
    let mut affected = 0;
    for row in User::find()
        .filter(user::Column::PhoneNumber.is_not_null())
        .all(conn)
        .await?
    {
        let Some(phone) = row.phone_number.as_deref() else {
            continue;
        };
        let canonical = normalize_phone(phone);
        if canonical.as_deref() != Some(phone) {
            trace!(user_id = row.id, "Rewriting phone number");
            affected += update_user(conn, ctx, row.id, user::Column::PhoneNumber, canonical).await?;
        }
    }
    Ok(affected)
}

/// Lowercases and trims usernames, resolving collisions the same way emails are:
/// the earliest profile keeps the name and the others are deleted first.
///
/// Users without a resolvable credential take no part in collisions; their
/// username is cleared and the orphan sweep removes them later.
pub async fn normalize_usernames<C: ConnectionTrait>(
    conn: &C,
    ctx: &CleaningContext,
) -> Result<u64> {
    let auth_ids = existing_auth_ids(conn).await?;
    let rows = User::find().order_by_asc(user::Column::Id).all(conn).await?;

    let mut candidates = Vec::new();
    let mut blanked = Vec::new();
    for row in &rows {
        let Some(username) = row.username.as_deref() else {
            continue;
        };
        if !row.auth_id.is_some_and(|id| auth_ids.contains(&id)) {
            blanked.push(row.id);
            continue;
        }
        let normalized = normalize_username(username);
        if normalized.is_empty() {
            blanked.push(row.id);
        } else {
            candidates.push(Candidate::new(row.id, normalized, row.created_at));
        }
    }

    let plan = earliest_wins(candidates, ctx.tie_break);
    let mut affected = delete_by_ids::<User, _>(conn, user::Column::Id, &plan.discarded).await?;
    debug!("Removed {} users colliding after username normalization", affected);

    let current: HashMap<i32, Option<&str>> =
        rows.iter().map(|r| (r.id, r.username.as_deref())).collect();
    for survivor in &plan.survivors {
        if current.get(&survivor.id).copied().flatten() == Some(survivor.key.as_str()) {
            continue;
        }
        affected += update_user(
            conn,
            ctx,
            survivor.id,
            user::Column::Username,
            Some(survivor.key.clone()),
        )
        .await?;
    }
    for id in blanked {
        affected += update_user(conn, ctx, id, user::Column::Username, None::<String>).await?;
    }

    Ok(affected)
}

/// Trims full names and collapses internal whitespace runs.
pub async fn normalize_full_names<C: ConnectionTrait>(
    conn: &C,
    ctx: &CleaningContext,
) -> Result<u64> {
    let mut affected = 0;
    for row in User::find()
        .filter(user::Column::FullName.is_not_null())
        .all(conn)
        .await?
    {
        let Some(full_name) = row.full_name.as_deref() else {
            continue;
        };
        let collapsed = collapse_whitespace(full_name);
        if collapsed != full_name {
            affected +=
                update_user(conn, ctx, row.id, user::Column::FullName, Some(collapsed)).await?;
        }
    }
    Ok(affected)
}

/// Nulls birth dates before 1900-01-01 or after `ctx.today`.
pub async fn null_out_of_range_birth_dates<C: ConnectionTrait>(
    conn: &C,
    ctx: &CleaningContext,
) -> Result<u64> {
    let out_of_range: Vec<i32> = User::find()
        .filter(user::Column::BirthDate.is_not_null())
        .all(conn)
        .await?
        .into_iter()
        .filter(|row| {
            row.birth_date
                .is_some_and(|date| !birth_date_in_range(date, ctx.today))
        })
        .map(|row| row.id)
        .collect();

    let mut affected = 0;
    for chunk in out_of_range.chunks(ID_CHUNK) {
        let result = User::update_many()
            .col_expr(user::Column::BirthDate, Expr::value(None::<NaiveDate>))
            .col_expr(user::Column::UpdatedAt, Expr::value(ctx.now))
            .filter(user::Column::Id.is_in(chunk.iter().copied()))
            .exec(conn)
            .await?;
        affected += result.rows_affected;
    }
    Ok(affected)
}

/// Trims `bio` and `long_bio`; values that trim to nothing become NULL.
pub async fn trim_bios<C: ConnectionTrait>(conn: &C, ctx: &CleaningContext) -> Result<u64> {
    let mut affected = 0;
    for row in User::find().all(conn).await? {
        let bio = row.bio.as_deref().and_then(trim_to_option);
        let long_bio = row.long_bio.as_deref().and_then(trim_to_option);
        if bio == row.bio && long_bio == row.long_bio {
            continue;
        }
        let result = User::update_many()
            .col_expr(user::Column::Bio, Expr::value(bio))
            .col_expr(user::Column::LongBio, Expr::value(long_bio))
            .col_expr(user::Column::UpdatedAt, Expr::value(ctx.now))
            .filter(user::Column::Id.eq(row.id))
            .exec(conn)
            .await?;
        affected += result.rows_affected;
    }
    Ok(affected)
}

/// Deletes users whose `auth_id` is NULL or references no credential row.
pub async fn delete_orphans<C: ConnectionTrait>(conn: &C) -> Result<u64> {
    let auth_ids = existing_auth_ids(conn).await?;

    let orphans: Vec<i32> = User::find()
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::AuthId)
        .into_tuple::<(i32, Option<i32>)>()
        .all(conn)
        .await?
        .into_iter()
        .filter(|(_, auth_id)| !auth_id.is_some_and(|id| auth_ids.contains(&id)))
        .map(|(id, _)| id)
        .collect();

    debug!("Found {} orphaned users", orphans.len());
    delete_by_ids::<User, _>(conn, user::Column::Id, &orphans).await
}

/// Earliest-wins over the stored username.
pub async fn deduplicate_by_username<C: ConnectionTrait>(
    conn: &C,
    ctx: &CleaningContext,
) -> Result<u64> {
    let candidates = User::find().all(conn).await?.into_iter().filter_map(|row| {
        row.username
            .map(|username| Candidate::new(row.id, username, row.created_at))
    });
    let plan = earliest_wins(candidates, ctx.tie_break);
    delete_by_ids::<User, _>(conn, user::Column::Id, &plan.discarded).await
}

/// Deletes users missing a full name or a username.
pub async fn delete_incomplete<C: ConnectionTrait>(conn: &C) -> Result<u64> {
    let incomplete: Vec<i32> = User::find()
        .all(conn)
        .await?
        .into_iter()
        .filter(|row| is_blank(row.full_name.as_deref()) || is_blank(row.username.as_deref()))
        .map(|row| row.id)
        .collect();
    delete_by_ids::<User, _>(conn, user::Column::Id, &incomplete).await
}

async fn existing_auth_ids<C: ConnectionTrait>(conn: &C) -> Result<HashSet<i32>> {
    Ok(Auth::find()
        .select_only()
        .column(auth::Column::Id)
        .into_tuple::<i32>()
        .all(conn)
        .await?
        .into_iter()
        .collect())
}

async fn update_user<C, V>(
    conn: &C,
    ctx: &CleaningContext,
    id: i32,
    column: user::Column,
    value: V,
) -> Result<u64>
where
    C: ConnectionTrait,
    V: Into<sea_orm::Value>,
{
    let result = User::update_many()
        .col_expr(column, Expr::value(value.into()))
        .col_expr(user::Column::UpdatedAt, Expr::value(ctx.now))
        .filter(user::Column::Id.eq(id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
