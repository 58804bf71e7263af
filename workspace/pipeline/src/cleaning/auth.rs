//! Steps touching the `auth` table.

use model::entities::auth;
use model::entities::prelude::Auth;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use tracing::{debug, trace};

use super::{delete_by_ids, users};
use crate::dedup::{Candidate, earliest_wins};
use crate::error::Result;
use crate::normalize::{is_valid_email, normalize_email};
use crate::CleaningContext;

/// Lowercases and trims every email.
///
/// `auth.email` is unique on the stored value, so two rows may normalize to
/// the same address. The earliest row of such a group keeps the address and
/// the others are deleted before it is rewritten; emails that trim to nothing
/// become NULL.
pub async fn normalize_emails<C: ConnectionTrait>(conn: &C, ctx: &CleaningContext) -> Result<u64> {
    trace!("Normalizing auth emails");
    let rows = Auth::find().order_by_asc(auth::Column::Id).all(conn).await?;

    let mut candidates = Vec::new();
    let mut blanked = Vec::new();
    for row in &rows {
        let Some(email) = row.email.as_deref() else {
            continue;
        };
        let normalized = normalize_email(email);
        if normalized.is_empty() {
            blanked.push(row.id);
        } else {
            candidates.push(Candidate::new(row.id, normalized, row.created_at));
        }
    }

    let plan = earliest_wins(candidates, ctx.tie_break);
    let mut affected = delete_by_ids::<Auth, _>(conn, auth::Column::Id, &plan.discarded).await?;
    debug!("Removed {} auth rows colliding after normalization", affected);

    let current: HashMap<i32, Option<&str>> =
        rows.iter().map(|r| (r.id, r.email.as_deref())).collect();
    for survivor in &plan.survivors {
        if current.get(&survivor.id).copied().flatten() == Some(survivor.key.as_str()) {
            continue;
        }
        affected += set_email(conn, ctx, survivor.id, Some(survivor.key.clone())).await?;
    }
    for id in blanked {
        affected += set_email(conn, ctx, id, None).await?;
    }

    Ok(affected)
}

async fn set_email<C: ConnectionTrait>(
    conn: &C,
    ctx: &CleaningContext,
    id: i32,
    email: Option<String>,
) -> Result<u64> {
    let result = Auth::update_many()
        .col_expr(auth::Column::Email, Expr::value(email))
        .col_expr(auth::Column::UpdatedAt, Expr::value(ctx.now))
        .filter(auth::Column::Id.eq(id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Deletes credentials whose email is missing or does not look like `local@domain.tld`.
pub async fn drop_invalid_emails<C: ConnectionTrait>(conn: &C) -> Result<u64> {
    let invalid: Vec<i32> = Auth::find()
        .all(conn)
        .await?
        .into_iter()
        .filter(|row| !row.email.as_deref().is_some_and(is_valid_email))
        .map(|row| row.id)
        .collect();
    debug!("Found {} auth rows with invalid email", invalid.len());
    delete_by_ids::<Auth, _>(conn, auth::Column::Id, &invalid).await
}

/// Earliest-wins over the stored email, then sweeps the users it orphaned.
pub async fn deduplicate_by_email<C: ConnectionTrait>(
    conn: &C,
    ctx: &CleaningContext,
) -> Result<u64> {
    let candidates = Auth::find()
        .all(conn)
        .await?
        .into_iter()
        .filter_map(|row| {
            row.email
                .map(|email| Candidate::new(row.id, email, row.created_at))
        });

    let plan = earliest_wins(candidates, ctx.tie_break);
    if plan.is_noop() {
        return Ok(0);
    }

    let deleted = delete_by_ids::<Auth, _>(conn, auth::Column::Id, &plan.discarded).await?;
    let orphaned = users::delete_orphans(conn).await?;
    debug!(
        "Removed {} duplicate auth rows and {} users left without credentials",
        deleted, orphaned
    );
    Ok(deleted + orphaned)
}
