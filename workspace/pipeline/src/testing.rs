//! Shared fixtures for database tests.

use chrono::{NaiveDate, NaiveDateTime};
use common::TieBreak;
use migration::{Migrator, MigratorTrait};
use model::entities::{auth, division, log, role, user};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, DbErr, Set};

use crate::CleaningContext;

pub async fn setup_db() -> Result<DatabaseConnection, DbErr> {
    // Connect to the SQLite database
    let db = Database::connect("sqlite::memory:").await?;

    // Enable foreign keys
    db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

    Migrator::up(&db, None).await.expect("Migrations failed.");
    Ok(db)
}

/// Noon on the given day of January 2024.
pub fn ts(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn test_context() -> CleaningContext {
    CleaningContext {
        today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        now: NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap(),
        tie_break: TieBreak::LowestId,
    }
}

pub async fn insert_auth<C: ConnectionTrait>(
    db: &C,
    email: Option<&str>,
    created_at: NaiveDateTime,
) -> Result<i32, DbErr> {
    let row = auth::ActiveModel {
        email: Set(email.map(str::to_string)),
        password: Set("hash".to_string()),
        created_at: Set(created_at),
        updated_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row.id)
}

/// Column values for a user row; unset columns stay NULL.
#[derive(Debug, Clone, Default)]
pub struct NewUser<'a> {
    pub auth_id: Option<i32>,
    pub username: Option<&'a str>,
    pub full_name: Option<&'a str>,
    pub phone_number: Option<&'a str>,
    pub birth_date: Option<NaiveDate>,
    pub bio: Option<&'a str>,
    pub long_bio: Option<&'a str>,
}

pub async fn insert_user<C: ConnectionTrait>(
    db: &C,
    new: NewUser<'_>,
    created_at: NaiveDateTime,
) -> Result<i32, DbErr> {
    let row = user::ActiveModel {
        auth_id: Set(new.auth_id),
        username: Set(new.username.map(str::to_string)),
        full_name: Set(new.full_name.map(str::to_string)),
        phone_number: Set(new.phone_number.map(str::to_string)),
        birth_date: Set(new.birth_date),
        bio: Set(new.bio.map(str::to_string)),
        long_bio: Set(new.long_bio.map(str::to_string)),
        created_at: Set(created_at),
        updated_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row.id)
}

pub async fn insert_role<C: ConnectionTrait>(
    db: &C,
    user_id: Option<i32>,
    label: Option<&str>,
    created_at: NaiveDateTime,
) -> Result<i32, DbErr> {
    let row = role::ActiveModel {
        user_id: Set(user_id),
        role: Set(label.map(str::to_string)),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row.id)
}

pub async fn insert_division<C: ConnectionTrait>(
    db: &C,
    user_id: Option<i32>,
    label: Option<&str>,
    created_at: NaiveDateTime,
) -> Result<i32, DbErr> {
    let row = division::ActiveModel {
        user_id: Set(user_id),
        division_name: Set(label.map(str::to_string)),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row.id)
}

pub async fn insert_log<C: ConnectionTrait>(
    db: &C,
    user_id: Option<i32>,
    action: Option<&str>,
    created_at: NaiveDateTime,
) -> Result<i32, DbErr> {
    let row = log::ActiveModel {
        user_id: Set(user_id),
        action: Set(action.map(str::to_string)),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(row.id)
}

/// Ids of the interesting rows of [`seed_dirty_dataset`].
#[derive(Debug, Clone, Copy)]
pub struct DirtyDataset {
    /// `"A@Test.com "`, earlier than `alice_dup_auth`.
    pub alice_auth: i32,
    /// `"a@test.com"`, loses to `alice_auth`.
    pub alice_dup_auth: i32,
    pub alice: i32,
    /// Bound to `alice_dup_auth`, orphaned once it is gone.
    pub alice_dup: i32,
    /// Phone `"555-1234"` and birth date 2999-01-01.
    pub bob: i32,
    /// Bound to an invalid email, orphaned in step 2.
    pub ghost: i32,
    /// `"CAROL"`, earlier than `carol_dup`.
    pub carol: i32,
    /// `"carol "`, loses to `carol`.
    pub carol_dup: i32,
    /// No credential at all.
    pub nobody: i32,
    /// Missing full name.
    pub erin: i32,
    /// `" Admin "` for alice, earlier than `alice_role_dup`.
    pub alice_role: i32,
    pub alice_role_dup: i32,
    /// Role of `ghost`.
    pub ghost_role: i32,
    pub bob_role: i32,
    pub alice_division: i32,
    pub alice_division_dup: i32,
    pub alice_log: i32,
}

/// Seeds one example of every defect the cleaning stage repairs.
pub async fn seed_dirty_dataset<C: ConnectionTrait>(db: &C) -> Result<DirtyDataset, DbErr> {
    let alice_auth = insert_auth(db, Some("A@Test.com "), ts(1)).await?;
    let alice_dup_auth = insert_auth(db, Some("a@test.com"), ts(2)).await?;
    let bob_auth = insert_auth(db, Some("bob@example.org"), ts(1)).await?;
    let ghost_auth = insert_auth(db, Some("not-an-email"), ts(1)).await?;
    insert_auth(db, None, ts(1)).await?;
    let carol_auth = insert_auth(db, Some("carol@example.com"), ts(3)).await?;
    let carol_dup_auth = insert_auth(db, Some("dave@example.net"), ts(4)).await?;
    let erin_auth = insert_auth(db, Some("erin@example.com"), ts(5)).await?;

    let alice = insert_user(
        db,
        NewUser {
            auth_id: Some(alice_auth),
            username: Some("Alice "),
            full_name: Some(" Alice   Smith "),
            phone_number: Some("+1 (234) 567-8900"),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1),
            bio: Some("  hi  "),
            long_bio: Some("   "),
        },
        ts(1),
    )
    .await?;
    let alice_dup = insert_user(
        db,
        NewUser {
            auth_id: Some(alice_dup_auth),
            username: Some("alice2"),
            full_name: Some("Alice Dup"),
            ..Default::default()
        },
        ts(2),
    )
    .await?;
    let bob = insert_user(
        db,
        NewUser {
            auth_id: Some(bob_auth),
            username: Some("bob"),
            full_name: Some("Bob"),
            phone_number: Some("555-1234"),
            birth_date: NaiveDate::from_ymd_opt(2999, 1, 1),
            ..Default::default()
        },
        ts(2),
    )
    .await?;
    let ghost = insert_user(
        db,
        NewUser {
            auth_id: Some(ghost_auth),
            username: Some("ghost"),
            full_name: Some("Ghost"),
            ..Default::default()
        },
        ts(2),
    )
    .await?;
    let carol = insert_user(
        db,
        NewUser {
            auth_id: Some(carol_auth),
            username: Some("CAROL"),
            full_name: Some("Carol"),
            ..Default::default()
        },
        ts(3),
    )
    .await?;
    let carol_dup = insert_user(
        db,
        NewUser {
            auth_id: Some(carol_dup_auth),
            username: Some("carol "),
            full_name: Some("Carol Again"),
            ..Default::default()
        },
        ts(4),
    )
    .await?;
    let nobody = insert_user(
        db,
        NewUser {
            username: Some("nobody"),
            full_name: Some("No Body"),
            ..Default::default()
        },
        ts(4),
    )
    .await?;
    let erin = insert_user(
        db,
        NewUser {
            auth_id: Some(erin_auth),
            username: Some("erin"),
            ..Default::default()
        },
        ts(5),
    )
    .await?;

    let alice_role = insert_role(db, Some(alice), Some(" Admin "), ts(1)).await?;
    let alice_role_dup = insert_role(db, Some(alice), Some("admin"), ts(2)).await?;
    let ghost_role = insert_role(db, Some(ghost), Some("viewer"), ts(2)).await?;
    insert_role(db, Some(bob), Some(""), ts(2)).await?;
    let bob_role = insert_role(db, Some(bob), Some("editor"), ts(3)).await?;

    let alice_division = insert_division(db, Some(alice), Some("Research  Lab"), ts(1)).await?;
    let alice_division_dup =
        insert_division(db, Some(alice), Some(" Research Lab"), ts(2)).await?;
    insert_division(db, Some(nobody), Some("Ops"), ts(4)).await?;

    let alice_log = insert_log(db, Some(alice), Some(" LOGIN "), ts(1)).await?;
    insert_log(db, Some(alice_dup), Some("login"), ts(2)).await?;
    insert_log(db, Some(bob), None, ts(2)).await?;

    Ok(DirtyDataset {
        alice_auth,
        alice_dup_auth,
        alice,
        alice_dup,
        bob,
        ghost,
        carol,
        carol_dup,
        nobody,
        erin,
        alice_role,
        alice_role_dup,
        ghost_role,
        bob_role,
        alice_division,
        alice_division_dup,
        alice_log,
    })
}
