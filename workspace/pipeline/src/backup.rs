//! Snapshots every profile table into `<table>_backup` before cleaning.

use common::{BackupOutcome, BackupStatus, ProfileTable};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::{error, info, instrument, warn};

use crate::error::{PipelineError, Result};
use crate::sql::{count_rows, quote_ident, table_exists};

/// Backs up all five tables, each in its own transaction.
#[instrument(skip_all)]
pub async fn run_backups(db: &DatabaseConnection) -> Vec<BackupOutcome> {
    let mut outcomes = Vec::with_capacity(ProfileTable::ALL.len());
    for table in ProfileTable::ALL {
        outcomes.push(backup_table(db, table).await);
    }
    outcomes
}

/// Backs up one table; an existing backup table is left untouched.
pub async fn backup_table(db: &DatabaseConnection, table: ProfileTable) -> BackupOutcome {
    let status = match snapshot(db, table).await {
        Ok(status) => status,
        Err(e) => {
            error!(table = table.table_name(), "Backup failed: {}", e);
            BackupStatus::Failed {
                error: e.to_string(),
            }
        }
    };
    BackupOutcome { table, status }
}

async fn snapshot(db: &DatabaseConnection, table: ProfileTable) -> Result<BackupStatus> {
    let txn = db.begin().await?;
    match create_backup(&txn, table).await {
        Ok(status) => {
            txn.commit().await?;
            Ok(status)
        }
        Err(e) => {
            txn.rollback().await?;
            Err(e)
        }
    }
}

async fn create_backup<C: ConnectionTrait>(conn: &C, table: ProfileTable) -> Result<BackupStatus> {
    let backup = table.backup_table_name();
    if table_exists(conn, &backup).await? {
        let rows = count_rows(conn, &backup).await?;
        warn!(
            backup = backup.as_str(),
            rows, "Backup table already exists, leaving it as is"
        );
        return Ok(BackupStatus::AlreadyPresent { rows });
    }

    let backend = conn.get_database_backend();
    conn.execute_unprepared(&format!(
        "CREATE TABLE {} AS SELECT * FROM {}",
        quote_ident(backend, &backup),
        quote_ident(backend, table.table_name())
    ))
    .await?;

    let expected = count_rows(conn, table.table_name()).await?;
    let actual = count_rows(conn, &backup).await?;
    if expected != actual {
        return Err(PipelineError::BackupMismatch {
            table: table.table_name().to_string(),
            expected,
            actual,
        });
    }

    info!(backup = backup.as_str(), rows = actual, "Backup table created");
    Ok(BackupStatus::Created { rows: actual })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_dirty_dataset, setup_db};

    #[tokio::test]
    async fn test_backup_copies_every_table() {
        let db = setup_db().await.unwrap();
        seed_dirty_dataset(&db).await.unwrap();

        let outcomes = run_backups(&db).await;
        assert_eq!(outcomes.len(), 5);
        for outcome in &outcomes {
            let source = count_rows(&db, outcome.table.table_name()).await.unwrap();
            assert_eq!(outcome.status, BackupStatus::Created { rows: source });
        }
    }

    #[tokio::test]
    async fn test_existing_backup_is_not_touched() {
        let db = setup_db().await.unwrap();
        seed_dirty_dataset(&db).await.unwrap();

        let first = backup_table(&db, ProfileTable::Logs).await;
        let BackupStatus::Created { rows } = first.status else {
            panic!("expected a fresh backup, got {:?}", first.status);
        };

        db.execute_unprepared("DELETE FROM \"logs\"").await.unwrap();
        let second = backup_table(&db, ProfileTable::Logs).await;

        assert_eq!(second.status, BackupStatus::AlreadyPresent { rows });
        assert_eq!(count_rows(&db, "logs_backup").await.unwrap(), rows);
    }
}
