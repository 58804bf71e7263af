//! Row-count summary of the profile tables and any backups.

use common::{ProfileTable, RowCountReport, TableCount};
use sea_orm::ConnectionTrait;
use tracing::trace;

use crate::error::Result;
use crate::sql::{count_rows, table_exists};

/// Counts rows of the five tables, followed by every backup table that exists.
pub async fn row_counts<C: ConnectionTrait>(conn: &C) -> Result<RowCountReport> {
    let mut report = RowCountReport::default();
    for table in ProfileTable::ALL {
        report.tables.push(TableCount {
            table: table.table_name().to_string(),
            rows: count_rows(conn, table.table_name()).await?,
        });
    }
    for table in ProfileTable::ALL {
        let backup = table.backup_table_name();
        if table_exists(conn, &backup).await? {
            let rows = count_rows(conn, &backup).await?;
            report.tables.push(TableCount { table: backup, rows });
        } else {
            trace!("No backup for {}", table);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::backup_table;
    use crate::testing::{seed_dirty_dataset, setup_db};

    #[tokio::test]
    async fn test_row_counts_include_existing_backups() {
        let db = setup_db().await.unwrap();
        seed_dirty_dataset(&db).await.unwrap();

        let before = row_counts(&db).await.unwrap();
        assert_eq!(before.tables.len(), 5);
        assert_eq!(before.rows("auth"), Some(8));
        assert_eq!(before.rows("users"), Some(8));
        assert_eq!(before.rows("roles"), Some(5));
        assert_eq!(before.rows("divisions"), Some(3));
        assert_eq!(before.rows("logs"), Some(3));

        backup_table(&db, ProfileTable::Roles).await;
        let after = row_counts(&db).await.unwrap();
        assert_eq!(after.tables.len(), 6);
        assert_eq!(after.rows("roles_backup"), Some(5));
        assert_eq!(after.rows("users_backup"), None);
    }
}
