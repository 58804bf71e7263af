//! Index rebuild and planner statistics refresh.

use common::{MaintenanceOutcome, MaintenanceReport, ProfileTable};
use sea_orm::{ConnectionTrait, DbBackend};
use tracing::{error, info, instrument};

use crate::error::{PipelineError, Result};
use crate::sql::quote_ident;

/// The `REINDEX` and `ANALYZE` statements for `table` on `backend`.
pub fn maintenance_statements(backend: DbBackend, table: ProfileTable) -> Result<[String; 2]> {
    let name = quote_ident(backend, table.table_name());
    match backend {
        DbBackend::Postgres => Ok([format!("REINDEX TABLE {name}"), format!("ANALYZE {name}")]),
        DbBackend::Sqlite => Ok([format!("REINDEX {name}"), format!("ANALYZE {name}")]),
        DbBackend::MySql => Err(PipelineError::UnsupportedBackend("MySQL".to_string())),
    }
}

pub async fn maintain_table<C: ConnectionTrait>(conn: &C, table: ProfileTable) -> Result<()> {
    for statement in maintenance_statements(conn.get_database_backend(), table)? {
        conn.execute_unprepared(&statement).await?;
    }
    Ok(())
}

/// Rebuilds indexes and refreshes statistics of every table, each attempted independently.
#[instrument(skip_all)]
pub async fn run_maintenance<C: ConnectionTrait>(conn: &C) -> MaintenanceReport {
    let mut report = MaintenanceReport::default();
    for table in ProfileTable::ALL {
        let error = match maintain_table(conn, table).await {
            Ok(()) => {
                info!(table = table.table_name(), "Indexes rebuilt and statistics refreshed");
                None
            }
            Err(e) => {
                error!(table = table.table_name(), "Maintenance failed: {}", e);
                Some(e.to_string())
            }
        };
        report.tables.push(MaintenanceOutcome { table, error });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_dirty_dataset, setup_db};

    #[test]
    fn test_statements_per_backend() {
        let [reindex, analyze] =
            maintenance_statements(DbBackend::Postgres, ProfileTable::Users).unwrap();
        assert_eq!(reindex, "REINDEX TABLE \"users\"");
        assert_eq!(analyze, "ANALYZE \"users\"");

        let [reindex, _] = maintenance_statements(DbBackend::Sqlite, ProfileTable::Auth).unwrap();
        assert_eq!(reindex, "REINDEX \"auth\"");

        assert!(matches!(
            maintenance_statements(DbBackend::MySql, ProfileTable::Logs),
            Err(PipelineError::UnsupportedBackend(_))
        ));
    }

    #[tokio::test]
    async fn test_maintenance_on_sqlite() {
        let db = setup_db().await.unwrap();
        seed_dirty_dataset(&db).await.unwrap();

        let report = run_maintenance(&db).await;

        assert_eq!(report.tables.len(), 5);
        assert!(report.tables.iter().all(|t| t.error.is_none()), "{report}");
    }
}
