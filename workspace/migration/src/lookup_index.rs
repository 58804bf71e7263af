use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{EntityName, EntityTrait, IdenStatic};

/// A single-column index named after the entity column it covers.
#[derive(Debug, Clone)]
pub struct LookupIndex {
    pub name: &'static str,
    table: String,
    column: String,
}

impl LookupIndex {
    /// Index `name` on `column` of entity `E`.
    pub fn on<E: EntityTrait>(name: &'static str, column: E::Column) -> Self {
        Self {
            name,
            table: E::default().table_name().to_string(),
            column: column.as_str().to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn create_statement(&self) -> IndexCreateStatement {
        Index::create()
            .name(self.name)
            .table(Alias::new(self.table.as_str()))
            .col(Alias::new(self.column.as_str()))
            .if_not_exists()
            .to_owned()
    }

    pub fn drop_statement(&self) -> IndexDropStatement {
        Index::drop()
            .name(self.name)
            .table(Alias::new(self.table.as_str()))
            .to_owned()
    }
}
