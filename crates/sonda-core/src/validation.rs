use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::schema::SchemaInfo;

/// Validate internal consistency of a schema snapshot.
///
/// This checks:
/// - duplicate tables/columns
/// - primary key columns exist
/// - foreign key columns and referenced targets exist
/// - relationship endpoints name known tables
pub fn validate_schema(schema: &SchemaInfo) -> Result<()> {
    let mut catalog: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for table in &schema.tables {
        if catalog.contains_key(&table.name) {
            return Err(Error::InvalidSchema(format!(
                "duplicate table name: {}",
                table.name
            )));
        }

        let mut columns = BTreeSet::new();
        for column in &table.columns {
            if !columns.insert(column.name.clone()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {}.{}",
                    table.name, column.name
                )));
            }
        }

        catalog.insert(table.name.clone(), columns);
    }

    for table in &schema.tables {
        let columns = &catalog[&table.name];

        for column in &table.primary_key {
            if !columns.contains(column) {
                return Err(Error::InvalidSchema(format!(
                    "primary key column not found: {}.{}",
                    table.name, column
                )));
            }
        }

        for fk in &table.foreign_keys {
            if !columns.contains(&fk.column) {
                return Err(Error::InvalidSchema(format!(
                    "foreign key column not found: {}.{}",
                    table.name, fk.column
                )));
            }

            let ref_columns = catalog.get(&fk.referenced_table).ok_or_else(|| {
                Error::InvalidSchema(format!(
                    "referenced table not found: {} (from {}.{})",
                    fk.referenced_table, table.name, fk.column
                ))
            })?;

            // rowid targets are legal even though no column is declared.
            if fk.referenced_column != crate::ROWID_COLUMN
                && !ref_columns.contains(&fk.referenced_column)
            {
                return Err(Error::InvalidSchema(format!(
                    "referenced column not found: {}.{}",
                    fk.referenced_table, fk.referenced_column
                )));
            }
        }
    }

    for rel in &schema.relationships {
        for endpoint in [&rel.from_table, &rel.to_table] {
            if !catalog.contains_key(endpoint) {
                return Err(Error::InvalidSchema(format!(
                    "relationship `{}` references unknown table: {}",
                    rel.name, endpoint
                )));
            }
        }
        if let Some(junction) = &rel.junction_table {
            if !catalog.contains_key(junction) {
                return Err(Error::InvalidSchema(format!(
                    "relationship `{}` references unknown junction table: {}",
                    rel.name, junction
                )));
            }
        }
    }

    Ok(())
}
