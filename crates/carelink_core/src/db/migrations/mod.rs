//! Care store schema steps.
//!
//! The stored schema version lives in `PRAGMA user_version`. Pending steps
//! run in one transaction, so a half-migrated file is never committed.
//! After migrating, the profile tables are checked for the columns the
//! document store reads and compares on every save.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    label: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        label: "users",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        label: "profile_documents",
        sql: include_str!("0002_profile_documents.sql"),
    },
];

/// Columns every profile table must expose to the document store.
const DOCUMENT_TABLES: &[&str] = &["patients", "therapists"];
const DOCUMENT_COLUMNS: &[&str] = &["user_id", "revision", "document"];

/// Schema version this build writes.
pub fn schema_target() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings `conn` up to [`schema_target`] and verifies the profile tables.
///
/// Returns the number of steps applied.
///
/// # Errors
/// - `SchemaTooNew` when the file was written by a newer build.
/// - `MissingColumn` when a profile table was altered out of band.
pub fn migrate_schema(conn: &mut Connection) -> DbResult<usize> {
    let stored: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let target = schema_target();
    if stored > target {
        return Err(DbError::SchemaTooNew {
            found: stored,
            supported: target,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > stored)
        .collect();
    if !pending.is_empty() {
        let tx = conn.transaction()?;
        for step in &pending {
            tx.execute_batch(step.sql)?;
            tx.pragma_update(None, "user_version", step.version)?;
            info!(
                "event=db_migrate module=db status=ok version={} step={}",
                step.version, step.label
            );
        }
        tx.commit()?;
    }

    verify_document_tables(conn)?;
    Ok(pending.len())
}

fn verify_document_tables(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    for &table in DOCUMENT_TABLES {
        let columns = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(&column) = DOCUMENT_COLUMNS
            .iter()
            .find(|column| !columns.iter().any(|name| name.as_str() == **column))
        {
            return Err(DbError::MissingColumn { table, column });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SCHEMA_STEPS;

    #[test]
    fn schema_steps_are_strictly_increasing_from_one() {
        for (index, step) in SCHEMA_STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.label);
        }
    }
}
