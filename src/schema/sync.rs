use log::warn;

use crate::connection::Connection;
use crate::core::{Result, Value};
use crate::schema::snapshot::SchemaSnapshot;

/// Reserved metadata table holding one fingerprint per entity table.
pub const METADATA_TABLE: &str = "schema_info";

const METADATA_DDL: &str =
    "CREATE TABLE IF NOT EXISTS schema_info (table_name VARCHAR(255) PRIMARY KEY, schema_hash VARCHAR(64))";

/// What a synchronization cycle did for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// The table was absent and a CREATE TABLE was issued.
    Created,
    /// The table was present with a diverged fingerprint; ALTER statements
    /// were attempted for the diff.
    Reconciled,
    /// Fingerprint matched; no DDL issued.
    Noop,
    /// The store is frozen; the synchronizer did not run.
    Frozen,
}

/// Outcome of one attempted DDL statement.
///
/// Failures are logged and skipped rather than raised; the attempt record
/// is how a caller observes them.
#[derive(Debug, Clone)]
pub struct DdlAttempt {
    pub statement: String,
    pub error: Option<String>,
}

impl DdlAttempt {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Report for one synchronization cycle.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub table: String,
    pub fingerprint: String,
    pub action: SyncAction,
    pub attempts: Vec<DdlAttempt>,
}

impl SyncReport {
    pub fn frozen(table: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fingerprint: fingerprint.into(),
            action: SyncAction::Frozen,
            attempts: Vec::new(),
        }
    }

    pub fn failed_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| !a.succeeded()).count()
    }
}

/// The CREATE TABLE statement for a snapshot, identity column first.
pub fn create_table_sql(snapshot: &SchemaSnapshot) -> String {
    let columns: Vec<String> = snapshot
        .columns()
        .iter()
        .map(|(column, ty)| format!("{} {}", column, ty))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        snapshot.table(),
        columns.join(", ")
    )
}

/// Runs one synchronization cycle for `snapshot` against the live database.
///
/// Create when the table is absent, reconcile when the stored fingerprint
/// diverges, no-op when it matches. Every DDL statement is executed
/// independently and best-effort; the new fingerprint is persisted after all
/// statements were attempted, regardless of individual outcomes.
pub fn synchronize(conn: &mut dyn Connection, snapshot: &SchemaSnapshot) -> Result<SyncReport> {
    let table = snapshot.table();
    let fingerprint = snapshot.fingerprint();

    if !conn.table_exists(table)? {
        let attempt = attempt_ddl(conn, create_table_sql(snapshot));
        store_fingerprint(conn, table, &fingerprint);
        return Ok(SyncReport {
            table: table.to_string(),
            fingerprint,
            action: SyncAction::Created,
            attempts: vec![attempt],
        });
    }

    // A failed lookup (metadata table missing, unreadable row) counts as
    // diverged and forces a reconciliation attempt.
    if stored_fingerprint(conn, table).as_deref() == Some(fingerprint.as_str()) {
        return Ok(SyncReport {
            table: table.to_string(),
            fingerprint,
            action: SyncAction::Noop,
            attempts: Vec::new(),
        });
    }

    let live = conn.describe_table(table)?;
    let mut attempts = Vec::new();
    for (column, ty) in snapshot.columns() {
        match live.iter().find(|(name, _)| name == column) {
            None => {
                let sql = format!("ALTER TABLE {} ADD {} {}", table, column, ty);
                attempts.push(attempt_ddl(conn, sql));
            }
            Some((_, live_ty)) if !live_ty.eq_ignore_ascii_case(ty) => {
                let sql = format!("ALTER TABLE {} MODIFY {} {}", table, column, ty);
                attempts.push(attempt_ddl(conn, sql));
            }
            Some(_) => {}
        }
    }
    // Live columns absent from the snapshot are left untouched: no
    // destructive automatic migrations.

    store_fingerprint(conn, table, &fingerprint);
    Ok(SyncReport {
        table: table.to_string(),
        fingerprint,
        action: SyncAction::Reconciled,
        attempts,
    })
}

fn attempt_ddl(conn: &mut dyn Connection, statement: String) -> DdlAttempt {
    match conn.execute(&statement) {
        Ok(()) => DdlAttempt {
            statement,
            error: None,
        },
        Err(e) => {
            warn!("schema statement failed, skipping: {}: {}", statement, e);
            DdlAttempt {
                statement,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Reads the persisted fingerprint for `table`; any failure reads as "none".
fn stored_fingerprint(conn: &mut dyn Connection, table: &str) -> Option<String> {
    let rows = conn
        .query(
            "SELECT schema_hash FROM schema_info WHERE table_name = :table_name_0",
            &[("table_name_0".to_string(), Value::Text(table.to_string()))],
        )
        .ok()?;
    rows.first()?
        .get("schema_hash")?
        .as_str()
        .map(str::to_string)
}

/// Upserts the fingerprint, creating the metadata table lazily. This is the
/// last step of a cycle; a failure here leaves a stale fingerprint behind
/// and is only logged.
fn store_fingerprint(conn: &mut dyn Connection, table: &str, fingerprint: &str) {
    if let Err(e) = persist_fingerprint(conn, table, fingerprint) {
        warn!(
            "failed to persist schema fingerprint for '{}': {}",
            table, e
        );
    }
}

fn persist_fingerprint(conn: &mut dyn Connection, table: &str, fingerprint: &str) -> Result<()> {
    conn.execute(METADATA_DDL)?;

    let existing = conn.query(
        "SELECT schema_hash FROM schema_info WHERE table_name = :table_name_0",
        &[("table_name_0".to_string(), Value::Text(table.to_string()))],
    )?;

    if existing.is_empty() {
        conn.query(
            "INSERT INTO schema_info (table_name, schema_hash) VALUES (:table_name_0, :schema_hash_1)",
            &[
                ("table_name_0".to_string(), Value::Text(table.to_string())),
                (
                    "schema_hash_1".to_string(),
                    Value::Text(fingerprint.to_string()),
                ),
            ],
        )?;
    } else {
        conn.query(
            "UPDATE schema_info SET schema_hash = :schema_hash_0 WHERE table_name = :table_name_1",
            &[
                (
                    "schema_hash_0".to_string(),
                    Value::Text(fingerprint.to_string()),
                ),
                ("table_name_1".to_string(), Value::Text(table.to_string())),
            ],
        )?;
    }
    Ok(())
}
