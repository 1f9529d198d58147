use std::collections::HashSet;

use log::warn;

use crate::connection::{Connection, Row, StoreConfig};
use crate::core::{OrmError, Result, Value};
use crate::record::Record;
use crate::record::query::{self, Conditions};
use crate::schema::sync::{self, SyncReport};
use crate::schema::{EntityDescriptor, IDENTITY_COLUMN, SchemaSnapshot, mapping};

/// The store handle: one synchronous connection plus the policy
/// configuration, threaded explicitly into every operation.
///
/// Schema synchronization runs lazily before the first data operation per
/// entity type (and not at all when the store is frozen); everything else is
/// a plain data statement against the shared connection.
pub struct Store {
    conn: Box<dyn Connection>,
    config: StoreConfig,
    synced: HashSet<String>,
}

impl Store {
    /// Opens a store over an injected driver connection.
    pub fn open(conn: Box<dyn Connection>, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            conn,
            config,
            synced: HashSet::new(),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Runs a full synchronization cycle for `T` and reports what it did.
    ///
    /// On a frozen store this is a no-op that issues no statements.
    pub fn sync_schema<T: Record>(&mut self) -> Result<SyncReport> {
        let descriptor = T::descriptor();
        let snapshot = SchemaSnapshot::of(descriptor);
        if self.config.frozen {
            return Ok(SyncReport::frozen(
                descriptor.table.clone(),
                snapshot.fingerprint(),
            ));
        }
        let report = sync::synchronize(self.conn.as_mut(), &snapshot)?;
        self.synced.insert(descriptor.table.clone());
        Ok(report)
    }

    /// Best-effort synchronization gate in front of data operations: runs
    /// the cycle once per type per store, and never fails the operation.
    fn ensure_schema<T: Record>(&mut self) {
        let descriptor = T::descriptor();
        if self.config.frozen || self.synced.contains(&descriptor.table) {
            return;
        }
        if let Err(e) = self.sync_schema::<T>() {
            warn!(
                "schema synchronization for '{}' failed: {}",
                descriptor.table, e
            );
        }
    }

    /// Saves the entity: INSERT when the identity is the zero sentinel
    /// (adopting the store-assigned identity afterwards), UPDATE keyed by
    /// the identity otherwise.
    ///
    /// Persistence failures never propagate; they land in the instance's
    /// `last_error` slot and the return value reports the outcome.
    pub fn save<T: Record>(&mut self, entity: &mut T) -> bool {
        self.ensure_schema::<T>();
        entity.state_mut().last_error = None;

        if let Err(e) = entity.save_references(self) {
            warn!(
                "cascade save failed for table '{}': {}",
                T::descriptor().table,
                e
            );
            entity.state_mut().last_error = Some(e);
            return false;
        }

        match self.save_row(entity) {
            Ok(()) => true,
            Err(e) => {
                warn!("save failed for table '{}': {}", T::descriptor().table, e);
                entity.state_mut().last_error = Some(e);
                false
            }
        }
    }

    fn save_row<T: Record>(&mut self, entity: &mut T) -> Result<()> {
        let descriptor = T::descriptor();
        let id = entity.identity();

        // The identity column never enters the mutable column set.
        let mut columns: Vec<String> = Vec::new();
        let mut params: Vec<(String, Value)> = Vec::new();
        for (ordinal, field) in descriptor.mutable().enumerate() {
            let value = mapping::to_column_value(field, entity.read_column(&field.column))?;
            columns.push(field.column.clone());
            params.push((format!("{}_{}", field.column, ordinal), value));
        }

        if id == 0 {
            let placeholders: Vec<String> =
                params.iter().map(|(name, _)| format!(":{}", name)).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                descriptor.table,
                columns.join(", "),
                placeholders.join(", ")
            );
            self.conn.query(&sql, &params)?;
            let assigned = self.conn.last_insert_id()?;
            entity.set_identity(assigned);
        } else {
            let assignments: Vec<String> = columns
                .iter()
                .zip(params.iter())
                .map(|(column, (name, _))| format!("{} = :{}", column, name))
                .collect();
            let key = format!("{}_{}", IDENTITY_COLUMN, params.len());
            let sql = format!(
                "UPDATE {} SET {} WHERE {} = :{}",
                descriptor.table,
                assignments.join(", "),
                IDENTITY_COLUMN,
                key
            );
            params.push((key, Value::Integer(id)));
            self.conn.query(&sql, &params)?;
        }
        Ok(())
    }

    /// Applies load-side coercions for every non-ignored column present in
    /// `row` and marks the instance populated. Columns absent from the row
    /// keep their current in-memory value.
    pub fn populate<T: Record>(&self, entity: &mut T, row: &Row) -> Result<()> {
        for field in T::descriptor().persisted() {
            if let Some(value) = row.get(&field.column) {
                let value = mapping::from_column_value(field, value.clone())?;
                entity.write_column(&field.column, value);
            }
        }
        entity.state_mut().populated = true;
        Ok(())
    }

    pub fn get_by_id<T: Record>(&mut self, id: i64) -> Result<Option<T>> {
        self.load_related(id, self.config.relation_depth)
    }

    /// Depth-aware fetch by identity, for use inside
    /// [`Record::load_references`] hooks: pass `depth - 1` so resolution
    /// stops at the configured bound.
    pub fn load_related<T: Record>(&mut self, id: i64, depth: u32) -> Result<Option<T>> {
        self.ensure_schema::<T>();
        let descriptor = T::descriptor();
        let sql = format!(
            "{} WHERE {} = :{}_0",
            select_base(descriptor),
            IDENTITY_COLUMN,
            IDENTITY_COLUMN
        );
        let params = vec![(format!("{}_0", IDENTITY_COLUMN), Value::Integer(id))];
        let rows = self.conn.query(&sql, &params)?;
        match rows.into_iter().next() {
            None => Ok(None),
            Some(row) => Ok(Some(self.hydrate(&row, depth)?)),
        }
    }

    pub fn first<T: Record>(&mut self) -> Result<Option<T>> {
        self.ensure_schema::<T>();
        let sql = format!(
            "{} ORDER BY {} {}",
            select_base(T::descriptor()),
            IDENTITY_COLUMN,
            query::pagination(1, 1)
        );
        let rows = self.conn.query(&sql, &[])?;
        match rows.into_iter().next() {
            None => Ok(None),
            Some(row) => Ok(Some(self.hydrate(&row, self.config.relation_depth)?)),
        }
    }

    /// Lists a page of rows in identity order; `page` is 1-based.
    pub fn list<T: Record>(&mut self, page: usize, page_size: usize) -> Result<Vec<T>> {
        self.ensure_schema::<T>();
        let sql = format!(
            "{} ORDER BY {} {}",
            select_base(T::descriptor()),
            IDENTITY_COLUMN,
            query::pagination(page, page_size)
        );
        let rows = self.conn.query(&sql, &[])?;
        self.hydrate_all(rows)
    }

    /// Finds rows matching a simple column/value equality map.
    pub fn find_by<T: Record>(&mut self, conditions: &[(&str, Value)]) -> Result<Vec<T>> {
        // Conditions are validated before any statement is built or issued.
        let clause = query::translate(T::descriptor(), &Conditions::equality(conditions))?;
        self.ensure_schema::<T>();
        let mut sql = select_base(T::descriptor());
        if !clause.sql.is_empty() {
            sql = format!("{} {}", sql, clause.sql);
        }
        let sql = format!("{} ORDER BY {}", sql, IDENTITY_COLUMN);
        let rows = self.conn.query(&sql, &clause.params)?;
        self.hydrate_all(rows)
    }

    /// Finds a page of rows matching ordered `(column, operator, value)`
    /// clauses; `page` is 1-based.
    pub fn find_where<T: Record>(
        &mut self,
        clauses: &[(&str, &str, Value)],
        page: usize,
        page_size: usize,
    ) -> Result<Vec<T>> {
        let clause = query::translate(T::descriptor(), &Conditions::clauses(clauses))?;
        self.ensure_schema::<T>();
        let mut sql = select_base(T::descriptor());
        if !clause.sql.is_empty() {
            sql = format!("{} {}", sql, clause.sql);
        }
        let sql = format!(
            "{} ORDER BY {} {}",
            sql,
            IDENTITY_COLUMN,
            query::pagination(page, page_size)
        );
        let rows = self.conn.query(&sql, &clause.params)?;
        self.hydrate_all(rows)
    }

    /// Sets one column on one row, keyed by identity. The column is
    /// validated against the allowed set before any SQL is built.
    pub fn update_field<T: Record>(&mut self, id: i64, field: &str, value: Value) -> Result<()> {
        let descriptor = T::descriptor();
        let fd = descriptor.require_column(field)?;
        if fd.is_identity() {
            return Err(OrmError::InvalidCondition(
                "the identity column cannot be updated".to_string(),
            ));
        }
        let value = mapping::to_column_value(fd, value)?;

        self.ensure_schema::<T>();
        let sql = format!(
            "UPDATE {} SET {} = :{}_0 WHERE {} = :{}_1",
            descriptor.table, fd.column, fd.column, IDENTITY_COLUMN, IDENTITY_COLUMN
        );
        let params = vec![
            (format!("{}_0", fd.column), value),
            (format!("{}_1", IDENTITY_COLUMN), Value::Integer(id)),
        ];
        self.conn.query(&sql, &params)?;
        Ok(())
    }

    pub fn delete<T: Record>(&mut self, id: i64) -> Result<()> {
        self.ensure_schema::<T>();
        let sql = format!(
            "DELETE FROM {} WHERE {} = :{}_0",
            T::descriptor().table,
            IDENTITY_COLUMN,
            IDENTITY_COLUMN
        );
        let params = vec![(format!("{}_0", IDENTITY_COLUMN), Value::Integer(id))];
        self.conn.query(&sql, &params)?;
        Ok(())
    }

    /// Deletes a group of rows in one statement. An empty id list is a
    /// no-op.
    pub fn delete_group<T: Record>(&mut self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.ensure_schema::<T>();
        let mut placeholders = Vec::with_capacity(ids.len());
        let mut params = Vec::with_capacity(ids.len());
        for (ordinal, id) in ids.iter().enumerate() {
            let name = format!("{}_{}", IDENTITY_COLUMN, ordinal);
            placeholders.push(format!(":{}", name));
            params.push((name, Value::Integer(*id)));
        }
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            T::descriptor().table,
            IDENTITY_COLUMN,
            placeholders.join(", ")
        );
        self.conn.query(&sql, &params)?;
        Ok(())
    }

    fn hydrate<T: Record>(&mut self, row: &Row, depth: u32) -> Result<T> {
        let mut entity = T::default();
        self.populate(&mut entity, row)?;
        entity.load_references(self, depth)?;
        Ok(entity)
    }

    fn hydrate_all<T: Record>(&mut self, rows: Vec<Row>) -> Result<Vec<T>> {
        let depth = self.config.relation_depth;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.hydrate(&row, depth)?);
        }
        Ok(out)
    }
}

/// SELECT with the explicit non-ignored projection, identity included.
fn select_base(descriptor: &EntityDescriptor) -> String {
    let columns: Vec<&str> = descriptor.persisted().map(|f| f.column.as_str()).collect();
    format!("SELECT {} FROM {}", columns.join(", "), descriptor.table)
}
