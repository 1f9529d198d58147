pub mod query;
pub mod store;

pub use query::{Conditions, Operator, WhereClause};
pub use store::Store;

use crate::core::{OrmError, Result, Value};
use crate::schema::{EntityDescriptor, IDENTITY_COLUMN};

/// Per-instance persistence state, embedded in every entity.
#[derive(Debug, Clone, Default)]
pub struct RecordState {
    /// True only after the instance has been hydrated from a stored row.
    pub populated: bool,
    /// Last persistence failure observed by `Store::save`.
    pub last_error: Option<OrmError>,
}

/// The entity surface the mapper works against.
///
/// An implementation supplies the resolved field-descriptor list for its
/// type and column-addressed access to its fields; the mapper never inspects
/// the type beyond that. `Default` stands in for construction: retrieval
/// operations build a fresh default instance per returned row and populate
/// it.
pub trait Record: Default {
    /// Resolved field descriptors for this entity type, built once per
    /// process and cached (typically behind `lazy_static`).
    fn descriptor() -> &'static EntityDescriptor;

    /// Reads the value of the field mapped to `column`. Unknown columns
    /// read as `Value::Null`.
    fn read_column(&self, column: &str) -> Value;

    /// Writes a loaded value into the field mapped to `column`. Unknown
    /// columns are ignored.
    fn write_column(&mut self, column: &str, value: Value);

    fn state(&self) -> &RecordState;

    fn state_mut(&mut self) -> &mut RecordState;

    /// The identity value; zero is the not-yet-stored sentinel.
    fn identity(&self) -> i64 {
        self.read_column(IDENTITY_COLUMN).as_i64().unwrap_or(0)
    }

    /// Adopts a store-assigned identity value.
    fn set_identity(&mut self, id: i64) {
        self.write_column(IDENTITY_COLUMN, Value::Integer(id));
    }

    /// Cascade hook, run before the entity's own row is written: save any
    /// referenced entity whose identity is still the zero sentinel, then
    /// mirror the referenced identities into the foreign-key fields.
    /// The default is for entities without reference fields.
    fn save_references(&mut self, _store: &mut Store) -> Result<()> {
        Ok(())
    }

    /// Eager-load hook, run after the entity is populated: resolve
    /// referenced entities by their stored identities, recursing at most
    /// `depth` levels (at 0, foreign ids stay unresolved).
    /// The default is for entities without reference fields.
    fn load_references(&mut self, _store: &mut Store, _depth: u32) -> Result<()> {
        Ok(())
    }
}
