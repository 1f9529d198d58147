// ============================================================================
// rustormdb Library
// ============================================================================

//! Active-record style ORM with automatic schema synchronization.
//!
//! Entities declare an explicit field-descriptor list per type; the store
//! keeps the live schema converged with the declared shape (create table,
//! add column, modify column — never drop) and maps CRUD and filtered
//! queries onto parameterized SQL without hand-written statements.
//!
//! The database driver stays outside the crate: everything runs through the
//! [`Connection`] trait, so real drivers and test doubles plug in the same
//! way.
//!
//! # Example
//!
//! ```ignore
//! use rustormdb::{
//!     EntityDescriptor, FieldDescriptor, Record, RecordState, SemanticType,
//!     Store, StoreConfig, Value,
//! };
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     age: i64,
//!     state: RecordState,
//! }
//!
//! lazy_static::lazy_static! {
//!     static ref USER: EntityDescriptor = EntityDescriptor::new("User")
//!         .field(FieldDescriptor::new("db_name", SemanticType::Text))
//!         .field(FieldDescriptor::new("db_age", SemanticType::Integer));
//! }
//!
//! impl Record for User {
//!     fn descriptor() -> &'static EntityDescriptor {
//!         &USER
//!     }
//!
//!     fn read_column(&self, column: &str) -> Value {
//!         match column {
//!             "id" => Value::Integer(self.id),
//!             "name" => Value::Text(self.name.clone()),
//!             "age" => Value::Integer(self.age),
//!             _ => Value::Null,
//!         }
//!     }
//!
//!     fn write_column(&mut self, column: &str, value: Value) {
//!         match column {
//!             "id" => self.id = value.as_i64().unwrap_or(0),
//!             "name" => self.name = value.as_str().unwrap_or_default().to_string(),
//!             "age" => self.age = value.as_i64().unwrap_or(0),
//!             _ => {}
//!         }
//!     }
//!
//!     fn state(&self) -> &RecordState {
//!         &self.state
//!     }
//!
//!     fn state_mut(&mut self) -> &mut RecordState {
//!         &mut self.state
//!     }
//! }
//!
//! let mut store = Store::open(driver, StoreConfig::new("admin", "admin"))?;
//!
//! // First contact creates the table: id, name VARCHAR(255), age INT.
//! let mut alice = User { name: "Alice".into(), age: 30, ..User::default() };
//! assert!(store.save(&mut alice));
//!
//! let adults = store.find_where::<User>(&[("age", ">", Value::Integer(25))], 1, 10)?;
//! ```

pub mod connection;
pub mod core;
pub mod record;
pub mod schema;

// Re-export main types for convenience
pub use crate::core::{DATETIME_FORMAT, OrmError, Result, Value};

pub use crate::connection::{Connection, Params, Row, StoreConfig, config::DEFAULT_RELATION_DEPTH};

pub use crate::schema::{
    EntityDescriptor, FieldDescriptor, IDENTITY_COLUMN, METADATA_TABLE, STORAGE_PREFIX,
    SchemaSnapshot, SemanticType,
    sync::{DdlAttempt, SyncAction, SyncReport},
};

pub use crate::record::{Conditions, Operator, Record, RecordState, Store, WhereClause};
