pub mod config;

pub use config::StoreConfig;

use std::collections::HashMap;

use crate::core::{Result, Value};

/// One result row as returned by the driver: column name to value.
pub type Row = HashMap<String, Value>;

/// Named bound parameters for a prepared statement, in bind order.
pub type Params = Vec<(String, Value)>;

/// The backing store boundary.
///
/// The mapper never talks to a database directly; it is handed an
/// implementation of this trait (a real driver, or an in-memory double in
/// tests) and issues every statement through it. All calls are blocking and
/// sequential on one shared connection.
pub trait Connection {
    /// Executes a statement that returns no rows (DDL and the like).
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Prepares and executes a statement with named bound parameters,
    /// returning zero or more rows.
    fn query(&mut self, sql: &str, params: &[(String, Value)]) -> Result<Vec<Row>>;

    /// Identity value assigned by the most recent INSERT on this connection.
    fn last_insert_id(&mut self) -> Result<i64>;

    /// Whether `table` exists in the connected database.
    fn table_exists(&mut self, table: &str) -> Result<bool>;

    /// Live column name/type pairs for `table`, in table order.
    fn describe_table(&mut self, table: &str) -> Result<Vec<(String, String)>>;
}
