// Shared test support: an in-memory driver double for the Connection trait.
#![allow(dead_code)]


use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use regex::Regex;
use rustormdb::{Connection, OrmError, Result, Row, Value};

#[derive(Debug)]
struct MemTable {
    columns: Vec<(String, String)>,
    rows: Vec<Row>,
    next_id: i64,
}

impl MemTable {
    fn new(columns: Vec<(String, String)>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(c, _)| c == name)
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, MemTable>,
    statements: Vec<String>,
    fail_patterns: Vec<String>,
    last_insert_id: i64,
}

/// In-memory stand-in for a database driver.
///
/// It interprets exactly the statement shapes the mapper emits (CREATE/ALTER
/// DDL, INSERT/UPDATE/DELETE/SELECT with named parameters) and records every
/// statement that reaches it. Clones share state, so a test can keep a
/// handle for assertions while the store owns the connection.
#[derive(Clone, Default)]
pub struct MemoryConnection {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Every statement that reached the connection, in order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Only the schema statements (CREATE/ALTER) that reached the connection.
    pub fn ddl_statements(&self) -> Vec<String> {
        self.lock()
            .statements
            .iter()
            .filter(|s| s.starts_with("CREATE") || s.starts_with("ALTER"))
            .cloned()
            .collect()
    }

    /// Statements whose SQL text contains `needle`.
    pub fn statements_containing(&self, needle: &str) -> Vec<String> {
        self.lock()
            .statements
            .iter()
            .filter(|s| s.contains(needle))
            .cloned()
            .collect()
    }

    pub fn clear_statements(&self) {
        self.lock().statements.clear();
    }

    /// Any statement containing `pattern` fails from now on.
    pub fn fail_on(&self, pattern: &str) {
        self.lock().fail_patterns.push(pattern.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().fail_patterns.clear();
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn columns(&self, table: &str) -> Vec<(String, String)> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.lock().tables.contains_key(table)
    }

    /// Test hook simulating external table loss (dropped metadata etc.).
    pub fn remove_table(&self, table: &str) {
        self.lock().tables.remove(table);
    }

    /// The stored fingerprint for `table`, straight out of schema_info.
    pub fn stored_hash(&self, table: &str) -> Option<String> {
        let inner = self.lock();
        let meta = inner.tables.get("schema_info")?;
        meta.rows
            .iter()
            .find(|r| r.get("table_name").and_then(|v| v.as_str()) == Some(table))
            .and_then(|r| r.get("schema_hash"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

impl Connection for MemoryConnection {
    fn execute(&mut self, sql: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.observe(sql)?;
        inner.run_ddl(sql)
    }

    fn query(&mut self, sql: &str, params: &[(String, Value)]) -> Result<Vec<Row>> {
        let mut inner = self.lock();
        inner.observe(sql)?;
        inner.run_statement(sql, params)
    }

    fn last_insert_id(&mut self) -> Result<i64> {
        Ok(self.lock().last_insert_id)
    }

    fn table_exists(&mut self, table: &str) -> Result<bool> {
        Ok(self.lock().tables.contains_key(table))
    }

    fn describe_table(&mut self, table: &str) -> Result<Vec<(String, String)>> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| OrmError::Connection(format!("no such table '{}'", table)))
    }
}

impl Inner {
    fn observe(&mut self, sql: &str) -> Result<()> {
        self.statements.push(sql.to_string());
        if self.fail_patterns.iter().any(|p| sql.contains(p)) {
            return Err(OrmError::Connection(format!("injected failure: {}", sql)));
        }
        Ok(())
    }

    fn run_ddl(&mut self, sql: &str) -> Result<()> {
        if let Some(rest) = sql.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
            let open = rest
                .find('(')
                .ok_or_else(|| OrmError::Connection("malformed CREATE".to_string()))?;
            let close = rest
                .rfind(')')
                .ok_or_else(|| OrmError::Connection("malformed CREATE".to_string()))?;
            let table = rest[..open].trim().to_string();
            if self.tables.contains_key(&table) {
                return Ok(());
            }
            let mut columns = Vec::new();
            for segment in split_top_level_commas(&rest[open + 1..close]) {
                let segment = segment.trim();
                if segment.is_empty() {
                    continue;
                }
                let (name, ty) = match segment.split_once(char::is_whitespace) {
                    Some((name, ty)) => (name.to_string(), ty.trim().to_string()),
                    None => (segment.to_string(), String::new()),
                };
                columns.push((name, ty));
            }
            self.tables.insert(table, MemTable::new(columns));
            return Ok(());
        }

        if let Some(rest) = sql.strip_prefix("ALTER TABLE ") {
            let mut parts = rest.splitn(4, ' ');
            let table = parts.next().unwrap_or_default();
            let verb = parts.next().unwrap_or_default();
            let column = parts.next().unwrap_or_default().to_string();
            let ty = parts.next().unwrap_or_default().to_string();
            let mem = self
                .tables
                .get_mut(table)
                .ok_or_else(|| OrmError::Connection(format!("no such table '{}'", table)))?;
            match verb {
                "ADD" => {
                    if mem.has_column(&column) {
                        return Err(OrmError::Connection(format!(
                            "duplicate column '{}'",
                            column
                        )));
                    }
                    mem.columns.push((column, ty));
                    Ok(())
                }
                "MODIFY" => {
                    match mem.columns.iter_mut().find(|(c, _)| *c == column) {
                        Some(slot) => {
                            slot.1 = ty;
                            Ok(())
                        }
                        None => Err(OrmError::Connection(format!("no column '{}'", column))),
                    }
                }
                other => Err(OrmError::Connection(format!(
                    "unsupported ALTER verb '{}'",
                    other
                ))),
            }
        } else {
            Err(OrmError::Connection(format!(
                "unsupported statement: {}",
                sql
            )))
        }
    }

    fn run_statement(&mut self, sql: &str, params: &[(String, Value)]) -> Result<Vec<Row>> {
        let bound: HashMap<&str, &Value> =
            params.iter().map(|(name, value)| (name.as_str(), value)).collect();

        if sql.starts_with("INSERT INTO ") {
            self.run_insert(sql, &bound).map(|_| Vec::new())
        } else if sql.starts_with("UPDATE ") {
            self.run_update(sql, &bound).map(|_| Vec::new())
        } else if sql.starts_with("DELETE FROM ") {
            self.run_delete(sql, &bound).map(|_| Vec::new())
        } else if sql.starts_with("SELECT ") {
            self.run_select(sql, &bound)
        } else {
            Err(OrmError::Connection(format!(
                "unsupported statement: {}",
                sql
            )))
        }
    }

    fn run_insert(&mut self, sql: &str, bound: &HashMap<&str, &Value>) -> Result<()> {
        let rest = sql.strip_prefix("INSERT INTO ").unwrap();
        let open = rest
            .find('(')
            .ok_or_else(|| OrmError::Connection("malformed INSERT".to_string()))?;
        let table = rest[..open].trim().to_string();
        let columns_end = rest[open + 1..]
            .find(')')
            .ok_or_else(|| OrmError::Connection("malformed INSERT".to_string()))?
            + open
            + 1;
        let columns: Vec<&str> = rest[open + 1..columns_end]
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();

        let values_open = rest[columns_end..]
            .find('(')
            .ok_or_else(|| OrmError::Connection("malformed INSERT".to_string()))?
            + columns_end;
        let values_close = rest
            .rfind(')')
            .ok_or_else(|| OrmError::Connection("malformed INSERT".to_string()))?;
        let placeholders: Vec<&str> = rest[values_open + 1..values_close]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if columns.len() != placeholders.len() {
            return Err(OrmError::Connection("malformed INSERT".to_string()));
        }

        let mut row = Row::new();
        for (column, placeholder) in columns.iter().zip(placeholders.iter()) {
            row.insert(
                column.to_string(),
                lookup(bound, placeholder)?.clone(),
            );
        }

        let mem = self
            .tables
            .get_mut(&table)
            .ok_or_else(|| OrmError::Connection(format!("no such table '{}'", table)))?;
        if mem.has_column("id") && !row.contains_key("id") {
            let id = mem.next_id;
            mem.next_id += 1;
            row.insert("id".to_string(), Value::Integer(id));
            self.last_insert_id = id;
        }
        mem.rows.push(row);
        Ok(())
    }

    fn run_update(&mut self, sql: &str, bound: &HashMap<&str, &Value>) -> Result<()> {
        let rest = sql.strip_prefix("UPDATE ").unwrap();
        let (table, rest) = rest
            .split_once(" SET ")
            .ok_or_else(|| OrmError::Connection("malformed UPDATE".to_string()))?;
        let (assignments, predicates) = match rest.split_once(" WHERE ") {
            Some((a, w)) => (a, parse_predicates(w)?),
            None => (rest, Vec::new()),
        };

        let mut updates: Vec<(String, Value)> = Vec::new();
        for assignment in assignments.split(", ") {
            let (column, placeholder) = assignment
                .split_once(" = ")
                .ok_or_else(|| OrmError::Connection("malformed UPDATE".to_string()))?;
            updates.push((column.to_string(), lookup(bound, placeholder)?.clone()));
        }

        let mem = self
            .tables
            .get_mut(table)
            .ok_or_else(|| OrmError::Connection(format!("no such table '{}'", table)))?;
        for row in mem.rows.iter_mut() {
            if matches_all(row, &predicates, bound)? {
                for (column, value) in &updates {
                    row.insert(column.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    fn run_delete(&mut self, sql: &str, bound: &HashMap<&str, &Value>) -> Result<()> {
        let rest = sql.strip_prefix("DELETE FROM ").unwrap();
        let (table, clause) = rest
            .split_once(" WHERE ")
            .ok_or_else(|| OrmError::Connection("malformed DELETE".to_string()))?;

        let mem = self
            .tables
            .get_mut(table)
            .ok_or_else(|| OrmError::Connection(format!("no such table '{}'", table)))?;

        if let Some((column, list)) = clause.split_once(" IN (") {
            let list = list.trim_end_matches(')');
            let mut keep = Vec::new();
            for placeholder in list.split(',').map(str::trim) {
                keep.push(lookup(bound, placeholder)?.clone());
            }
            mem.rows.retain(|row| {
                let value = row.get(column).cloned().unwrap_or(Value::Null);
                !keep.iter().any(|k| compare(&value, k) == Some(Ordering::Equal))
            });
            return Ok(());
        }

        let predicates = parse_predicates(clause)?;
        let mut failed = None;
        mem.rows.retain(|row| match matches_all(row, &predicates, bound) {
            Ok(matched) => !matched,
            Err(e) => {
                failed = Some(e);
                true
            }
        });
        match failed {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn run_select(&mut self, sql: &str, bound: &HashMap<&str, &Value>) -> Result<Vec<Row>> {
        let rest = sql.strip_prefix("SELECT ").unwrap();
        let (projection, rest) = rest
            .split_once(" FROM ")
            .ok_or_else(|| OrmError::Connection("malformed SELECT".to_string()))?;
        let columns: Vec<&str> = projection.split(',').map(str::trim).collect();

        let mut tail = rest;
        let mut limit: Option<(usize, usize)> = None;
        if let Some((head, clause)) = tail.split_once(" LIMIT ") {
            let (n, offset) = clause
                .split_once(" OFFSET ")
                .ok_or_else(|| OrmError::Connection("malformed LIMIT".to_string()))?;
            limit = Some((
                n.trim().parse().map_err(|_| OrmError::Connection("malformed LIMIT".to_string()))?,
                offset
                    .trim()
                    .parse()
                    .map_err(|_| OrmError::Connection("malformed LIMIT".to_string()))?,
            ));
            tail = head;
        }
        let mut order_by_id = false;
        if let Some((head, clause)) = tail.split_once(" ORDER BY ") {
            order_by_id = clause.trim() == "id";
            tail = head;
        }
        let (table, predicates) = match tail.split_once(" WHERE ") {
            Some((table, clause)) => (table.trim(), parse_predicates(clause)?),
            None => (tail.trim(), Vec::new()),
        };

        let mem = self
            .tables
            .get(table)
            .ok_or_else(|| OrmError::Connection(format!("no such table '{}'", table)))?;

        let mut selected: Vec<&Row> = Vec::new();
        for row in &mem.rows {
            if matches_all(row, &predicates, bound)? {
                selected.push(row);
            }
        }
        if order_by_id {
            selected.sort_by_key(|row| row.get("id").and_then(|v| v.as_i64()).unwrap_or(0));
        }

        let (take, skip) = limit.unwrap_or((usize::MAX, 0));
        Ok(selected
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|row| {
                let mut projected = Row::new();
                for column in &columns {
                    if let Some(value) = row.get(*column) {
                        projected.insert((*column).to_string(), value.clone());
                    }
                }
                projected
            })
            .collect())
    }
}

fn lookup<'a>(bound: &HashMap<&str, &'a Value>, placeholder: &str) -> Result<&'a Value> {
    let name = placeholder
        .strip_prefix(':')
        .ok_or_else(|| OrmError::Connection(format!("bad placeholder '{}'", placeholder)))?;
    bound
        .get(name)
        .copied()
        .ok_or_else(|| OrmError::Connection(format!("missing bound parameter '{}'", name)))
}

fn parse_predicates(clause: &str) -> Result<Vec<(String, String, String)>> {
    let mut predicates = Vec::new();
    for predicate in clause.split(" AND ") {
        let parts: Vec<&str> = predicate.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(OrmError::Connection(format!(
                "malformed predicate '{}'",
                predicate
            )));
        }
        predicates.push((
            parts[0].to_string(),
            parts[1].to_string(),
            parts[2].to_string(),
        ));
    }
    Ok(predicates)
}

fn matches_all(
    row: &Row,
    predicates: &[(String, String, String)],
    bound: &HashMap<&str, &Value>,
) -> Result<bool> {
    for (column, op, placeholder) in predicates {
        let lhs = row.get(column).cloned().unwrap_or(Value::Null);
        let rhs = lookup(bound, placeholder)?;
        if !eval_predicate(&lhs, op, rhs)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval_predicate(lhs: &Value, op: &str, rhs: &Value) -> Result<bool> {
    if op == "LIKE" {
        let (Some(text), Some(pattern)) = (lhs.as_str(), rhs.as_str()) else {
            return Ok(false);
        };
        return Ok(eval_like(text, pattern));
    }
    let Some(ordering) = compare(lhs, rhs) else {
        return Ok(false);
    };
    let matched = match op {
        "=" => ordering == Ordering::Equal,
        "<" => ordering == Ordering::Less,
        ">" => ordering == Ordering::Greater,
        "<=" => ordering != Ordering::Greater,
        ">=" => ordering != Ordering::Less,
        "<>" => ordering != Ordering::Equal,
        other => {
            return Err(OrmError::Connection(format!(
                "unsupported operator '{}'",
                other
            )));
        }
    };
    Ok(matched)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Integer(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Integer(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Convert a LIKE pattern to an anchored regex (`%` → `.*`, `_` → `.`).
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            c if ".*+?^${}()|[]\\".contains(c) => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
    }
    regex.push('$');
    regex
}

fn eval_like(text: &str, pattern: &str) -> bool {
    Regex::new(&like_to_regex(pattern))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

fn split_top_level_commas(input: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in input.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                result.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        result.push(current.trim().to_string());
    }

    result
}
