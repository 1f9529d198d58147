use crate::core::{OrmError, Result, Value};
use crate::schema::{EntityDescriptor, FieldDescriptor, mapping};

/// Comparison operators accepted in query conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    /// Not-equal; accepted as both `<>` and `!=`, rendered as `<>`.
    Ne,
    Like,
}

impl Operator {
    /// Validates an operator token against the fixed accepted set.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "=" => Ok(Self::Eq),
            "<" => Ok(Self::Lt),
            ">" => Ok(Self::Gt),
            "<=" => Ok(Self::Le),
            ">=" => Ok(Self::Ge),
            "<>" | "!=" => Ok(Self::Ne),
            t if t.eq_ignore_ascii_case("LIKE") => Ok(Self::Like),
            other => Err(OrmError::UnknownOperator(other.to_string())),
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Ne => "<>",
            Self::Like => "LIKE",
        }
    }
}

/// A declarative condition set: either a simple column/value equality map
/// or an ordered list of `(column, operator, value)` clauses.
#[derive(Debug, Clone)]
pub enum Conditions {
    Equality(Vec<(String, Value)>),
    Clauses(Vec<(String, String, Value)>),
}

impl Conditions {
    pub fn equality(pairs: &[(&str, Value)]) -> Self {
        Self::Equality(
            pairs
                .iter()
                .map(|(column, value)| (column.to_string(), value.clone()))
                .collect(),
        )
    }

    pub fn clauses(triples: &[(&str, &str, Value)]) -> Self {
        Self::Clauses(
            triples
                .iter()
                .map(|(column, op, value)| (column.to_string(), op.to_string(), value.clone()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Equality(pairs) => pairs.is_empty(),
            Self::Clauses(triples) => triples.is_empty(),
        }
    }
}

/// A translated WHERE clause: SQL text (empty for an empty condition set)
/// plus uniquely named bound parameters in bind order.
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<(String, Value)>,
}

/// Translates a condition set against the allowed column set of
/// `descriptor`.
///
/// Every column and operator is validated before any SQL text is assembled;
/// condition values receive the same save-side coercion as stored values.
/// Parameter names are the column name plus an ordinal suffix, so the same
/// column may appear in any number of predicates without collisions.
pub fn translate(descriptor: &EntityDescriptor, conditions: &Conditions) -> Result<WhereClause> {
    let mut resolved: Vec<(&FieldDescriptor, Operator, &Value)> = Vec::new();
    match conditions {
        Conditions::Equality(pairs) => {
            for (column, value) in pairs {
                resolved.push((require(descriptor, column)?, Operator::Eq, value));
            }
        }
        Conditions::Clauses(triples) => {
            for (column, op, value) in triples {
                let field = require(descriptor, column)?;
                resolved.push((field, Operator::parse(op)?, value));
            }
        }
    }

    let mut predicates = Vec::with_capacity(resolved.len());
    let mut params = Vec::with_capacity(resolved.len());
    for (ordinal, (field, op, value)) in resolved.into_iter().enumerate() {
        let name = format!("{}_{}", field.column, ordinal);
        predicates.push(format!("{} {} :{}", field.column, op.sql(), name));
        params.push((name, mapping::to_column_value(field, value.clone())?));
    }

    let sql = if predicates.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", predicates.join(" AND "))
    };
    Ok(WhereClause { sql, params })
}

fn require<'a>(descriptor: &'a EntityDescriptor, column: &str) -> Result<&'a FieldDescriptor> {
    if column.is_empty() {
        return Err(OrmError::InvalidCondition(
            "empty column name".to_string(),
        ));
    }
    descriptor.require_column(column)
}

/// Pagination clause for a 1-based page number.
pub fn pagination(page: usize, page_size: usize) -> String {
    let page = page.max(1);
    format!("LIMIT {} OFFSET {}", page_size, (page - 1) * page_size)
}
