use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrmError {
    #[error("Unknown column '{0}' for table '{1}'")]
    UnknownColumn(String, String),

    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Coercion error: {0}")]
    Coercion(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

pub type Result<T> = std::result::Result<T, OrmError>;
