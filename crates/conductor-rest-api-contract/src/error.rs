//! Contract validation errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("field '{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("invalid server name '{name}': only letters, digits, '-', '_' and '.' are allowed")]
    InvalidServerName { name: String },
}

pub type ContractResult<T> = Result<T, ContractError>;
