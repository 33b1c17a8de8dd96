//! Workflow integration requirements (`"github"` or `"github as source"`).

use crate::error::BindingFailure;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub integration_type: String,
    pub alias: Option<String>,
}

impl Requirement {
    /// Key of this requirement in the binding map: the alias if present,
    /// otherwise the type.
    pub fn identifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.integration_type)
    }

    pub fn is_aliased(&self) -> bool {
        self.alias.is_some()
    }
}

impl std::str::FromStr for Requirement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        match tokens.as_slice() {
            [integration_type] => Ok(Self {
                integration_type: integration_type.to_string(),
                alias: None,
            }),
            [integration_type, "as", alias] => Ok(Self {
                integration_type: integration_type.to_string(),
                alias: Some(alias.to_string()),
            }),
            _ => Err(Error::binding(s.trim(), BindingFailure::InvalidRequirement)),
        }
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} as {}", self.integration_type, alias),
            None => f.write_str(&self.integration_type),
        }
    }
}

/// Parse a workflow's requirement strings, preserving declared order.
pub fn parse_requirements<S: AsRef<str>>(requirements: &[S]) -> Result<Vec<Requirement>> {
    requirements.iter().map(|r| r.as_ref().parse()).collect()
}
