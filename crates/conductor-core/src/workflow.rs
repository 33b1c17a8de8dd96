//! Workflow definition parsing.
//!
//! Only the header of a workflow matters to the frontend core: its name,
//! description and the `requires.integrations` list. Everything else in the
//! document is left to the daemon.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::requirement::{parse_requirements, Requirement};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkflowRequires {
    #[serde(default)]
    pub integrations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requires: WorkflowRequires,
}

impl WorkflowDefinition {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| Error::InvalidWorkflow {
            path: PathBuf::from(path),
            message: e.to_string(),
        })
    }

    /// Parsed integration requirements, in declared order.
    pub fn requirements(&self) -> Result<Vec<Requirement>> {
        parse_requirements(&self.requires.integrations)
    }
}

/// Whether `content` is a YAML mapping with a top-level `name` key.
pub fn has_top_level_name(content: &str) -> bool {
    match serde_yaml::from_str::<serde_yaml::Value>(content) {
        Ok(serde_yaml::Value::Mapping(map)) => map.contains_key("name"),
        _ => false,
    }
}
