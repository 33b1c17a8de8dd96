//! Audit event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of auditable actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditEventType {
    #[serde(rename = "integration.created")]
    IntegrationCreated,
    #[serde(rename = "integration.updated")]
    IntegrationUpdated,
    #[serde(rename = "integration.deleted")]
    IntegrationDeleted,
    #[serde(rename = "integration.accessed")]
    IntegrationAccessed,
    #[serde(rename = "integration.tested")]
    IntegrationTested,
    #[serde(rename = "binding.resolved")]
    BindingResolved,
    #[serde(rename = "binding.failed")]
    BindingFailed,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::IntegrationCreated => "integration.created",
            AuditEventType::IntegrationUpdated => "integration.updated",
            AuditEventType::IntegrationDeleted => "integration.deleted",
            AuditEventType::IntegrationAccessed => "integration.accessed",
            AuditEventType::IntegrationTested => "integration.tested",
            AuditEventType::BindingResolved => "binding.resolved",
            AuditEventType::BindingFailed => "binding.failed",
        }
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integration.created" => Ok(AuditEventType::IntegrationCreated),
            "integration.updated" => Ok(AuditEventType::IntegrationUpdated),
            "integration.deleted" => Ok(AuditEventType::IntegrationDeleted),
            "integration.accessed" => Ok(AuditEventType::IntegrationAccessed),
            "integration.tested" => Ok(AuditEventType::IntegrationTested),
            "binding.resolved" => Ok(AuditEventType::BindingResolved),
            "binding.failed" => Ok(AuditEventType::BindingFailed),
            _ => Err(format!("Unknown audit event type: {}", s)),
        }
    }
}

/// Integration fields an update may touch.
///
/// Update events carry these names only; there is no variant that can hold a
/// value, so credentials never reach the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedField {
    Type,
    BaseUrl,
    Auth,
    Headers,
    Timeout,
}

impl ChangedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangedField::Type => "type",
            ChangedField::BaseUrl => "base_url",
            ChangedField::Auth => "auth",
            ChangedField::Headers => "headers",
            ChangedField::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for ChangedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a requirement was bound to an integration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMethod {
    Auto,
    Explicit,
}

impl std::fmt::Display for BindingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingMethod::Auto => f.write_str("auto"),
            BindingMethod::Explicit => f.write_str("explicit"),
        }
    }
}

/// A single audit log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "event")]
    pub event_type: AuditEventType,
    pub workspace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_method: Option<BindingMethod>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<ChangedField>,
}

impl AuditEvent {
    /// Create a new audit event builder.
    pub fn builder(event_type: AuditEventType, workspace: impl Into<String>) -> AuditEventBuilder {
        AuditEventBuilder::new(event_type, workspace)
    }
}

/// Builder for constructing audit events.
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    pub fn new(event_type: AuditEventType, workspace: impl Into<String>) -> Self {
        Self {
            event: AuditEvent {
                timestamp: Utc::now(),
                event_type,
                workspace: workspace.into(),
                integration_name: None,
                integration_type: None,
                run_id: None,
                step_id: None,
                binding_method: None,
                success: true,
                error_category: None,
                changed_fields: Vec::new(),
            },
        }
    }

    pub fn integration(mut self, name: impl Into<String>, type_: Option<&str>) -> Self {
        self.event.integration_name = Some(name.into());
        self.event.integration_type = type_.map(str::to_string);
        self
    }

    pub fn integration_type(mut self, type_: impl Into<String>) -> Self {
        self.event.integration_type = Some(type_.into());
        self
    }

    pub fn run(mut self, run_id: Option<&str>, step_id: Option<&str>) -> Self {
        self.event.run_id = run_id.map(str::to_string);
        self.event.step_id = step_id.map(str::to_string);
        self
    }

    pub fn binding_method(mut self, method: BindingMethod) -> Self {
        self.event.binding_method = Some(method);
        self
    }

    /// Mark the event as failed with the error's stable category.
    pub fn failed(mut self, category: impl Into<String>) -> Self {
        self.event.success = false;
        self.event.error_category = Some(category.into());
        self
    }

    pub fn changed_fields(mut self, fields: impl IntoIterator<Item = ChangedField>) -> Self {
        let mut fields: Vec<ChangedField> = fields.into_iter().collect();
        fields.sort();
        fields.dedup();
        self.event.changed_fields = fields;
        self
    }

    pub fn build(self) -> AuditEvent {
        self.event
    }
}
