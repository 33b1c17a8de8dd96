//! Audited integration operations.
//!
//! [`IntegrationService`] is the only path the CLI uses to touch credentials.
//! Each call forwards to the [`WorkspaceStore`] and emits one audit event
//! carrying the outcome.

use std::future::Future;

use conductor_audit::{AuditEvent, AuditEventType, AuditLog, ChangedField};

use crate::model::{Integration, NewIntegration};
use crate::store::WorkspaceStore;
use crate::Result;

/// Run and step identifiers attached to audit events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    pub run_id: Option<String>,
    pub step_id: Option<String>,
}

impl AuditContext {
    pub fn for_run(run_id: impl Into<String>) -> Self {
        Self {
            run_id: Some(run_id.into()),
            step_id: None,
        }
    }

    pub fn with_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }
}

/// Fields that differ between two versions of an integration.
pub fn changed_fields(before: &Integration, after: &Integration) -> Vec<ChangedField> {
    let mut fields = Vec::new();
    if before.integration_type != after.integration_type {
        fields.push(ChangedField::Type);
    }
    if before.base_url != after.base_url {
        fields.push(ChangedField::BaseUrl);
    }
    if before.auth != after.auth {
        fields.push(ChangedField::Auth);
    }
    if before.headers != after.headers {
        fields.push(ChangedField::Headers);
    }
    if before.timeout_seconds != after.timeout_seconds {
        fields.push(ChangedField::Timeout);
    }
    fields
}

pub struct IntegrationService<'a> {
    store: &'a WorkspaceStore,
    audit: AuditLog,
}

impl<'a> IntegrationService<'a> {
    pub fn new(store: &'a WorkspaceStore, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    pub fn store(&self) -> &WorkspaceStore {
        self.store
    }

    pub fn create(&self, workspace: &str, new: NewIntegration) -> Result<Integration> {
        let name = new.name.clone();
        let integration_type = new.integration_type.clone();
        let result = self.store.create_integration(workspace, new);
        self.record(
            AuditEvent::builder(AuditEventType::IntegrationCreated, workspace)
                .integration(name, Some(&integration_type)),
            &result,
        );
        result
    }

    /// Fetch an integration whose credentials are about to be used.
    pub fn get_for_use(
        &self,
        workspace: &str,
        name: &str,
        context: &AuditContext,
    ) -> Result<Integration> {
        let result = self.store.get_integration(workspace, name);
        let integration_type = result.as_ref().ok().map(|i| i.integration_type.clone());
        self.record(
            AuditEvent::builder(AuditEventType::IntegrationAccessed, workspace)
                .integration(name, integration_type.as_deref())
                .run(context.run_id.as_deref(), context.step_id.as_deref()),
            &result,
        );
        result
    }

    /// Apply `updated` and record which fields changed.
    pub fn update(&self, updated: &Integration) -> Result<Integration> {
        let workspace = updated.workspace_name.as_str();
        let event = AuditEvent::builder(AuditEventType::IntegrationUpdated, workspace)
            .integration(updated.name.clone(), Some(&updated.integration_type));

        let result = self
            .store
            .get_integration(workspace, &updated.name)
            .and_then(|current| {
                let fields = changed_fields(&current, updated);
                self.store.update_integration(updated).map(|after| (after, fields))
            });

        match result {
            Ok((after, fields)) => {
                self.audit.emit(event.changed_fields(fields).build());
                Ok(after)
            }
            Err(e) => {
                self.audit.emit(event.failed(e.category()).build());
                Err(e)
            }
        }
    }

    pub fn delete(&self, workspace: &str, name: &str) -> Result<()> {
        let integration_type = self
            .store
            .get_integration(workspace, name)
            .ok()
            .map(|i| i.integration_type);
        let result = self.store.delete_integration(workspace, name);
        self.record(
            AuditEvent::builder(AuditEventType::IntegrationDeleted, workspace)
                .integration(name, integration_type.as_deref()),
            &result,
        );
        result
    }

    /// Load an integration and hand it to `probe`, auditing the probe's outcome.
    pub async fn test<F, Fut, T>(&self, workspace: &str, name: &str, probe: F) -> Result<T>
    where
        F: FnOnce(Integration) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let event = AuditEvent::builder(AuditEventType::IntegrationTested, workspace);
        let integration = match self.store.get_integration(workspace, name) {
            Ok(integration) => integration,
            Err(e) => {
                self.audit
                    .emit(event.integration(name, None).failed(e.category()).build());
                return Err(e);
            }
        };

        let event = event.integration(name, Some(&integration.integration_type));
        let result = probe(integration).await;
        self.record(event, &result);
        result
    }

    fn record<T>(&self, event: conductor_audit::AuditEventBuilder, result: &Result<T>) {
        let event = match result {
            Ok(_) => event,
            Err(e) => event.failed(e.category()),
        };
        self.audit.emit(event.build());
    }
}
