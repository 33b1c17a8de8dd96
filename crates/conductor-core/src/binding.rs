//! Integration binding resolution.
//!
//! Maps a workflow's requirements onto concrete integrations of one
//! workspace. Explicit bindings (`identifier=name`) win; unaliased
//! requirements with exactly one candidate of their type bind automatically;
//! everything else is an error. Resolution stops at the first failure.

use std::collections::{BTreeMap, HashSet};

use conductor_audit::{AuditEvent, AuditEventType, AuditLog, BindingMethod};
use tracing::debug;

use crate::error::BindingFailure;
use crate::model::Integration;
use crate::requirement::Requirement;
use crate::service::AuditContext;
use crate::store::WorkspaceStore;
use crate::{Error, Result};

/// Environment variable holding comma-separated explicit bindings.
pub const BIND_INTEGRATION_ENV: &str = "CONDUCTOR_BIND_INTEGRATION";

/// Explicit bindings: requirement identifier to integration name.
pub type ExplicitBindings = BTreeMap<String, String>;

/// A requirement bound to an integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub requirement: Requirement,
    pub integration: Integration,
    pub method: BindingMethod,
}

/// Canonical token variable for an integration type (`github` -> `GITHUB_TOKEN`).
pub fn token_env_var(integration_type: &str) -> String {
    let mut name: String = integration_type
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    name.push_str("_TOKEN");
    name
}

/// Parse comma-separated `identifier=name` pairs.
///
/// Each pair is split on its first `=` and both sides are trimmed. Empty
/// segments are skipped; a pair with an empty side is an error. Later pairs
/// override earlier ones.
pub fn parse_bindings(spec: &str) -> Result<ExplicitBindings> {
    let mut bindings = ExplicitBindings::new();
    for pair in spec.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (identifier, name) = parse_binding_pair(pair)?;
        bindings.insert(identifier, name);
    }
    Ok(bindings)
}

/// Parse one `identifier=name` pair.
pub fn parse_binding_pair(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((identifier, name)) if !identifier.trim().is_empty() && !name.trim().is_empty() => {
            Ok((identifier.trim().to_string(), name.trim().to_string()))
        }
        _ => Err(Error::binding(pair.trim(), BindingFailure::MalformedPair)),
    }
}

/// Combine bindings from the environment with `--bind-integration` flags.
/// Flags win on conflict.
pub fn merge_bindings(env: Option<&str>, flags: &[String]) -> Result<ExplicitBindings> {
    let mut bindings = match env {
        Some(spec) => parse_bindings(spec)?,
        None => ExplicitBindings::new(),
    };
    for flag in flags {
        bindings.extend(parse_bindings(flag)?);
    }
    Ok(bindings)
}

/// Resolves requirements against one [`WorkspaceStore`].
pub struct BindingResolver<'a> {
    store: &'a WorkspaceStore,
    audit: AuditLog,
}

impl<'a> BindingResolver<'a> {
    pub fn new(store: &'a WorkspaceStore, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    /// Resolve every requirement in declared order.
    ///
    /// An empty requirement list yields an empty map. Each outcome, success
    /// or failure, is audited.
    pub fn resolve(
        &self,
        workspace: &str,
        requirements: &[Requirement],
        explicit: &ExplicitBindings,
        context: &AuditContext,
    ) -> Result<BTreeMap<String, ResolvedBinding>> {
        let mut resolved = BTreeMap::new();
        let mut seen = HashSet::new();

        for requirement in requirements {
            let identifier = requirement.identifier().to_string();
            let outcome = if seen.insert(identifier.clone()) {
                self.resolve_one(workspace, requirement, explicit)
            } else {
                Err(Error::binding(&identifier, BindingFailure::DuplicateIdentifier))
            };

            match outcome {
                Ok(binding) => {
                    self.audit.emit(
                        AuditEvent::builder(AuditEventType::BindingResolved, workspace)
                            .integration(
                                binding.integration.name.clone(),
                                Some(&binding.integration.integration_type),
                            )
                            .run(context.run_id.as_deref(), context.step_id.as_deref())
                            .binding_method(binding.method)
                            .build(),
                    );
                    debug!(identifier = %identifier, integration = %binding.integration.name, method = %binding.method, "requirement bound");
                    resolved.insert(identifier, binding);
                }
                Err(e) => {
                    let mut event = AuditEvent::builder(AuditEventType::BindingFailed, workspace)
                        .integration_type(requirement.integration_type.clone())
                        .run(context.run_id.as_deref(), context.step_id.as_deref())
                        .failed(e.category());
                    if let Some(name) = explicit.get(&identifier) {
                        event = event
                            .integration(name.clone(), Some(&requirement.integration_type))
                            .binding_method(BindingMethod::Explicit);
                    }
                    self.audit.emit(event.build());
                    return Err(e);
                }
            }
        }

        let unused: Vec<&String> = explicit.keys().filter(|k| !resolved.contains_key(*k)).collect();
        if !unused.is_empty() {
            debug!(?unused, "explicit bindings did not match any requirement");
        }

        Ok(resolved)
    }

    fn resolve_one(
        &self,
        workspace: &str,
        requirement: &Requirement,
        explicit: &ExplicitBindings,
    ) -> Result<ResolvedBinding> {
        let identifier = requirement.identifier();

        if let Some(target) = explicit.get(identifier) {
            let integration = match self.store.get_integration(workspace, target) {
                Ok(integration) => integration,
                Err(Error::IntegrationNotFound { .. }) => {
                    return Err(Error::binding(
                        identifier,
                        BindingFailure::ExplicitTargetMissing {
                            integration: target.clone(),
                        },
                    ))
                }
                Err(e) => return Err(e),
            };
            if integration.integration_type != requirement.integration_type {
                return Err(Error::binding(
                    identifier,
                    BindingFailure::TypeMismatch {
                        integration: integration.name,
                        expected: requirement.integration_type.clone(),
                        actual: integration.integration_type,
                    },
                ));
            }
            return Ok(ResolvedBinding {
                requirement: requirement.clone(),
                integration,
                method: BindingMethod::Explicit,
            });
        }

        if requirement.is_aliased() {
            return Err(Error::binding(
                identifier,
                BindingFailure::AliasNeedsExplicitBinding,
            ));
        }

        let candidates = self
            .store
            .list_integrations_by_type(workspace, &requirement.integration_type)?;
        match candidates.len() {
            0 => Err(Error::NoIntegrationOfType {
                integration_type: requirement.integration_type.clone(),
                workspace: workspace.to_string(),
                env_hint: token_env_var(&requirement.integration_type),
            }),
            1 => Ok(ResolvedBinding {
                requirement: requirement.clone(),
                // Listing tolerates unreadable credentials; binding needs them.
                integration: self.store.get_integration(workspace, &candidates[0].name)?,
                method: BindingMethod::Auto,
            }),
            _ => Err(Error::MultipleIntegrationsOfType {
                integration_type: requirement.integration_type.clone(),
                workspace: workspace.to_string(),
                identifier: identifier.to_string(),
                candidates: candidates.into_iter().map(|i| i.name).collect(),
            }),
        }
    }
}
