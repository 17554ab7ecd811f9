//! Endpoint resolution.
//!
//! Determines, per role, which endpoints of the implementation declare the
//! interface under test. A role with no matching endpoint is simply absent
//! from the result: one-role implementations are valid.

use std::collections::BTreeMap;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{TesterError, TesterResult};
use crate::metadata::CharmMetadata;
use crate::types::Role;

/// Endpoints declaring the interface under test, by role.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SupportedEndpoints {
    by_role: BTreeMap<Role, Vec<String>>,
}

impl SupportedEndpoints {
    /// Roles with at least one endpoint, in canonical order.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.by_role.keys().copied()
    }

    /// Endpoints for a role; empty if the role is unsupported.
    pub fn endpoints(&self, role: Role) -> &[String] {
        self.by_role.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the role has at least one endpoint.
    pub fn supports(&self, role: Role) -> bool {
        self.by_role.contains_key(&role)
    }

    /// Whether neither role is supported.
    pub fn is_empty(&self) -> bool {
        self.by_role.is_empty()
    }

    /// Fail unless at least one role is supported.
    pub fn require_any(&self, interface: &str) -> TesterResult<()> {
        if self.is_empty() {
            return Err(TesterError::NoSupportedEndpoints {
                interface: interface.to_string(),
            });
        }
        Ok(())
    }
}

/// Outcome of endpoint resolution.
#[derive(Clone, Debug, Default)]
pub struct EndpointResolution {
    /// Supported endpoints by role.
    pub endpoints: SupportedEndpoints,
    /// One `RoleUnsupported` diagnostic per skipped role.
    pub diagnostics: Vec<Diagnostic>,
}

/// Collect, per role, the endpoints whose declared interface is `interface`.
pub fn resolve_endpoints(meta: &CharmMetadata, interface: &str) -> EndpointResolution {
    let mut resolution = EndpointResolution::default();

    for &role in Role::all() {
        let matching: Vec<String> = meta
            .endpoints(role)
            .iter()
            .filter(|(_, spec)| spec.interface == interface)
            .map(|(name, _)| name.clone())
            .collect();

        if matching.is_empty() {
            resolution.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCode::RoleUnsupported,
                    format!("skipping role {}: unsupported by this implementation", role),
                )
                .for_role(role),
            );
        } else {
            resolution.endpoints.by_role.insert(role, matching);
        }
    }

    resolution
}
