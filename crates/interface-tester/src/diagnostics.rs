//! Structured diagnostic records.
//!
//! Synthesis code never logs directly. It returns [`Diagnostic`]s next to its
//! results and the orchestrator decides how to surface them (it forwards each
//! one to `tracing` and keeps it in the run report).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::Role;

/// Severity of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warning,
}

/// What a diagnostic is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// The implementation declares no endpoint for a role.
    RoleUnsupported,
    /// A baseline relation for the interface under test was dropped.
    TemplateRelationSuperseded,
    /// A contract input relation for another interface was dropped.
    OffTargetRelationIgnored,
    /// The relation under test was synthesized from metadata.
    RelationSynthesized,
    /// A scenario was produced.
    ScenarioCollected,
    /// The contract defines no test case for either role.
    NoTestCases,
}

impl DiagnosticCode {
    /// Stable snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleUnsupported => "role_unsupported",
            Self::TemplateRelationSuperseded => "template_relation_superseded",
            Self::OffTargetRelationIgnored => "off_target_relation_ignored",
            Self::RelationSynthesized => "relation_synthesized",
            Self::ScenarioCollected => "scenario_collected",
            Self::NoTestCases => "no_test_cases",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal observation made while synthesizing scenarios.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    pub level: DiagnosticLevel,
    /// Category.
    pub code: DiagnosticCode,
    /// Role the diagnostic concerns, if any.
    pub role: Option<Role>,
    /// Human-readable detail.
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(level: DiagnosticLevel, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            role: None,
            message: message.into(),
        }
    }

    pub fn debug(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Debug, code, message)
    }

    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, code, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, code, message)
    }

    /// Attach the role this diagnostic concerns.
    pub fn for_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Forward to `tracing` at the matching level.
    pub fn emit(&self, interface: &str) {
        let role = self.role.map(|r| r.as_str()).unwrap_or("-");
        match self.level {
            DiagnosticLevel::Debug => {
                debug!(code = %self.code, interface, role, "{}", self.message)
            }
            DiagnosticLevel::Info => {
                info!(code = %self.code, interface, role, "{}", self.message)
            }
            DiagnosticLevel::Warning => {
                warn!(code = %self.code, interface, role, "{}", self.message)
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagnosticLevel::Debug => "debug",
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Warning => "warning",
        };
        match self.role {
            Some(role) => write!(f, "[{}] {} ({}): {}", level, self.code, role, self.message),
            None => write!(f, "[{}] {}: {}", level, self.code, self.message),
        }
    }
}

/// Count diagnostics at or above a level.
pub fn count_at_least(diagnostics: &[Diagnostic], level: DiagnosticLevel) -> usize {
    diagnostics.iter().filter(|d| d.level >= level).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_role_when_present() {
        let d = Diagnostic::warning(DiagnosticCode::RoleUnsupported, "skipping role")
            .for_role(Role::Requirer);
        assert_eq!(d.to_string(), "[warning] role_unsupported (requirer): skipping role");

        let d = Diagnostic::info(DiagnosticCode::NoTestCases, "nothing to do");
        assert_eq!(d.to_string(), "[info] no_test_cases: nothing to do");
    }

    #[test]
    fn levels_are_ordered() {
        assert!(DiagnosticLevel::Warning > DiagnosticLevel::Info);
        assert!(DiagnosticLevel::Info > DiagnosticLevel::Debug);
    }

    #[test]
    fn count_at_least_filters() {
        let ds = vec![
            Diagnostic::debug(DiagnosticCode::ScenarioCollected, "a"),
            Diagnostic::warning(DiagnosticCode::OffTargetRelationIgnored, "b"),
            Diagnostic::info(DiagnosticCode::RelationSynthesized, "c"),
        ];
        assert_eq!(count_at_least(&ds, DiagnosticLevel::Warning), 1);
        assert_eq!(count_at_least(&ds, DiagnosticLevel::Info), 2);
        assert_eq!(count_at_least(&ds, DiagnosticLevel::Debug), 3);
    }

    #[test]
    fn emit_does_not_panic_without_subscriber() {
        Diagnostic::warning(DiagnosticCode::TemplateRelationSuperseded, "x").emit("db");
    }
}
