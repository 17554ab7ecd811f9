//! Scenario iteration.
//!
//! `ScenarioIter` walks every test case of every supported role and turns it
//! into a [`Scenario`]: merged state, relation under test, normalized event.
//! Iteration is lazy and single-pass; scenarios are synthesized one at a time
//! as the caller pulls them. The first synthesis error ends the sequence.

use std::collections::VecDeque;
use std::vec;

use serde::Serialize;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{TesterError, TesterResult};
use crate::event::{normalize, Event};
use crate::merger::ScenarioMerger;
use crate::metadata::CharmMetadata;
use crate::resolver::{resolve_endpoints, SupportedEndpoints};
use crate::types::{InterfaceTestSpec, Relation, Role, Schema, State, TestCase};

// ── Scenario ───────────────────────────────────────────────────────────

/// One executable (test case, schema, event, state) tuple.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Scenario {
    pub role: Role,
    pub test: TestCase,
    pub schema: Schema,
    pub event: Event,
    pub state: State,
    /// Observations made while synthesizing this scenario.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Scenario {
    /// The relation carrying `interface` in the final state.
    pub fn relation_under_test<'a>(&'a self, interface: &'a str) -> Option<&'a Relation> {
        self.state.relations_for(interface).next()
    }
}

// ── Iterator ───────────────────────────────────────────────────────────

#[derive(Debug)]
struct RoleCursor {
    role: Role,
    endpoints: Vec<String>,
    schema: Schema,
    tests: vec::IntoIter<TestCase>,
}

/// Lazy sequence of scenarios for one interface.
#[derive(Debug)]
pub struct ScenarioIter {
    interface: String,
    template: State,
    supported: SupportedEndpoints,
    pending: VecDeque<RoleCursor>,
    current: Option<RoleCursor>,
    diagnostics: Vec<Diagnostic>,
    fused: bool,
}

impl ScenarioIter {
    /// Plan iteration over `spec` for the implementation described by `meta`.
    ///
    /// A spec without any test case yields an empty sequence. Otherwise the
    /// implementation must support the interface in at least one role; roles
    /// it does not support are skipped with a diagnostic.
    pub fn plan(
        mut spec: InterfaceTestSpec,
        meta: &CharmMetadata,
        template: State,
        interface: &str,
    ) -> TesterResult<Self> {
        let mut iter = Self {
            interface: interface.to_string(),
            template,
            supported: SupportedEndpoints::default(),
            pending: VecDeque::new(),
            current: None,
            diagnostics: Vec::new(),
            fused: false,
        };

        if spec.has_no_tests() {
            iter.diagnostics.push(Diagnostic::info(
                DiagnosticCode::NoTestCases,
                format!("contract for {} defines no test cases for either role", interface),
            ));
            return Ok(iter);
        }

        let resolution = resolve_endpoints(meta, interface);
        iter.diagnostics.extend(resolution.diagnostics);
        resolution.endpoints.require_any(interface)?;

        for role in resolution.endpoints.roles() {
            let role_spec = spec.take_role(role);
            if role_spec.tests.is_empty() {
                iter.diagnostics.push(
                    Diagnostic::info(
                        DiagnosticCode::NoTestCases,
                        format!("contract for {} defines no {} test cases", interface, role),
                    )
                    .for_role(role),
                );
                continue;
            }
            iter.pending.push_back(RoleCursor {
                role,
                endpoints: resolution.endpoints.endpoints(role).to_vec(),
                schema: role_spec.schema,
                tests: role_spec.tests.into_iter(),
            });
        }
        iter.supported = resolution.endpoints;

        Ok(iter)
    }

    /// Plan-level diagnostics (unsupported roles, empty contracts).
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Endpoints resolved for the interface.
    pub fn supported(&self) -> &SupportedEndpoints {
        &self.supported
    }

    /// Number of test cases not yet turned into scenarios.
    pub fn remaining(&self) -> usize {
        if self.fused {
            return 0;
        }
        let current = self.current.as_ref().map(|c| c.tests.len()).unwrap_or(0);
        current + self.pending.iter().map(|c| c.tests.len()).sum::<usize>()
    }
}

impl Iterator for ScenarioIter {
    type Item = TesterResult<Scenario>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        loop {
            if let Some(cursor) = self.current.as_mut() {
                if let Some(test) = cursor.tests.next() {
                    let result = build_scenario(&self.interface, &self.template, cursor, test);
                    if result.is_err() {
                        self.fused = true;
                    }
                    return Some(result);
                }
            }
            self.current = Some(self.pending.pop_front()?);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

fn build_scenario(
    interface: &str,
    template: &State,
    cursor: &RoleCursor,
    test: TestCase,
) -> TesterResult<Scenario> {
    let merger = ScenarioMerger::new(interface, cursor.role, &cursor.endpoints);
    let (state, mut diagnostics) = merger.merge(template, test.input_state.as_ref())?;

    let relation = state
        .relations_for(interface)
        .next()
        .ok_or_else(|| TesterError::MissingRelationUnderTest {
            interface: interface.to_string(),
        })?;
    let event = normalize(&test.event, relation).map_err(|e| match e {
        TesterError::InvalidTestCase(reason) => {
            TesterError::InvalidTestCase(format!("{}: {}", test.name, reason))
        }
        other => other,
    })?;

    diagnostics.push(
        Diagnostic::debug(
            DiagnosticCode::ScenarioCollected,
            format!("collected scenario {} ({})", test.name, event),
        )
        .for_role(cursor.role),
    );

    Ok(Scenario {
        role: cursor.role,
        schema: cursor.schema.clone(),
        test,
        event,
        state,
        diagnostics,
    })
}
