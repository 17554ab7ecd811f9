//! Scenario state merging.
//!
//! Combines the implementation's baseline state template with a contract
//! test case's input state into one relation set. On exit exactly one
//! relation carries the interface under test:
//!
//! 1. Baseline relations for other interfaces are kept, in order. Baseline
//!    relations for the interface under test are superseded.
//! 2. Contract input relations for the interface under test are appended.
//!    Input relations for other interfaces are ignored.
//! 3. If still no relation carries the interface, one is synthesized from the
//!    role's single supported endpoint.

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{TesterError, TesterResult};
use crate::types::{Relation, Role, State};

/// Merged relations plus what happened along the way.
#[derive(Clone, Debug, Default)]
pub struct MergeOutcome {
    /// The merged relation sequence.
    pub relations: Vec<Relation>,
    /// Non-fatal observations (superseded, ignored, synthesized).
    pub diagnostics: Vec<Diagnostic>,
}

/// Merges states for one role of one interface.
#[derive(Clone, Copy, Debug)]
pub struct ScenarioMerger<'a> {
    interface: &'a str,
    role: Role,
    endpoints: &'a [String],
}

impl<'a> ScenarioMerger<'a> {
    /// Merger for `role`, which supports `endpoints` for `interface`.
    pub fn new(interface: &'a str, role: Role, endpoints: &'a [String]) -> Self {
        Self {
            interface,
            role,
            endpoints,
        }
    }

    /// Merge the relation sets of `template` and `input`.
    pub fn merge_relations(
        &self,
        template: &State,
        input: Option<&State>,
    ) -> TesterResult<MergeOutcome> {
        let mut outcome = MergeOutcome::default();

        for superseded in template.relations_for(self.interface) {
            outcome.diagnostics.push(self.warning(
                DiagnosticCode::TemplateRelationSuperseded,
                format!(
                    "relation {} for {} found in state template; \
                     it is superseded by the relation under test",
                    superseded, self.interface
                ),
            ));
        }
        outcome.relations = template
            .relations
            .iter()
            .filter(|r| !r.carries(self.interface))
            .cloned()
            .collect();

        if let Some(input) = input {
            let (on_target, off_target): (Vec<&Relation>, Vec<&Relation>) = input
                .relations
                .iter()
                .partition(|r| r.carries(self.interface));

            if on_target.len() > 1 {
                return Err(TesterError::InvalidTestCase(format!(
                    "input state declares {} relations for {}/{}; at most one may be under test",
                    on_target.len(),
                    self.role,
                    self.interface
                )));
            }
            if !off_target.is_empty() {
                let ignored: Vec<String> = off_target.iter().map(|r| r.to_string()).collect();
                outcome.diagnostics.push(self.warning(
                    DiagnosticCode::OffTargetRelationIgnored,
                    format!(
                        "irrelevant relations in input state for {}/{} are ignored: {}",
                        self.interface,
                        self.role,
                        ignored.join(", ")
                    ),
                ));
            }
            outcome.relations.extend(on_target.into_iter().cloned());
        }

        if !outcome.relations.iter().any(|r| r.carries(self.interface)) {
            let endpoint = self.single_endpoint()?;
            outcome.diagnostics.push(
                Diagnostic::debug(
                    DiagnosticCode::RelationSynthesized,
                    format!("synthesized relation {}:{}", endpoint, self.interface),
                )
                .for_role(self.role),
            );
            outcome
                .relations
                .push(Relation::new(self.interface, endpoint.clone()));
        }

        Ok(outcome)
    }

    /// Merge into a new state built from `template`'s non-relation context.
    pub fn merge(
        &self,
        template: &State,
        input: Option<&State>,
    ) -> TesterResult<(State, Vec<Diagnostic>)> {
        let outcome = self.merge_relations(template, input)?;
        Ok((template.with_relations(outcome.relations), outcome.diagnostics))
    }

    fn single_endpoint(&self) -> TesterResult<&'a String> {
        match self.endpoints {
            [endpoint] => Ok(endpoint),
            [] => Err(TesterError::NoEndpoint {
                role: self.role,
                interface: self.interface.to_string(),
            }),
            many => Err(TesterError::AmbiguousEndpoint {
                role: self.role,
                interface: self.interface.to_string(),
                endpoints: many.to_vec(),
            }),
        }
    }

    fn warning(&self, code: DiagnosticCode, message: String) -> Diagnostic {
        Diagnostic::warning(code, message).for_role(self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const IFACE: &str = "db";

    fn endpoints(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn codes(outcome: &MergeOutcome) -> Vec<DiagnosticCode> {
        outcome.diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn synthesizes_relation_from_single_endpoint() {
        let eps = endpoints(&["database"]);
        let merger = ScenarioMerger::new(IFACE, Role::Provider, &eps);
        let outcome = merger.merge_relations(&State::new(), None).unwrap();
        assert_eq!(outcome.relations, vec![Relation::new(IFACE, "database")]);
        assert_eq!(codes(&outcome), vec![DiagnosticCode::RelationSynthesized]);
    }

    #[test]
    fn zero_endpoints_cannot_synthesize() {
        let eps = endpoints(&[]);
        let err = ScenarioMerger::new(IFACE, Role::Requirer, &eps)
            .merge_relations(&State::new(), None)
            .unwrap_err();
        assert!(matches!(err, TesterError::NoEndpoint { role: Role::Requirer, .. }));
    }

    #[test]
    fn multiple_endpoints_are_ambiguous() {
        let eps = endpoints(&["database", "backup-db"]);
        let err = ScenarioMerger::new(IFACE, Role::Provider, &eps)
            .merge_relations(&State::new(), None)
            .unwrap_err();
        match err {
            TesterError::AmbiguousEndpoint { endpoints, .. } => {
                assert_eq!(endpoints, vec!["database", "backup-db"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn multiple_endpoints_are_fine_when_input_supplies_relation() {
        let eps = endpoints(&["database", "backup-db"]);
        let supplied = Relation::new(IFACE, "backup-db");
        let input = State::from_relations(vec![supplied.clone()]);
        let outcome = ScenarioMerger::new(IFACE, Role::Provider, &eps)
            .merge_relations(&State::new(), Some(&input))
            .unwrap();
        assert_eq!(outcome.relations, vec![supplied]);
    }

    #[test]
    fn template_relation_for_interface_is_superseded() {
        let eps = endpoints(&["database"]);
        let template = State::from_relations(vec![
            Relation::new("ingress", "ingress"),
            Relation::new(IFACE, "stale"),
        ]);
        let outcome = ScenarioMerger::new(IFACE, Role::Provider, &eps)
            .merge_relations(&template, None)
            .unwrap();
        assert_eq!(
            outcome.relations,
            vec![Relation::new("ingress", "ingress"), Relation::new(IFACE, "database")]
        );
        assert_eq!(
            codes(&outcome),
            vec![
                DiagnosticCode::TemplateRelationSuperseded,
                DiagnosticCode::RelationSynthesized
            ]
        );
    }

    #[test]
    fn off_target_input_relations_are_ignored() {
        let eps = endpoints(&["database"]);
        let mut data = crate::types::DataBag::new();
        data.insert("host".into(), "10.0.0.1".into());
        let on_target = Relation::new(IFACE, "database").with_remote_app_data(data);
        let input =
            State::from_relations(vec![Relation::new("logging", "logs"), on_target.clone()]);
        let outcome = ScenarioMerger::new(IFACE, Role::Provider, &eps)
            .merge_relations(&State::new(), Some(&input))
            .unwrap();
        assert_eq!(outcome.relations, vec![on_target]);
        assert_eq!(codes(&outcome), vec![DiagnosticCode::OffTargetRelationIgnored]);
        assert!(outcome.diagnostics[0].message.contains("logs:logging"));
    }

    #[test]
    fn two_on_target_input_relations_are_rejected() {
        let eps = endpoints(&["database"]);
        let input = State::from_relations(vec![
            Relation::new(IFACE, "database"),
            Relation::new(IFACE, "database"),
        ]);
        let err = ScenarioMerger::new(IFACE, Role::Provider, &eps)
            .merge_relations(&State::new(), Some(&input))
            .unwrap_err();
        assert!(matches!(err, TesterError::InvalidTestCase(_)));
    }

    #[test]
    fn merge_keeps_template_context_and_leaves_inputs_untouched() {
        let eps = endpoints(&["database"]);
        let mut template =
            State::from_relations(vec![Relation::new(IFACE, "stale")]).with_leader(true);
        template.config.insert("port".into(), serde_json::json!(3306));
        let before = template.clone();

        let (state, _) = ScenarioMerger::new(IFACE, Role::Provider, &eps)
            .merge(&template, None)
            .unwrap();
        assert!(state.leader);
        assert_eq!(state.config["port"], 3306);
        assert_eq!(state.relations, vec![Relation::new(IFACE, "database")]);
        assert_eq!(template, before);
    }

    fn relation_strategy() -> impl Strategy<Value = Relation> {
        (
            prop_oneof![Just("db"), Just("ingress"), Just("logging"), Just("tracing")],
            prop_oneof![Just("a"), Just("b"), Just("c")],
        )
            .prop_map(|(iface, ep)| Relation::new(iface, ep))
    }

    fn relations_strategy() -> impl Strategy<Value = Vec<Relation>> {
        proptest::collection::vec(relation_strategy(), 0..8)
    }

    proptest! {
        #[test]
        fn property_exactly_one_relation_under_test(
            template in relations_strategy(),
            input in proptest::option::of(relations_strategy()),
        ) {
            let eps = endpoints(&["database"]);
            let template = State::from_relations(template);
            let input = input.map(State::from_relations);
            let merger = ScenarioMerger::new(IFACE, Role::Provider, &eps);

            match merger.merge_relations(&template, input.as_ref()) {
                Ok(outcome) => {
                    let under_test = outcome.relations.iter().filter(|r| r.carries(IFACE)).count();
                    prop_assert_eq!(under_test, 1);
                }
                Err(TesterError::InvalidTestCase(_)) => {
                    let supplied = input
                        .as_ref()
                        .map(|s| s.relations_for(IFACE).count())
                        .unwrap_or(0);
                    prop_assert!(supplied > 1);
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        #[test]
        fn property_off_target_template_relations_preserved_in_order(
            template in relations_strategy(),
            input in proptest::option::of(relations_strategy()),
        ) {
            let eps = endpoints(&["database"]);
            let template = State::from_relations(template);
            let input = input.map(State::from_relations);
            let merger = ScenarioMerger::new(IFACE, Role::Provider, &eps);

            if let Ok(outcome) = merger.merge_relations(&template, input.as_ref()) {
                let expected: Vec<&Relation> =
                    template.relations.iter().filter(|r| !r.carries(IFACE)).collect();
                let actual: Vec<&Relation> =
                    outcome.relations.iter().filter(|r| !r.carries(IFACE)).collect();
                prop_assert_eq!(actual, expected);
            }
        }

        #[test]
        fn property_input_relation_wins_over_synthesis(
            template in relations_strategy(),
            endpoint in prop_oneof![Just("x"), Just("y")],
        ) {
            let eps = endpoints(&["database"]);
            let supplied = Relation::new(IFACE, endpoint);
            let input = State::from_relations(vec![supplied.clone()]);
            let outcome = ScenarioMerger::new(IFACE, Role::Provider, &eps)
                .merge_relations(&State::from_relations(template), Some(&input))
                .unwrap();
            let under_test: Vec<&Relation> =
                outcome.relations.iter().filter(|r| r.carries(IFACE)).collect();
            prop_assert_eq!(under_test, vec![&supplied]);
            prop_assert!(!outcome
                .diagnostics
                .iter()
                .any(|d| d.code == DiagnosticCode::RelationSynthesized));
        }
    }
}
