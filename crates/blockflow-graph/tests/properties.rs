//! Property-based tests for resolution and validation.

use std::sync::Arc;

use blockflow_core::{BlockDefinition, BlockKind, ParamDefinition, ParamType, Value};
use blockflow_graph::{FlowGraph, GraphOptions, validate};
use blockflow_registry::DefinitionRegistry;
use proptest::prelude::*;

fn registry() -> Arc<DefinitionRegistry> {
    let mut registry = DefinitionRegistry::new();
    registry
        .register(
            BlockDefinition::new("variable", BlockKind::Variable)
                .with_param(ParamDefinition::new("value", ParamType::Raw, "0")),
        )
        .unwrap();
    Arc::new(registry)
}

/// `(id, expression)` for a chain where `v{i}` is `v{i-1} + 1`.
fn chain(len: usize) -> Vec<(String, String)> {
    (0..len)
        .map(|i| {
            let expression = if i == 0 {
                "0".to_string()
            } else {
                format!("v{} + 1", i - 1)
            };
            (format!("v{i}"), expression)
        })
        .collect()
}

fn build(entries: &[(String, String)]) -> FlowGraph {
    let mut graph = FlowGraph::new(registry(), GraphOptions::default());
    for (id, expression) in entries {
        graph
            .add_block_with_id("variable", id, &[("value", expression.as_str())])
            .unwrap();
    }
    graph
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Resolution order and values do not depend on insertion order.
    #[test]
    fn order_is_insertion_independent(
        shuffled in (1usize..12).prop_flat_map(|len| Just(chain(len)).prop_shuffle())
    ) {
        let len = shuffled.len();
        let mut graph = build(&shuffled);
        let resolution = graph.resolve().unwrap();
        let expected: Vec<String> = (0..len).map(|i| format!("v{i}")).collect();
        prop_assert_eq!(resolution.order(), expected.as_slice());
        let last = format!("v{}", len - 1);
        prop_assert_eq!(resolution.value(&last), Some(&Value::Number((len - 1) as f64)));
    }

    /// Closing a chain into a loop reports every member, starting at the
    /// smallest id and following references.
    #[test]
    fn closed_chain_reports_full_cycle(len in 1usize..10) {
        let mut entries = chain(len);
        entries[0].1 = format!("v{}", len - 1);
        let mut graph = build(&entries);

        let err = graph.resolve().unwrap_err();
        let mut expected = vec!["v0".to_string()];
        expected.extend((1..len).rev().map(|i| format!("v{i}")));
        prop_assert_eq!(err.cycle, expected);

        let report = validate(&mut graph);
        prop_assert_eq!(report.errors().count(), len);
    }

    /// Validating twice gives the same report and reuses the resolution.
    #[test]
    fn validation_is_idempotent(
        exprs in prop::collection::vec(prop_oneof![
            Just("1".to_string()),
            Just("v0 + 1".to_string()),
            Just("v1 * v2".to_string()),
            Just("'text'".to_string()),
            Just("oops +".to_string()),
            Just("v3".to_string()),
        ], 1..6)
    ) {
        let entries: Vec<(String, String)> = exprs
            .into_iter()
            .enumerate()
            .map(|(i, e)| (format!("v{i}"), e))
            .collect();
        let mut graph = build(&entries);
        let first = validate(&mut graph);
        let second = validate(&mut graph);
        prop_assert_eq!(first, second);
        prop_assert_eq!(graph.cache().passes(), 1);
    }
}
