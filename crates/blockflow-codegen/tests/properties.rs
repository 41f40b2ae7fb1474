//! Property-based tests for generation determinism.

use std::path::Path;
use std::sync::Arc;

use blockflow_codegen::Generator;
use blockflow_graph::{FlowGraph, GraphOptions};
use blockflow_registry::DefinitionRegistry;
use proptest::prelude::*;

fn registry() -> Arc<DefinitionRegistry> {
    let mut registry = DefinitionRegistry::new();
    registry.load_dir(Path::new(env!("CARGO_MANIFEST_DIR")).join("../../blocks"));
    Arc::new(registry)
}

/// `(definition, id, value param, expression)` for a small mixed graph.
fn entries() -> Vec<(&'static str, &'static str, &'static str, &'static str)> {
    vec![
        ("parameter", "rate", "value", "48000"),
        ("variable", "nyquist", "value", "rate / 2"),
        ("variable", "cutoff", "value", "nyquist / 4"),
        ("variable", "gain", "value", "0.5"),
        ("const_source", "src", "value", "gain"),
        ("multiply_const", "scale", "k", "cutoff / rate"),
        ("probe_signal", "probe", "", ""),
        ("sink", "out", "", ""),
    ]
}

fn build(order: &[usize]) -> FlowGraph {
    let all = entries();
    let mut graph = FlowGraph::new(registry(), GraphOptions::default());
    for &i in order {
        let (definition, id, param, expression) = all[i];
        let overrides: Vec<(&str, &str)> = if param.is_empty() {
            Vec::new()
        } else {
            vec![(param, expression)]
        };
        graph.add_block_with_id(definition, id, &overrides).unwrap();
    }
    graph.connect("src", 0, "scale", 0).unwrap();
    graph.connect("scale", 0, "out", 0).unwrap();
    graph.connect("scale", 0, "probe", 0).unwrap();
    graph
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The emitted text does not depend on block insertion order.
    #[test]
    fn text_is_insertion_independent(
        order in Just((0..entries().len()).collect::<Vec<_>>()).prop_shuffle(),
        target in prop::sample::select(vec!["ref", "python", "cpp"]),
    ) {
        let generator = Generator::for_target(target).unwrap();
        let identity: Vec<usize> = (0..entries().len()).collect();
        let expected = generator.generate(&mut build(&identity)).unwrap();
        let actual = generator.generate(&mut build(&order)).unwrap();
        prop_assert_eq!(expected, actual);
    }
}
