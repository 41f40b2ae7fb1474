//! Property-based tests for the description file round trip.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use blockflow_core::{
    BlockDefinition, BlockKind, Check, CheckRule, ParamDefinition, ParamOption, ParamType,
    PortDefinition, PortDomain, TemplateSet,
};
use blockflow_registry::DefinitionRegistry;
use proptest::prelude::*;

fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

fn kind() -> impl Strategy<Value = BlockKind> {
    prop_oneof![
        Just(BlockKind::Block),
        Just(BlockKind::Variable),
        Just(BlockKind::Parameter),
        Just(BlockKind::Probe),
    ]
}

fn scalar_type() -> impl Strategy<Value = ParamType> {
    prop_oneof![
        Just(ParamType::Raw),
        Just(ParamType::Int),
        Just(ParamType::Real),
        Just(ParamType::String),
        Just(ParamType::Bool),
        Just(ParamType::RealVector),
        Just(ParamType::Id),
    ]
}

fn param(id: String) -> impl Strategy<Value = ParamDefinition> {
    let scalar = (scalar_type(), "[a-z0-9 +*]{0,8}", "[A-Za-z ]{0,10}").prop_map({
        let id = id.clone();
        move |(dtype, default, label)| {
            let mut p = ParamDefinition::new(id.clone(), dtype, default);
            if !label.is_empty() {
                p.label = label;
            }
            p
        }
    });
    let enumerated = (
        prop::collection::btree_set(ident(), 1..4),
        prop::collection::btree_map(ident(), "[a-z0-9_]{1,6}", 0..2),
        any::<prop::sample::Index>(),
    )
        .prop_map(move |(keys, attributes, pick)| {
            let keys: Vec<String> = keys.into_iter().collect();
            let default = pick.get(&keys).clone();
            let mut p = ParamDefinition::new(id.clone(), ParamType::Enum, default);
            for (i, key) in keys.into_iter().enumerate() {
                let mut option = ParamOption::new(key);
                if i == 0 {
                    option.attributes.clone_from(&attributes);
                    option.label = "First".to_string();
                }
                p.options.push(option);
            }
            p
        });
    prop_oneof![scalar, enumerated]
}

fn port(label: String) -> impl Strategy<Value = PortDefinition> {
    (
        prop_oneof![Just(PortDomain::Stream), Just(PortDomain::Message)],
        prop_oneof![Just("*".to_string()), "[a-z]{1,6}", Just("${type}".to_string())],
        prop_oneof![Just("1".to_string()), Just("${vlen}".to_string())],
        0usize..3,
        0usize..3,
        any::<bool>(),
    )
        .prop_map(move |(domain, dtype, vlen, min, extra, optional)| PortDefinition {
            label: label.clone(),
            domain,
            dtype,
            vlen,
            multiplicity: if extra == 0 { "1".to_string() } else { "n".to_string() },
            min_streams: min,
            max_streams: min + extra,
            optional,
        })
}

fn ports() -> impl Strategy<Value = Vec<PortDefinition>> {
    prop::collection::btree_set(ident(), 0..3).prop_flat_map(|labels| {
        labels.into_iter().map(port).collect::<Vec<_>>()
    })
}

fn template() -> impl Strategy<Value = TemplateSet> {
    (
        prop::collection::vec("import [a-z]{1,6}", 0..3),
        "[a-z_]{1,8}\\(\\$\\{[a-z]{1,4}\\}\\)",
        prop::collection::vec("set_[a-z]{1,6}\\(\\)", 0..2),
    )
        .prop_map(|(imports, make, callbacks)| TemplateSet {
            imports,
            make,
            callbacks,
        })
}

fn check() -> impl Strategy<Value = Check> {
    (
        ident(),
        prop_oneof![
            Just(CheckRule::Odd),
            Just(CheckRule::Positive),
            Just(CheckRule::NonEmpty),
            (-5i32..5, 0i32..5).prop_map(|(min, span)| CheckRule::Range {
                min: f64::from(min),
                max: f64::from(min + span),
            }),
        ],
        any::<bool>(),
    )
        .prop_map(|(param, rule, warn)| {
            let check = Check::new(param, rule);
            if warn { check.warning() } else { check }
        })
}

fn definition() -> impl Strategy<Value = BlockDefinition> {
    let params = prop::collection::btree_set(ident(), 0..4).prop_flat_map(|mut ids: BTreeSet<String>| {
        ids.remove("value");
        let mut strategies = vec![param("value".to_string()).boxed()];
        strategies.extend(ids.into_iter().map(|id| param(id).boxed()));
        strategies
    });
    (
        ident(),
        kind(),
        any::<bool>(),
        params,
        ports(),
        ports(),
        prop::collection::vec("[A-Z][a-z]{0,5}", 0..3),
        prop::collection::btree_map(
            prop_oneof![Just("ref"), Just("python"), Just("cpp")],
            template(),
            0..3,
        ),
        prop::collection::vec(check(), 0..3),
        "[a-z ]{0,20}",
    )
        .prop_map(
            |(id, kind, flip, params, inputs, outputs, category, templates, checks, documentation)| {
                let mut def = BlockDefinition::new(id, kind);
                if flip {
                    def.evaluatable = !def.evaluatable;
                }
                def.params = params;
                def.inputs = inputs;
                def.outputs = outputs;
                def.category = category;
                def.templates = templates
                    .into_iter()
                    .map(|(k, v): (&str, TemplateSet)| (k.to_string(), v))
                    .collect::<BTreeMap<_, _>>();
                def.checks = checks;
                def.documentation = documentation;
                def
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Regenerating a description file from a definition and loading it back
    /// reproduces the same structure.
    #[test]
    fn definition_round_trip(def in definition()) {
        let text = DefinitionRegistry::to_toml(&def).unwrap();
        let mut registry = DefinitionRegistry::new();
        let loaded = registry
            .load_str("generated.block.toml", &text)
            .map_err(|e| TestCaseError::fail(format!("{e}\n{text}")))?;
        prop_assert_eq!(&*loaded, &def, "regenerated file:\n{}", text);
    }
}

/// Every shipped description file survives the round trip.
#[test]
fn bundled_library_round_trips() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../blocks");
    let mut registry = DefinitionRegistry::new();
    let report = registry.load_dir(&dir);
    assert!(report.errors.is_empty());

    for id in registry.all_ids() {
        let original = registry.get(id).unwrap();
        let text = DefinitionRegistry::to_toml(&original).unwrap();
        let mut scratch = DefinitionRegistry::new();
        let reloaded = scratch.load_str(format!("{id}.block.toml"), &text).unwrap();
        assert_eq!(*reloaded, *original, "round trip of {id}:\n{text}");
    }
}
