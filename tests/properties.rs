// Property tests over generated Python projects

use classmap::analysis::RankOptions;
use classmap::{analyze_units, AnalysisOptions, DiagramFormat, SignificanceRanker, SourceUnit};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
struct ClassSpec {
    module: usize,
    base: Option<usize>,
    composes: Vec<usize>,
    holds: Vec<usize>,
    methods: Vec<bool>,
}

fn class_spec(max_index: usize) -> impl Strategy<Value = ClassSpec> {
    (
        0usize..3,
        proptest::option::of(0..max_index),
        prop::collection::vec(0..max_index, 0..3),
        prop::collection::vec(0..max_index, 0..2),
        prop::collection::vec(any::<bool>(), 0..4),
    )
        .prop_map(|(module, base, composes, holds, methods)| ClassSpec {
            module,
            base,
            composes,
            holds,
            methods,
        })
}

fn project() -> impl Strategy<Value = Vec<ClassSpec>> {
    (1usize..16).prop_flat_map(|n| prop::collection::vec(class_spec(n), n))
}

/// One unit per module; class `Ti` may reference any other `Tj`
fn render_units(specs: &[ClassSpec]) -> Vec<SourceUnit> {
    let mut texts = vec![String::new(); 3];
    for (i, spec) in specs.iter().enumerate() {
        let text = &mut texts[spec.module];
        match spec.base {
            Some(b) if b != i => text.push_str(&format!("class T{}(T{}):\n", i, b)),
            _ => text.push_str(&format!("class T{}:\n", i)),
        }

        let mut holds = spec.holds.clone();
        holds.dedup();
        let params: Vec<String> = holds.iter().map(|h| format!(", t{}", h)).collect();
        text.push_str(&format!("    def __init__(self{}):\n", params.concat()));
        for (k, c) in spec.composes.iter().enumerate() {
            text.push_str(&format!("        self.part{} = T{}()\n", k, c));
        }
        for (k, h) in holds.iter().enumerate() {
            text.push_str(&format!("        self.ref{} = t{}\n", k, h));
        }
        text.push_str("        pass\n");

        for (k, private) in spec.methods.iter().enumerate() {
            let prefix = if *private { "_" } else { "" };
            text.push_str(&format!("    def {}m{}(self):\n        pass\n", prefix, k));
        }
        text.push('\n');
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(m, text)| SourceUnit::new(format!("pkg.mod{}", m), format!("pkg/mod{}.py", m), text))
        .collect()
}

fn options(max_classes: usize, public_only: bool, group_by_module: bool) -> AnalysisOptions {
    AnalysisOptions {
        format: DiagramFormat::PlantUml,
        max_classes,
        group_by_module,
        public_only,
    }
}

proptest! {
    #[test]
    fn prop_unit_order_does_not_matter(
        specs in project(),
        max_classes in 0usize..8,
        mermaid in any::<bool>(),
    ) {
        let units = render_units(&specs);
        let mut reversed = units.clone();
        reversed.reverse();
        let mut rotated = units.clone();
        rotated.rotate_left(1);

        let mut opts = options(max_classes, false, true);
        if mermaid {
            opts.format = DiagramFormat::Mermaid;
        }

        let base = analyze_units(&units, &opts).unwrap();
        for other in [reversed, rotated] {
            let result = analyze_units(&other, &opts).unwrap();
            prop_assert_eq!(&result.model, &base.model);
            prop_assert_eq!(&result.diagram, &base.diagram);
        }
    }

    #[test]
    fn prop_selection_is_bounded(specs in project(), max_classes in 0usize..10) {
        let units = render_units(&specs);
        let result = analyze_units(&units, &options(max_classes, false, false)).unwrap();
        let view = SignificanceRanker::new(RankOptions {
            max_types: max_classes,
            public_only: false,
            group_by_module: false,
        })
        .select(&result.model);

        let total = result.stats.types;
        prop_assert_eq!(total, specs.len());
        if max_classes == 0 {
            prop_assert_eq!(view.types.len(), total);
        } else {
            prop_assert_eq!(view.types.len(), total.min(max_classes));
        }
    }

    #[test]
    fn prop_no_dangling_relationships(specs in project(), max_classes in 0usize..10) {
        let units = render_units(&specs);
        let result = analyze_units(&units, &options(max_classes, false, true)).unwrap();
        let model = &result.model;

        for rel in model.relationships() {
            prop_assert!(model.contains(&rel.source), "dangling source {}", rel.source);
            prop_assert!(model.contains(&rel.target), "dangling target {}", rel.target);
        }

        let view = SignificanceRanker::new(result.options.rank_options()).select(model);
        let selected: HashSet<&str> = view
            .types
            .iter()
            .map(|t| t.entity.qualified_name.as_str())
            .collect();
        for rel in &view.relationships {
            prop_assert!(selected.contains(rel.source.as_str()));
            prop_assert!(selected.contains(rel.target.as_str()));
        }

        let mut keys = HashSet::new();
        for rel in model.relationships() {
            prop_assert!(keys.insert((rel.kind, &rel.source, &rel.target, &rel.label)));
        }
    }

    #[test]
    fn prop_public_only_hides_underscore_members(specs in project()) {
        let units = render_units(&specs);
        let result = analyze_units(&units, &options(0, true, false)).unwrap();
        let view = SignificanceRanker::new(result.options.rank_options()).select(&result.model);

        for t in &view.types {
            for member in &t.members {
                prop_assert!(!member.name.starts_with('_'));
            }
        }
        prop_assert!(!result.diagram.text.contains("__init__"));
        prop_assert!(!result.diagram.text.contains(" _m"));
    }
}

#[test]
fn test_thirty_types_bounded_to_ten() {
    let specs: Vec<ClassSpec> = (0..30)
        .map(|i| ClassSpec {
            module: i % 3,
            base: if i > 0 && i % 4 == 0 { Some(i - 1) } else { None },
            composes: if i % 5 == 0 { vec![(i + 1) % 30] } else { vec![] },
            holds: vec![],
            methods: vec![false; i % 4],
        })
        .collect();
    let units = render_units(&specs);
    let result = analyze_units(&units, &options(10, false, false)).unwrap();

    assert_eq!(result.stats.types, 30);
    let declared: Vec<&str> = result
        .diagram
        .text
        .lines()
        .filter_map(|l| l.strip_prefix("class "))
        .filter_map(|l| l.split_whitespace().next())
        .collect();
    assert_eq!(declared.len(), 10);
    assert!(!result.diagram.text.contains("package "));

    let scores = SignificanceRanker::new(result.options.rank_options()).scores(&result.model);
    let mut ranked: Vec<(&String, &usize)> = scores.iter().collect();
    ranked.sort_by(|(qa, sa), (qb, sb)| sb.cmp(sa).then_with(|| qa.cmp(qb)));
    let expected: Vec<&str> = ranked
        .iter()
        .take(10)
        .filter_map(|(qn, _)| qn.rsplit('.').next())
        .collect();
    assert_eq!(declared, expected);
}
