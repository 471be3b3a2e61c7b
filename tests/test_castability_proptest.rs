//! Castability over randomly generated class forests matches ancestry.
#![cfg(feature = "proptest")]

mod common;

use dscript::Ty;
use proptest::prelude::*;

// ============================================================================
// STRATEGIES
// ============================================================================

/// Parent of each class `Ci`, always an earlier class.
fn arb_forest() -> impl Strategy<Value = Vec<Option<usize>>> {
    (1usize..9).prop_flat_map(|n| {
        (0..n)
            .map(|i| {
                if i == 0 {
                    Just(None).boxed()
                } else {
                    proptest::option::of(0..i).boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

fn script(parents: &[Option<usize>]) -> String {
    let mut text = String::new();
    for (i, parent) in parents.iter().enumerate() {
        match parent {
            Some(p) => text.push_str(&format!("class C{i} extends C{p}\nend\n")),
            None => text.push_str(&format!("class C{i}\nend\n")),
        }
    }
    text
}

fn is_ancestor(parents: &[Option<usize>], mut class: usize, ancestor: usize) -> bool {
    loop {
        if class == ancestor {
            return true;
        }
        match parents[class] {
            Some(p) => class = p,
            None => return false,
        }
    }
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn castability_follows_ancestry(parents in arb_forest()) {
        let (host, file) = common::analyze_one("Forest.ds", &script(&parents));
        let analysis = host.analysis();
        prop_assert!(analysis.diagnostics(file).is_empty());

        let types: Vec<Ty> = (0..parents.len())
            .map(|i| Ty::Structure(analysis.declarations_named(file, &format!("C{i}"))[0]))
            .collect();
        let view = analysis.store().view();
        for (i, from) in types.iter().enumerate() {
            for (j, to) in types.iter().enumerate() {
                prop_assert_eq!(view.is_castable(from, to, 16), is_ancestor(&parents, i, j), "C{} -> C{}", i, j);
            }
        }

        // Transitivity across every triple.
        for a in &types {
            for b in &types {
                for c in &types {
                    if view.is_castable(a, b, 16) && view.is_castable(b, c, 16) {
                        prop_assert!(view.is_castable(a, c, 16));
                    }
                }
            }
        }
    }
}
