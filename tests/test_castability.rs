//! Castability over a small class hierarchy.

mod common;

use dscript::hir::Primitive;
use dscript::{AnalysisHost, FileId, Ty};
use once_cell::sync::Lazy;
use rstest::rstest;

const HIERARCHY: &str = "\
interface Named
end
class Animal implements Named
end
class Dog extends Animal
end
class Puppy extends Dog
end
class Stone
end
";

const LIMIT: u32 = 16;

static ANALYZED: Lazy<(AnalysisHost, FileId)> = Lazy::new(|| common::analyze_one("Zoo.ds", HIERARCHY));

fn ty(name: &str) -> Ty {
    let (host, file) = &*ANALYZED;
    let analysis = host.analysis();
    let from_file = analysis.declarations_named(*file, name);
    if let Some(&decl) = from_file.first() {
        return Ty::Structure(decl);
    }
    if let Some(p) = Primitive::from_class_name(name) {
        return Ty::Primitive(p);
    }
    let view = analysis.store().view();
    Ty::Structure(view.library_class(name).expect("library class"))
}

fn castable(from: &Ty, to: &Ty, limit: u32) -> bool {
    let (host, _) = &*ANALYZED;
    host.analysis().store().view().is_castable(from, to, limit)
}

#[rstest]
#[case::reflexive("Dog", "Dog", true)]
#[case::direct_base("Dog", "Animal", true)]
#[case::transitive_base("Puppy", "Animal", true)]
#[case::interface_through_base("Puppy", "Named", true)]
#[case::implicit_root("Stone", "Object", true)]
#[case::primitive_to_root("int", "Object", true)]
#[case::downcast("Animal", "Dog", false)]
#[case::unrelated("Stone", "Named", false)]
#[case::sibling_primitives("int", "String", false)]
fn test_castability(#[case] from: &str, #[case] to: &str, #[case] expected: bool) {
    assert_eq!(castable(&ty(from), &ty(to), LIMIT), expected, "{from} -> {to}");
}

#[rstest]
#[case("Stone")]
#[case("Named")]
#[case("int")]
fn test_null_casts_to_anything(#[case] to: &str) {
    assert!(castable(&Ty::Null, &ty(to), LIMIT));
    assert!(!castable(&ty(to), &Ty::Null, LIMIT));
}

#[test]
fn test_limit_bounds_the_inheritance_walk() {
    let puppy = ty("Puppy");
    let animal = ty("Animal");
    assert!(!castable(&puppy, &animal, 1));
    assert!(castable(&puppy, &animal, 2));
}

#[test]
fn test_unknown_is_only_castable_to_itself() {
    assert!(castable(&Ty::Unknown, &Ty::Unknown, LIMIT));
    assert!(!castable(&Ty::Unknown, &ty("Dog"), LIMIT));
}
