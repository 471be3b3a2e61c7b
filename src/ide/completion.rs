//! Completion: every declaration visible from a scope.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::base::{FileId, TextSize};
use crate::hir::{describe_candidate, ContextId, ContextKind, DeclId, DeclKind, SymbolStore, SymbolView};

/// A completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub decl: DeclId,
    pub name: SmolStr,
    pub kind: DeclKind,
    /// Type or signature shown next to the name.
    pub detail: String,
}

/// Declarations visible from `ctx`, innermost first.
///
/// Inner declarations hide outer ones of the same name; functions are kept
/// as a whole overload set.
pub fn completions_in_scope(store: &SymbolStore, ctx: ContextId) -> Vec<CompletionItem> {
    collect(store.view(), ctx, None)
}

/// [`completions_in_scope`] for the innermost context at `offset`, hiding
/// locals declared after it.
pub fn completions_at(store: &SymbolStore, file: FileId, offset: TextSize) -> Vec<CompletionItem> {
    let Some(arena) = store.current(file) else {
        return Vec::new();
    };
    collect(store.view(), arena.context_at(offset), Some(offset))
}

fn collect(view: SymbolView<'_>, ctx: ContextId, pos: Option<TextSize>) -> Vec<CompletionItem> {
    let mut items = Vec::new();
    let mut hidden: FxHashSet<SmolStr> = FxHashSet::default();
    let mut overloads: FxHashSet<SmolStr> = FxHashSet::default();

    let mut scopes = Vec::new();
    let mut current = Some(ctx);
    while let Some(id) = current {
        let Some(context) = view.context(id) else {
            break;
        };
        scopes.push((id, pos.filter(|_| context.kind.is_ordered())));
        match context.kind {
            ContextKind::Type => scopes.extend(view.base_contexts(id).into_iter().map(|b| (b, None))),
            ContextKind::Namespace => {
                let path = context.path.as_deref().unwrap_or_default();
                for ns in view.namespace_contexts(path, id.file) {
                    if ns != id {
                        scopes.push((ns, None));
                    }
                }
            }
            _ => {}
        }
        current = context.parent;
    }
    if let Some(top) = view.context(ContextId::top(ctx.file)) {
        scopes.extend(top.imports.iter().map(|&import| (import, None)));
    }

    for (scope, pos) in scopes {
        let Some(context) = view.context(scope) else {
            continue;
        };
        // Names first seen at this level hide the same names further out.
        let mut level: Vec<SmolStr> = Vec::new();
        for &id in &context.locals {
            let Some(decl) = view.decl(id) else {
                continue;
            };
            if pos.is_some_and(|pos| decl.name_range.start() >= pos) {
                continue;
            }
            let visible = if decl.kind == DeclKind::Function {
                !hidden.contains(&decl.name) || overloads.contains(&decl.name)
            } else {
                !hidden.contains(&decl.name)
            };
            if !visible {
                continue;
            }
            if decl.kind == DeclKind::Function {
                overloads.insert(decl.name.clone());
            }
            level.push(decl.name.clone());
            items.push(CompletionItem {
                decl: id,
                name: decl.name.clone(),
                kind: decl.kind,
                detail: detail(view, id),
            });
        }
        hidden.extend(level);
    }
    items
}

fn detail(view: SymbolView<'_>, id: DeclId) -> String {
    let Some(decl) = view.decl(id) else {
        return String::new();
    };
    match decl.kind {
        DeclKind::Function => describe_candidate(&view, id),
        DeclKind::Namespace | DeclKind::Class | DeclKind::Interface | DeclKind::Enum => {
            view.qualified_name(id).unwrap_or_else(|| decl.name.to_string())
        }
        DeclKind::EnumMember | DeclKind::Variable | DeclKind::Parameter => view.type_name(&decl.ty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::{BuildOptions, DeclarationBuilder, DeclarationOutcome, FileSymbols};
    use crate::syntax::parse;

    fn publish(store: &mut SymbolStore, text: &str) -> FileId {
        let file = FileId::new(0);
        let script = parse(text).script.expect("script");
        let options = BuildOptions::default();
        let arena = FileSymbols::new(file, script.range);
        let DeclarationOutcome::Built(arena) = DeclarationBuilder::new(store, &options, arena).build(&script) else {
            panic!("no library configured");
        };
        store.stage(arena);
        store.publish(file);
        file
    }

    fn names(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    const TEXT: &str = "\
class Base
\tvar int shared
\tfunc void greet()
\tend
end
class Child extends Base
\tvar int own
\tfunc void greet(int times)
\t\tvar int before = 1
\t\tvar int after = 2
\tend
end
";

    #[test]
    fn test_scope_chain_with_inheritance() {
        let mut store = SymbolStore::new();
        let file = publish(&mut store, TEXT);

        let offset = TextSize::from(TEXT.find("var int after").expect("after") as u32);
        let items = completions_at(&store, file, offset);
        let names = names(&items);

        assert!(names.contains(&"before"));
        assert!(!names.contains(&"after"));
        assert!(names.contains(&"times"));
        assert!(names.contains(&"own"));
        assert!(names.contains(&"shared"));
        assert_eq!(names.iter().filter(|&&n| n == "greet").count(), 2);
        assert!(names.contains(&"Base") && names.contains(&"Child"));
    }

    #[test]
    fn test_inner_names_hide_outer_ones() {
        let mut store = SymbolStore::new();
        let text = "class A\n\tvar int value\n\tfunc void f(int value)\n\tend\nend\n";
        let file = publish(&mut store, text);

        let offset = TextSize::from(text.find("\tend").expect("end") as u32);
        let items = completions_at(&store, file, offset);
        let values: Vec<_> = items.iter().filter(|i| i.name == "value").collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].kind, DeclKind::Parameter);

        let class_ctx = store.current(file).expect("published").context_at(TextSize::from(10));
        let at_class = completions_in_scope(&store, class_ctx);
        assert!(at_class.iter().any(|i| i.name == "value" && i.kind == DeclKind::Variable));
    }
}
