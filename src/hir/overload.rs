//! Overload resolution for calls, operators and constructor headers.

use super::ids::DeclId;
use super::store::SymbolView;
use super::symbols::Declaration;
use super::ty::{FunctionSig, Ty};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Overload {
    /// Exactly one candidate fits, by exact match or by casting.
    Found(DeclId),
    /// Several candidates fit equally well, in candidate order.
    Ambiguous(Vec<DeclId>),
    NoMatch,
}

/// Pick the candidate matching `args`.
///
/// An exact match wins outright. Otherwise the castable candidates are
/// collected and overridden functions dropped in favour of the functions
/// overriding them.
pub fn resolve_overload(view: &SymbolView<'_>, candidates: &[DeclId], args: &[Ty], cast_limit: u32) -> Overload {
    let functions: Vec<(DeclId, &Declaration, &FunctionSig)> = candidates
        .iter()
        .filter_map(|&id| {
            let decl = view.decl(id)?;
            Some((id, decl, decl.ty.as_function()?))
        })
        .collect();

    if let Some(&(id, _, _)) = functions.iter().find(|(_, _, sig)| sig.params == args) {
        return Overload::Found(id);
    }

    let castable: Vec<_> = functions
        .into_iter()
        .filter(|(_, _, sig)| {
            sig.params.len() == args.len()
                && args
                    .iter()
                    .zip(&sig.params)
                    .all(|(arg, param)| view.is_castable(arg, param, cast_limit))
        })
        .collect();

    let mut survivors = Vec::with_capacity(castable.len());
    for (i, &(id, decl, sig)) in castable.iter().enumerate() {
        let overridden = castable.iter().enumerate().any(|(j, &(_, other, other_sig))| {
            i != j && same_signature(decl, sig, other_sig) && overrides(view, other, j, decl, i, cast_limit)
        });
        if !overridden {
            survivors.push(id);
        }
    }

    match survivors.as_slice() {
        [] => Overload::NoMatch,
        [one] => Overload::Found(*one),
        _ => Overload::Ambiguous(survivors),
    }
}

fn same_signature(decl: &Declaration, sig: &FunctionSig, other: &FunctionSig) -> bool {
    sig.params == other.params && (decl.is_constructor() || sig.ret == other.ret)
}

/// Whether `other` (at index `j`) overrides `decl` (at index `i`): its
/// owning class is castable to the owner of `decl`. Two functions of the
/// same class keep the earlier one.
fn overrides(
    view: &SymbolView<'_>,
    other: &Declaration,
    j: usize,
    decl: &Declaration,
    i: usize,
    cast_limit: u32,
) -> bool {
    let (Some(other_owner), Some(owner)) = (owner_type(view, other), owner_type(view, decl)) else {
        return false;
    };
    if other_owner == owner {
        return j < i;
    }
    view.is_castable(&other_owner, &owner, cast_limit)
}

fn owner_type(view: &SymbolView<'_>, decl: &Declaration) -> Option<Ty> {
    let owner = view.context(decl.context)?.owner?;
    Some(view.structure_type(owner))
}

/// "Owner.name(param, ...)" for candidate hints.
pub fn describe_candidate(view: &SymbolView<'_>, id: DeclId) -> String {
    let Some(decl) = view.decl(id) else {
        return String::from("<unknown>");
    };
    let params = decl
        .ty
        .as_function()
        .map(|sig| {
            sig.params
                .iter()
                .map(|p| view.type_name(p))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    let owner = view
        .context(decl.context)
        .and_then(|c| c.owner)
        .and_then(|o| view.decl(o));
    match owner {
        Some(owner) => format!("{}.{}({})", owner.name, decl.name, params),
        None => format!("{}({})", decl.name, params),
    }
}

/// "name(arg, ...)" for the call site in error messages.
pub fn describe_call(view: &SymbolView<'_>, name: &str, args: &[Ty]) -> String {
    let args = args.iter().map(|a| view.type_name(a)).collect::<Vec<_>>().join(", ");
    format!("{name}({args})")
}
