//! The type model: a closed set of type shapes plus castability.
//!
//! Types carry no methods of their own. Members and operators of a type are
//! found through the context of its class declaration; primitives are backed
//! by the base-library classes of the same name.

use std::fmt;
use std::sync::Arc;

use super::ids::DeclId;
use super::store::SymbolView;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Byte,
    Bool,
    Int,
    Float,
    String,
}

impl Primitive {
    pub const ALL: [Primitive; 5] = [
        Primitive::Byte,
        Primitive::Bool,
        Primitive::Int,
        Primitive::Float,
        Primitive::String,
    ];

    /// Name of the base-library class backing this primitive.
    pub fn class_name(self) -> &'static str {
        match self {
            Primitive::Byte => "byte",
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::String => "String",
        }
    }

    pub fn from_class_name(name: &str) -> Option<Primitive> {
        Primitive::ALL.into_iter().find(|p| p.class_name() == name)
    }
}

/// Return and parameter types of a function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionSig {
    pub ret: Ty,
    pub params: Vec<Ty>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Ty {
    Void,
    Null,
    /// Resolution failed; operations on it propagate silently.
    #[default]
    Unknown,
    Primitive(Primitive),
    /// A class, interface or enumeration, compared by declaration identity.
    Structure(DeclId),
    Function(Arc<FunctionSig>),
}

impl Ty {
    pub fn function(ret: Ty, params: Vec<Ty>) -> Ty {
        Ty::Function(Arc::new(FunctionSig { ret, params }))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }

    pub fn as_function(&self) -> Option<&FunctionSig> {
        match self {
            Ty::Function(sig) => Some(sig),
            _ => None,
        }
    }
}

impl SymbolView<'_> {
    /// Whether a value of type `from` may be used where `to` is expected.
    ///
    /// True when the types are equal, when `from` is null, or when a base
    /// class or interface of `from` is castable to `to`. The inheritance walk
    /// gives up after `limit` levels.
    pub fn is_castable(&self, from: &Ty, to: &Ty, limit: u32) -> bool {
        self.castable_at(from, to, limit, 0)
    }

    fn castable_at(&self, from: &Ty, to: &Ty, limit: u32, depth: u32) -> bool {
        if from == to || *from == Ty::Null {
            return true;
        }
        if depth >= limit {
            return false;
        }
        let Some(class) = self.class_decl_of(from).and_then(|id| self.decl(id)) else {
            return false;
        };
        class
            .bases
            .iter()
            .any(|base| self.castable_at(&base.ty, to, limit, depth + 1))
    }

    /// Display form of a type, using qualified names for structures.
    pub fn type_name(&self, ty: &Ty) -> String {
        TypeDisplay { view: self, ty }.to_string()
    }
}

struct TypeDisplay<'v, 'a> {
    view: &'v SymbolView<'a>,
    ty: &'v Ty,
}

impl fmt::Display for TypeDisplay<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Ty::Void => f.write_str("void"),
            Ty::Null => f.write_str("null"),
            Ty::Unknown => f.write_str("<unknown>"),
            Ty::Primitive(p) => f.write_str(p.class_name()),
            Ty::Structure(id) => match self.view.qualified_name(*id) {
                Some(name) => f.write_str(&name),
                None => f.write_str("<unknown>"),
            },
            Ty::Function(sig) => {
                write!(f, "{}(", self.view.type_name(&sig.ret))?;
                for (i, param) in sig.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&self.view.type_name(param))?;
                }
                f.write_str(")")
            }
        }
    }
}
