//! The two analysis passes over a syntax tree.
//!
//! [`DeclarationBuilder`] creates contexts and declarations and resolves
//! their types; it runs with write access to the store. [`UseBuilder`]
//! resolves every reference in executable code against the published
//! symbols plus the file's own pending arena; it only reads.

mod contexts;
mod declarations;
mod uses;

pub use contexts::{ContextBuilder, OpenContext};
pub use declarations::{DeclarationBuilder, DeclarationOutcome};
pub use uses::{UseBatch, UseBuilder};

use smol_str::SmolStr;

/// Language settings both passes share.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    /// Class every class without an explicit superclass extends.
    pub root_class: SmolStr,
    /// Inheritance depth after which castability gives up.
    pub cast_limit: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            root_class: SmolStr::new_static("Object"),
            cast_limit: 16,
        }
    }
}
