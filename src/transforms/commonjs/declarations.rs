use oxc_ast::ast::*;
use tracing::trace;

use super::Visitor;
use super::scope::pattern_names;

impl<'a> Visitor<'a> {
    /// Keeps the root table in step with a declarator met during the walk. A name that is already
    /// bound only gains a reference; redeclaration is not validated here.
    pub(super) fn register_declarator(&mut self, declarator: &VariableDeclarator<'a>, top_level: bool) {
        for (name, span) in pattern_names(&declarator.id) {
            self.bindings.register(&name, span, top_level);
        }
    }

    pub(super) fn register_default_import(&mut self, specifier: &ImportDefaultSpecifier<'a>) {
        self.bindings.register(&specifier.local.name, specifier.local.span, true);
    }

    /// Registers a named specifier, first moving its local onto the collision-free name when the
    /// original local was renamed. The imported name is left as the source module spells it.
    /// Locals already in the body are rewritten by the export renamer before they get here, so
    /// this only moves specifiers built for a name after it was renamed away.
    pub(super) fn register_named_import(&mut self, specifier: &mut ImportSpecifier<'a>) {
        if let Some(renamed) = self.state.renamed_to(&specifier.local.name) {
            let renamed = self.allocator.alloc_str(renamed);
            trace!(from = %specifier.local.name, to = renamed, "re-pairing import specifier");
            specifier.local.name = renamed.into();
        }
        self.bindings.register(&specifier.local.name, specifier.local.span, true);
    }
}
