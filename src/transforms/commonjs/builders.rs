use oxc_allocator::{Allocator, Box as ArenaBox, CloneIn};
use oxc_ast::ast::*;
use oxc_parser::{ParseOptions, Parser};
use oxc_span::{Atom, SourceType, Span};

use super::Visitor;
use super::scope::is_identifier_name;

const DEFAULT_IMPORT_STUB: &str = "import __local from \"__source\";";
const NAMED_IMPORT_STUB: &str = "import { __imported as __local, \"__imported\" as __quoted } from \"__source\";";
const NAMED_EXPORT_STUB: &str = "export const __name = __value;";
const DYNAMIC_IMPORT_STUB: &str = "import(__source);";
const MODULE_OBJECT_STUB: &str = "var module = { exports: {} };";
const DEFAULT_EXPORT_STUB: &str = "export default module.exports;";

/// Parses `code` on a scratch allocator and moves its first statement into `allocator`.
pub(super) fn parse_stub<'a>(allocator: &'a Allocator, code: &str) -> Option<Statement<'a>> {
    let temp_allocator = Allocator::default();
    let parse_ret = Parser::new(&temp_allocator, code, SourceType::mjs())
        .with_options(ParseOptions { parse_regular_expression: true, ..ParseOptions::default() })
        .parse();
    if !parse_ret.errors.is_empty() {
        return None;
    }
    parse_ret.program.body.first().map(|stmt| stmt.clone_in(allocator))
}

impl<'a> Visitor<'a> {
    fn parse_statement_stub(&self, code: &str) -> Option<Statement<'a>> {
        parse_stub(self.allocator, code)
    }

    fn atom(&self, s: &str) -> Atom<'a> {
        self.allocator.alloc_str(s).into()
    }

    fn set_import_source(&self, import: &mut ImportDeclaration<'a>, source: &str) {
        import.source.value = self.atom(source);
        import.source.raw = None;
    }

    pub(super) fn make_ident_expr(&self, span: Span, name: &str) -> Expression<'a> {
        let name = self.allocator.alloc_str(name);
        Expression::Identifier(ArenaBox::new_in(
            IdentifierReference { span, name: name.into(), reference_id: None.into() },
            self.allocator,
        ))
    }

    /// `import <local> from "<source>";`
    pub(super) fn build_default_import(&self, local: &str, source: &str) -> Option<Statement<'a>> {
        let mut stmt = self.parse_statement_stub(DEFAULT_IMPORT_STUB)?;
        let Statement::ImportDeclaration(import) = &mut stmt else {
            return None;
        };
        let Some(ImportDeclarationSpecifier::ImportDefaultSpecifier(specifier)) =
            import.specifiers.as_mut().and_then(|s| s.first_mut())
        else {
            return None;
        };
        specifier.local.name = self.atom(local);
        self.set_import_source(import, source);
        Some(stmt)
    }

    /// `import { <imported> as <local>, ... } from "<source>";` for `(imported, local)` pairs.
    pub(super) fn build_named_import(&self, pairs: &[(String, String)], source: &str) -> Option<Statement<'a>> {
        let mut stmt = self.parse_statement_stub(NAMED_IMPORT_STUB)?;
        let Statement::ImportDeclaration(import) = &mut stmt else {
            return None;
        };
        let templates = import.specifiers.take()?;
        let [ident_template, string_template] = &templates[..] else {
            return None;
        };

        let mut specifiers = oxc_allocator::Vec::new_in(self.allocator);
        for (imported, local) in pairs {
            let template = if is_identifier_name(imported) { ident_template } else { string_template };
            let mut specifier = template.clone_in(self.allocator);
            let ImportDeclarationSpecifier::ImportSpecifier(s) = &mut specifier else {
                return None;
            };
            match &mut s.imported {
                ModuleExportName::IdentifierName(name) => name.name = self.atom(imported),
                ModuleExportName::StringLiteral(lit) => {
                    lit.value = self.atom(imported);
                    lit.raw = None;
                }
                ModuleExportName::IdentifierReference(_) => return None,
            }
            s.local.name = self.atom(local);
            specifiers.push(specifier);
        }

        import.specifiers = Some(specifiers);
        self.set_import_source(import, source);
        Some(stmt)
    }

    /// `export const <name> = <value>;`
    pub(super) fn build_named_export(&self, name: &str, value: &Expression<'a>) -> Option<Statement<'a>> {
        let mut stmt = self.parse_statement_stub(NAMED_EXPORT_STUB)?;
        let Statement::ExportNamedDeclaration(export) = &mut stmt else {
            return None;
        };
        let Some(Declaration::VariableDeclaration(decl)) = export.declaration.as_mut() else {
            return None;
        };
        let declarator = decl.declarations.first_mut()?;
        let BindingPattern::BindingIdentifier(id) = &mut declarator.id else {
            return None;
        };
        id.name = self.atom(name);
        declarator.init = Some(value.clone_in(self.allocator));
        Some(stmt)
    }

    /// `import(<source>);` carrying `source` unchanged.
    pub(super) fn build_dynamic_import(&self, span: Span, source: Expression<'a>) -> Option<Statement<'a>> {
        let mut stmt = self.parse_statement_stub(DYNAMIC_IMPORT_STUB)?;
        let Statement::ExpressionStatement(es) = &mut stmt else {
            return None;
        };
        es.span = span;
        let Expression::ImportExpression(import) = &mut es.expression else {
            return None;
        };
        import.source = source;
        Some(stmt)
    }

    pub(super) fn build_module_object(&self) -> Option<Statement<'a>> {
        self.parse_statement_stub(MODULE_OBJECT_STUB)
    }

    pub(super) fn build_module_default_export(&self) -> Option<Statement<'a>> {
        self.parse_statement_stub(DEFAULT_EXPORT_STUB)
    }
}
