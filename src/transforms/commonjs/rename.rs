use oxc_allocator::{Box as ArenaBox, Vec as ArenaVec};
use oxc_ast::ast::*;
use oxc_ast_visit::VisitMut;
use oxc_syntax::scope::ScopeFlags;

use super::builders::parse_stub;
use super::scope::{parameters_bind, pattern_binds, pattern_names, statements_declare};

/// Renames every binding and reference of the module-level `from` to `to`, leaving scopes that
/// declare their own `from` untouched.
///
/// An `export <declaration>` binding `from` keeps its exported name: it is split into the bare
/// declaration followed by `export { <to> as <from> };`. Returns the original positions of the
/// split statements, each of which gained one statement right after it.
pub(super) fn rename_in_statements<'a>(
    allocator: &'a oxc_allocator::Allocator,
    stmts: &mut ArenaVec<'a, Statement<'a>>,
    from: &str,
    to: &str,
) -> Vec<usize> {
    let mut r = Renamer { allocator, from, to: allocator.alloc_str(to) };
    let mut split = Vec::new();
    let mut i = 0;
    let mut original = 0;
    while i < stmts.len() {
        let exports_from = exported_declaration_names(&stmts[i]).is_some_and(|names| names.iter().any(|n| n == from));
        r.visit_statement(&mut stmts[i]);
        if exports_from && r.split_export(stmts, i) {
            split.push(original);
            i += 1;
        }
        i += 1;
        original += 1;
    }
    split
}

/// Names bound by `export <declaration>`, or `None` for any other statement.
fn exported_declaration_names(stmt: &Statement<'_>) -> Option<Vec<String>> {
    let Statement::ExportNamedDeclaration(export) = stmt else {
        return None;
    };
    let names: Vec<String> = match export.declaration.as_ref()? {
        Declaration::VariableDeclaration(decl) => {
            decl.declarations.iter().flat_map(|d| pattern_names(&d.id)).map(|(name, _)| name).collect()
        }
        Declaration::FunctionDeclaration(func) => func.id.iter().map(|id| id.name.to_string()).collect(),
        Declaration::ClassDeclaration(class) => class.id.iter().map(|id| id.name.to_string()).collect(),
        _ => return None,
    };
    Some(names)
}

struct Renamer<'a, 's> {
    allocator: &'a oxc_allocator::Allocator,
    from: &'s str,
    to: &'a str,
}

impl<'a> Renamer<'a, '_> {
    fn function_shadows_name(&self, func: &Function<'a>) -> bool {
        if parameters_bind(&func.params, self.from) {
            return true;
        }
        func.body.as_ref().is_some_and(|body| statements_declare(&body.statements, self.from, true))
    }

    fn arrow_shadows_name(&self, arrow: &ArrowFunctionExpression<'a>) -> bool {
        parameters_bind(&arrow.params, self.from) || statements_declare(&arrow.body.statements, self.from, true)
    }

    fn head_shadows_name(&self, head: Option<&VariableDeclaration<'a>>) -> bool {
        head.is_some_and(|decl| {
            decl.kind != VariableDeclarationKind::Var && decl.declarations.iter().any(|d| pattern_binds(&d.id, self.from))
        })
    }

    fn ident_reference(&self, span: oxc_span::Span) -> IdentifierReference<'a> {
        IdentifierReference { span, name: self.to.into(), reference_id: None.into() }
    }

    /// `export const <to> = ..;` becomes `const <to> = ..; export { <to> as <from> };`.
    fn split_export(&self, stmts: &mut ArenaVec<'a, Statement<'a>>, index: usize) -> bool {
        let Some(names) = exported_declaration_names(&stmts[index]) else {
            return false;
        };
        let specifiers: Vec<String> = names
            .iter()
            .map(|name| if name == self.to { format!("{} as {}", self.to, self.from) } else { name.clone() })
            .collect();
        let Some(list) = parse_stub(self.allocator, &format!("export {{ {} }};", specifiers.join(", "))) else {
            return false;
        };
        let Statement::ExportNamedDeclaration(export) = &mut stmts[index] else {
            return false;
        };
        let declaration = match export.declaration.take() {
            Some(Declaration::VariableDeclaration(decl)) => Statement::VariableDeclaration(decl),
            Some(Declaration::FunctionDeclaration(func)) => Statement::FunctionDeclaration(func),
            Some(Declaration::ClassDeclaration(class)) => Statement::ClassDeclaration(class),
            other => {
                export.declaration = other;
                return false;
            }
        };
        stmts[index] = declaration;
        stmts.insert(index + 1, list);
        true
    }
}

impl<'a> VisitMut<'a> for Renamer<'a, '_> {
    fn visit_binding_identifier(&mut self, it: &mut BindingIdentifier<'a>) {
        if it.name.as_str() == self.from {
            it.name = self.to.into();
        }
    }

    fn visit_identifier_reference(&mut self, it: &mut IdentifierReference<'a>) {
        if it.name.as_str() == self.from {
            it.name = self.to.into();
        }
    }

    fn visit_object_property(&mut self, it: &mut ObjectProperty<'a>) {
        if it.shorthand && matches!(&it.value, Expression::Identifier(id) if id.name.as_str() == self.from) {
            it.shorthand = false;
        }
        oxc_ast_visit::walk_mut::walk_object_property(self, it);
    }

    fn visit_binding_property(&mut self, it: &mut BindingProperty<'a>) {
        if it.shorthand && pattern_binds(&it.value, self.from) {
            it.shorthand = false;
        }
        oxc_ast_visit::walk_mut::walk_binding_property(self, it);
    }

    fn visit_assignment_target_property(&mut self, it: &mut AssignmentTargetProperty<'a>) {
        // `({ from } = obj)` has no separate key; spell it out as `({ from: to } = obj)`.
        if let AssignmentTargetProperty::AssignmentTargetPropertyIdentifier(prop) = it {
            if prop.binding.name.as_str() == self.from {
                let span = prop.span;
                let key = PropertyKey::StaticIdentifier(ArenaBox::new_in(
                    IdentifierName { span: prop.binding.span, name: prop.binding.name },
                    self.allocator,
                ));
                let target = ArenaBox::new_in(self.ident_reference(prop.binding.span), self.allocator);
                let binding = match prop.init.take() {
                    Some(mut init) => {
                        self.visit_expression(&mut init);
                        AssignmentTargetMaybeDefault::AssignmentTargetWithDefault(ArenaBox::new_in(
                            AssignmentTargetWithDefault {
                                span,
                                binding: AssignmentTarget::AssignmentTargetIdentifier(target),
                                init,
                            },
                            self.allocator,
                        ))
                    }
                    None => AssignmentTargetMaybeDefault::AssignmentTargetIdentifier(target),
                };
                *it = AssignmentTargetProperty::AssignmentTargetPropertyProperty(ArenaBox::new_in(
                    AssignmentTargetPropertyProperty { span, name: key, binding, computed: false },
                    self.allocator,
                ));
                return;
            }
        }
        oxc_ast_visit::walk_mut::walk_assignment_target_property(self, it);
    }

    fn visit_function(&mut self, it: &mut Function<'a>, flags: ScopeFlags) {
        let is_declaration = it.r#type == FunctionType::FunctionDeclaration;
        if !is_declaration && it.id.as_ref().is_some_and(|id| id.name.as_str() == self.from) {
            // A named function expression binds its own name inside.
            return;
        }
        if self.function_shadows_name(it) {
            if is_declaration {
                if let Some(id) = it.id.as_mut() {
                    self.visit_binding_identifier(id);
                }
            }
            return;
        }
        oxc_ast_visit::walk_mut::walk_function(self, it, flags);
    }

    fn visit_arrow_function_expression(&mut self, it: &mut ArrowFunctionExpression<'a>) {
        if self.arrow_shadows_name(it) {
            return;
        }
        oxc_ast_visit::walk_mut::walk_arrow_function_expression(self, it);
    }

    fn visit_block_statement(&mut self, it: &mut BlockStatement<'a>) {
        if statements_declare(&it.body, self.from, false) {
            return;
        }
        oxc_ast_visit::walk_mut::walk_block_statement(self, it);
    }

    fn visit_catch_clause(&mut self, it: &mut CatchClause<'a>) {
        if it.param.as_ref().is_some_and(|p| pattern_binds(&p.pattern, self.from)) {
            return;
        }
        oxc_ast_visit::walk_mut::walk_catch_clause(self, it);
    }

    fn visit_for_statement(&mut self, it: &mut ForStatement<'a>) {
        let head = match &it.init {
            Some(ForStatementInit::VariableDeclaration(decl)) => Some(&**decl),
            _ => None,
        };
        if self.head_shadows_name(head) {
            return;
        }
        oxc_ast_visit::walk_mut::walk_for_statement(self, it);
    }

    fn visit_for_in_statement(&mut self, it: &mut ForInStatement<'a>) {
        let head = match &it.left {
            ForStatementLeft::VariableDeclaration(decl) => Some(&**decl),
            _ => None,
        };
        if self.head_shadows_name(head) {
            return;
        }
        oxc_ast_visit::walk_mut::walk_for_in_statement(self, it);
    }

    fn visit_for_of_statement(&mut self, it: &mut ForOfStatement<'a>) {
        let head = match &it.left {
            ForStatementLeft::VariableDeclaration(decl) => Some(&**decl),
            _ => None,
        };
        if self.head_shadows_name(head) {
            return;
        }
        oxc_ast_visit::walk_mut::walk_for_of_statement(self, it);
    }
}
